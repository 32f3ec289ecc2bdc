//! Identifiers for modules, wires, cells, ports and parameters

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// An RTLIL-style identifier.
///
/// User-visible names start with `\`, generated names start with `$`.
/// Port and parameter names are stored bare (`A`, `Y_WIDTH`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdString(String);

impl IdString {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Public names are the ones written by the user (escaped with `\`)
    pub fn is_public(&self) -> bool {
        self.0.starts_with('\\')
    }

    /// Append a suffix, keeping the escape prefix
    pub fn with_suffix(&self, suffix: &str) -> IdString {
        IdString(format!("{}{}", self.0, suffix))
    }

    /// Name without the leading `\`
    pub fn unescaped(&self) -> &str {
        self.0.strip_prefix('\\').unwrap_or(&self.0)
    }
}

/// Turn a user supplied name into a public identifier
pub fn escape_id(name: &str) -> IdString {
    if name.starts_with('\\') || name.starts_with('$') {
        IdString::new(name)
    } else {
        IdString(format!("\\{}", name))
    }
}

impl fmt::Display for IdString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.unescaped())
    }
}

impl Borrow<str> for IdString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for IdString {
    fn from(name: &str) -> Self {
        IdString::new(name)
    }
}

impl From<String> for IdString {
    fn from(name: String) -> Self {
        IdString(name)
    }
}

impl PartialEq<str> for IdString {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for IdString {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
