use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use xsens_config::Config;
use xsens_formal::{prove_asserts, EngineRegistry, ProofOutcome, ProveOptions};
use xsens_ir::{escape_id, Design};
use xsens_passes::{PassRegistry, SensitizeOptions, SensitizePath};

/// xsens - path sensitization miters and SAT checks for gate-level netlists
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (defaults to ./xsens.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pass on a design
    Exec {
        /// Design file (JSON)
        #[arg(short, long)]
        design: PathBuf,

        /// Where to write the transformed design (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pass name followed by its arguments
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Check that the asserts of a module hold
    Prove {
        /// Design file (JSON)
        #[arg(short, long)]
        design: PathBuf,

        /// Module to check
        #[arg(short, long)]
        module: String,

        /// Model undefined values
        #[arg(long)]
        undef: bool,

        /// SAT engine
        #[arg(short, long)]
        engine: Option<String>,
    },

    /// List the available passes
    Passes,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    let config = xsens_config::discover(cli.config.as_deref(), &cwd)
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Exec {
            design,
            output,
            command,
        } => {
            exec_pass(&config, &design, output.as_deref(), &command)?;
        }

        Commands::Prove {
            design,
            module,
            undef,
            engine,
        } => {
            prove_module(&config, &design, &module, undef, engine)?;
        }

        Commands::Passes => {
            list_passes(&config);
        }
    }

    Ok(())
}

fn pass_registry(config: &Config) -> PassRegistry {
    let mut registry = PassRegistry::with_builtin();
    registry.register(Box::new(SensitizePath::new().with_defaults(
        SensitizeOptions {
            constrain_inputs: config.sensitize.constrain_inputs,
            constrain_undef: config.sensitize.constrain_undef,
        },
    )));
    registry
}

fn load_design(path: &Path) -> Result<Design> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn exec_pass(
    config: &Config,
    path: &Path,
    output: Option<&Path>,
    command: &[String],
) -> Result<()> {
    let mut design = load_design(path)?;
    info!("Loaded {} modules from {}", design.modules.len(), path.display());

    let summary = pass_registry(config)
        .run(command, &mut design)
        .with_context(|| format!("Pass `{}` failed", command.join(" ")))?;
    info!("{}", summary);

    let json = serde_json::to_string_pretty(&design).context("Failed to serialize design")?;
    match output {
        Some(output) => {
            fs::write(output, json)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            eprintln!("✅ {}", summary);
            eprintln!("📄 Output: {}", output.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn prove_module(
    config: &Config,
    path: &Path,
    module: &str,
    undef: bool,
    engine: Option<String>,
) -> Result<()> {
    let design = load_design(path)?;
    let name = escape_id(module);
    let Some(module) = design.module(name.as_str()) else {
        bail!("Module {} not found in {}", name, path.display());
    };

    let options = ProveOptions {
        model_undef: undef || config.formal.model_undef,
        engine: engine.or_else(|| config.formal.engine.clone()),
    };
    let report = prove_asserts(module, &EngineRegistry::with_builtin(), &options)?;

    for cell in &report.unsupported {
        eprintln!("⚠️  No encoder for cell {}, output left unconstrained", cell);
    }
    match report.outcome {
        ProofOutcome::Proved => {
            println!("✅ {} asserts proved in {}", report.asserts, name);
            Ok(())
        }
        ProofOutcome::Failed(cex) => {
            println!("❌ Assertion failed in {}", name);
            for step in &cex.trace {
                for (wire, value) in &step.assignments {
                    println!("   {} = {}", wire, value);
                }
            }
            bail!("{} has a failing assert", name)
        }
    }
}

fn list_passes(config: &Config) {
    for pass in pass_registry(config).passes() {
        println!("{:<16} {}", pass.name(), pass.short_help());
    }
    println!();
    println!("Available SAT engines:");
    for (name, description) in EngineRegistry::with_builtin().list() {
        println!("   {:<12} {}", name, description);
    }
}
