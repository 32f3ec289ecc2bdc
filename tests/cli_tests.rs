//! End-to-end runs of the `xsens` binary on JSON designs

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;
use xsens_ir::{escape_id, Const, Design, Module, SigSpec, State};

/// `hit = (sig === 4'bxxxx)` with an assert that `hit` stays low
fn x_detector() -> Module {
    let mut m = Module::new(escape_id("top"));
    let sig = m.add_input(escape_id("sig"), 4);
    let hit = m.add_wire(escape_id("hit"), 1);
    let ok = m.add_wire(escape_id("ok"), 1);
    let (sig, hit, ok) = (m.wire_sig(sig), m.wire_sig(hit), m.wire_sig(ok));

    m.add_eqx(
        escape_id("detect"),
        sig,
        SigSpec::from_const(&Const::undef(4)),
        hit.clone(),
    );

    let not = m.add_cell(escape_id("inv"), "$not");
    let cell = m.cell_mut(not);
    cell.set_port("A", hit);
    cell.set_port("Y", ok.clone());

    let check = m.add_cell(escape_id("check"), "$assert");
    let cell = m.cell_mut(check);
    cell.set_port("A", ok);
    cell.set_port("EN", SigSpec::repeat(State::S1, 1));
    m
}

fn write_design(dir: &TempDir) -> std::path::PathBuf {
    let mut design = Design::new();
    design.add_module(x_detector()).unwrap();
    let path = dir.path().join("design.json");
    std::fs::write(&path, serde_json::to_string_pretty(&design).unwrap()).unwrap();
    path
}

fn xsens(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_xsens"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to run xsens")
}

fn build_miter(dir: &TempDir, extra: &[&str]) -> std::path::PathBuf {
    let design = write_design(dir);
    let miter = dir.path().join("miter.json");
    let mut args = vec![
        "exec",
        "--design",
        design.to_str().unwrap(),
        "--output",
        miter.to_str().unwrap(),
        "--",
        "sensitizepath",
    ];
    args.extend_from_slice(extra);
    args.extend_from_slice(&["top", "miter"]);

    let output = xsens(dir.path(), &args);
    assert!(
        output.status.success(),
        "exec failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    miter
}

#[test]
fn test_exec_writes_miter() {
    let dir = TempDir::new().unwrap();
    let miter = build_miter(&dir, &[]);

    let text = std::fs::read_to_string(miter).unwrap();
    let design: Design = serde_json::from_str(&text).unwrap();
    assert!(design.has_module("\\top"));
    let miter = design.module("\\miter").unwrap();
    assert!(miter.find_wire("\\sig__is_x").is_some());
    assert!(miter.find_cell("\\inv__b").is_some());
    assert!(miter.find_cell("\\detect").is_none());
}

#[test]
fn test_free_shadow_inputs_break_the_assert() {
    let dir = TempDir::new().unwrap();
    let miter = build_miter(&dir, &[]);

    let output = xsens(
        dir.path(),
        &["prove", "--design", miter.to_str().unwrap(), "--module", "miter"],
    );
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Assertion failed"), "{}", stdout);
}

#[test]
fn test_constrained_inputs_prove() {
    let dir = TempDir::new().unwrap();
    let miter = build_miter(&dir, &["-constrain_inputs"]);

    let output = xsens(
        dir.path(),
        &["prove", "--design", miter.to_str().unwrap(), "--module", "miter"],
    );
    assert!(
        output.status.success(),
        "prove failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("1 asserts proved"));
}

#[test]
fn test_config_file_sets_pass_defaults() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("xsens.toml"),
        "[sensitize]\nconstrain_inputs = true\n",
    )
    .unwrap();
    let miter = build_miter(&dir, &[]);

    let output = xsens(
        dir.path(),
        &["prove", "--design", miter.to_str().unwrap(), "--module", "miter"],
    );
    assert!(output.status.success());
}

#[test]
fn test_pass_errors_are_reported() {
    let dir = TempDir::new().unwrap();
    let design = write_design(&dir);

    let output = xsens(
        dir.path(),
        &[
            "exec",
            "--design",
            design.to_str().unwrap(),
            "--",
            "sensitizepath",
            "nosuch",
            "miter",
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nosuch"), "{}", stderr);

    let output = xsens(
        dir.path(),
        &[
            "exec",
            "--design",
            design.to_str().unwrap(),
            "--",
            "sensitizepath",
            "-bogus",
            "top",
            "miter",
        ],
    );
    assert!(!output.status.success());
}

#[test]
fn test_malformed_design_is_reported() {
    let dir = TempDir::new().unwrap();
    let mut design = Design::new();
    design.add_module(x_detector()).unwrap();
    let mut value = serde_json::to_value(&design).unwrap();
    value["modules"]["\\top"]["cells"][0]["connections"]["A"][0] =
        serde_json::json!({"Wire": {"wire": 99, "offset": 0}});
    let path = dir.path().join("broken.json");
    std::fs::write(&path, value.to_string()).unwrap();

    let output = xsens(
        dir.path(),
        &[
            "exec",
            "--design",
            path.to_str().unwrap(),
            "--",
            "sensitizepath",
            "top",
            "miter",
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to parse"), "{}", stderr);
    assert!(!stderr.contains("panicked"), "{}", stderr);
}

#[test]
fn test_passes_lists_sensitizepath() {
    let dir = TempDir::new().unwrap();
    let output = xsens(dir.path(), &["passes"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sensitizepath"));
    assert!(stdout.contains("aig"));
}
