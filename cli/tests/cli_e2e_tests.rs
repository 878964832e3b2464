//! CLI end-to-end tests that run every fixture description through
//! compile → command → execute --dry-run.

use assert_cmd::Command;
use std::fs;
use std::io::Write;
use tempfile::TempDir;

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../tests/processes");

#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin("ogcproc").expect("binary should exist")
}

fn fixture_names() -> Vec<&'static str> {
    vec!["otb_bandmath", "hellor", "mixed_types"]
}

fn compile(dir: &TempDir, name: &str) -> String {
    let tool = dir.path().join(format!("{name}.tool.json"));
    cmd()
        .args(["compile", &format!("{FIXTURES_DIR}/{name}.json")])
        .args(["-o", tool.to_str().unwrap()])
        .assert()
        .success();
    tool.to_str().unwrap().to_string()
}

// ── E2E: Compile all fixtures ───────────────────────────────────────────────

#[test]
fn test_e2e_compile_all_fixtures() {
    let dir = TempDir::new().unwrap();
    for name in fixture_names() {
        let tool = compile(&dir, name);
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&tool).unwrap())
            .unwrap_or_else(|e| panic!("{name}: tool is not JSON: {e}"));
        assert!(value["process_id"].is_string(), "{name}: no process_id");
        assert_eq!(
            value["controls"].as_array().map(Vec::len),
            Some(2),
            "{name}: expected prefer and response controls"
        );
    }
}

#[test]
fn test_e2e_command_template_for_all_fixtures() {
    let dir = TempDir::new().unwrap();
    for name in fixture_names() {
        let tool = compile(&dir, name);
        let output = cmd().args(["command", &tool]).assert().success();
        let template = String::from_utf8(output.get_output().stdout.clone()).unwrap();
        assert!(
            template.starts_with("$__tool_directory__/ogcproc name '"),
            "{name}: {template}"
        );
        assert!(template.contains("prefer '$Section_prefer.prefer'"), "{name}");
    }
}

// ── E2E: BandMath invocation ────────────────────────────────────────────────

#[test]
fn test_e2e_bandmath_dry_run() {
    let dir = TempDir::new().unwrap();
    let tool = compile(&dir, "otb_bandmath");

    let hrefs = dir.path().join("il.txt");
    let mut file = fs::File::create(&hrefs).unwrap();
    writeln!(file, "https://example.org/a.tif").unwrap();
    writeln!(file, "https://example.org/b.tif").unwrap();
    drop(file);

    let output = cmd()
        .args(["execute", "--tool", &tool, "--dry-run", "--"])
        .args(["name", "OTB.BandMath", "exp", "im1b1+im2b1"])
        .args(["il", hrefs.to_str().unwrap(), "isArrayil", "True"])
        .args(["out", "uint8", "ram", "None"])
        .args(["prefer", "respond-async;return=representation", "response", "raw"])
        .args(["outputType_out", "image/jpeg", "transmissionMode_out", "value"])
        .args(["output_data_out", "out.jpeg"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let invocation: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(invocation["prefer"], "respond-async;return=representation");
    assert_eq!(
        invocation["payload"],
        serde_json::json!({
            "inputs": {
                "exp": "im1b1+im2b1",
                "il": [{"href": "https://example.org/a.tif"}, {"href": "https://example.org/b.tif"}],
                "out": "uint8"
            },
            "outputs": {
                "out": {"transmissionMode": "reference", "format": {"mediaType": "image/jpeg"}}
            },
            "response": "raw"
        })
    );
    assert_eq!(invocation["targets"][0]["media_type"], "image/jpeg");
}
