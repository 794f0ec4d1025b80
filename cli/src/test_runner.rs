use std::path::{Path, PathBuf};

use serde::Deserialize;

use interpreter::{MockHardware, SensorChannel};
use nepo::config::SensorPort;

/// A scripted sensor queue for one (port, channel) pair.
#[derive(Debug, Deserialize)]
pub struct SensorScript {
    pub port: String,
    pub channel: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Deserialize)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// The NEPO program XML, inline.
    pub program: String,

    /// Robot configuration XML, inline. Absent means the default
    /// configuration.
    #[serde(default)]
    pub config: Option<String>,

    /// Sensor values to script onto the mock hardware.
    #[serde(default)]
    pub sensors: Vec<SensorScript>,

    /// Expected action log, exact and in order. Absent means the log
    /// is not checked.
    #[serde(default)]
    pub expect_actions: Option<Vec<String>>,

    /// Expected termination reason; matched as a prefix of its display
    /// form ("completed", "fatal error", "configuration error", ...).
    #[serde(default = "default_reason")]
    pub expect_reason: String,

    /// Substrings that must each appear in some warning.
    #[serde(default)]
    pub expect_warnings: Vec<String>,
}

fn default_reason() -> String {
    "completed".to_string()
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn fail(path: &Path, description: Option<String>, message: String) -> TestResult {
    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(message),
    }
}

fn run_single_test(path: &Path) -> TestResult {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(path, None, format!("cannot read file: {}", e)),
    };

    let config: TestConfig = match toml::from_str(&content) {
        Ok(c) => c,
        Err(e) => return fail(path, None, format!("TOML parse error: {}", e)),
    };
    let description = config.description.clone();

    // Parse the program and optional configuration
    let program = match nepo::parser::Parser::new(config.program.clone(), 0).parse() {
        Ok(p) => p,
        Err(e) => return fail(path, description, format!("program parse error: {}", e)),
    };
    let config_tree = match &config.config {
        Some(xml) => match nepo::parser::Parser::new(xml.clone(), 1).parse() {
            Ok(tree) => Some(tree),
            Err(e) => return fail(path, description, format!("config parse error: {}", e)),
        },
        None => None,
    };

    // Script the mock hardware
    let mut hardware = MockHardware::new();
    for script in &config.sensors {
        let Some(port) = SensorPort::from_number(&script.port) else {
            return fail(
                path,
                description,
                format!("unknown sensor port '{}'", script.port),
            );
        };
        let Some(channel) = SensorChannel::from_name(&script.channel) else {
            return fail(
                path,
                description,
                format!("unknown channel '{}'", script.channel),
            );
        };
        for value in &script.values {
            hardware.push_sensor(port, channel, *value);
        }
    }

    let outcome = interpreter::run(&program, config_tree.as_ref(), &mut hardware);

    // Check the termination reason
    let reason_text = outcome.reason.to_string();
    if !reason_text.starts_with(&config.expect_reason) {
        return fail(
            path,
            description,
            format!(
                "expected reason '{}', got '{}'",
                config.expect_reason, reason_text
            ),
        );
    }

    // Check the action log, exact and in order
    if let Some(expected) = &config.expect_actions {
        let actual = hardware.log();
        if actual != expected.as_slice() {
            let detail = first_mismatch(expected, actual);
            return fail(path, description, format!("action log mismatch: {}", detail));
        }
    }

    // Check warnings by substring
    for needle in &config.expect_warnings {
        let found = outcome
            .warnings
            .iter()
            .any(|w| w.to_string().contains(needle));
        if !found {
            return fail(
                path,
                description,
                format!("expected a warning containing '{}'", needle),
            );
        }
    }

    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Pass,
    }
}

fn first_mismatch(expected: &[String], actual: &[String]) -> String {
    for (i, exp) in expected.iter().enumerate() {
        match actual.get(i) {
            Some(act) if act == exp => continue,
            Some(act) => return format!("entry {}: expected '{}', got '{}'", i, exp, act),
            None => return format!("entry {}: expected '{}', log ended", i, exp),
        }
    }
    format!(
        "expected {} entries, got {} (first extra: '{}')",
        expected.len(),
        actual.len(),
        actual.get(expected.len()).map(String::as_str).unwrap_or("")
    )
}

/// Collect `.test.toml` files under a path, recursively.
fn collect_test_files(path: &Path, out: &mut Vec<PathBuf>) {
    if path.is_file() {
        out.push(path.to_path_buf());
        return;
    }
    let Ok(entries) = std::fs::read_dir(path) else {
        return;
    };
    let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    paths.sort();
    for entry in paths {
        if entry.is_dir() {
            collect_test_files(&entry, out);
        } else if entry
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".test.toml"))
        {
            out.push(entry);
        }
    }
}

/// Run every test under `path`. Returns the process exit code.
pub fn run_tests(path: &Path) -> i32 {
    let mut files = Vec::new();
    collect_test_files(path, &mut files);

    if files.is_empty() {
        eprintln!("no .test.toml files found under '{}'", path.display());
        return 1;
    }

    let mut passed = 0;
    let mut failed = 0;
    for file in &files {
        let result = run_single_test(file);
        let label = result
            .description
            .unwrap_or_else(|| result.path.display().to_string());
        match result.outcome {
            TestOutcome::Pass => {
                passed += 1;
                println!("PASS {}", label);
            }
            TestOutcome::Fail(message) => {
                failed += 1;
                println!("FAIL {}", label);
                println!("     {}: {}", result.path.display(), message);
            }
        }
    }

    println!("{} passed, {} failed", passed, failed);
    if failed == 0 { 0 } else { 1 }
}
