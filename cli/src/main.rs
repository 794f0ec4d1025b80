mod test_runner;

use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use interpreter::{MockHardware, SensorChannel, TerminationReason};
use nepo::config::SensorPort;
use nepo::element::Element;

const SUBCOMMANDS: &[&str] = &["run", "test", "help"];

#[derive(Parser)]
#[command(name = "nepo", version, about = "NEPO block-program interpreter")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a NEPO program on the mock hardware
    Run(RunArgs),

    /// Run .test.toml golden-file tests
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Program XML file to execute
    file: String,

    /// Robot configuration XML file
    #[arg(short, long)]
    config: Option<String>,

    /// Parse and validate only, don't execute (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// Dump the parsed element tree
    #[arg(long)]
    tree: bool,

    /// Scripted sensor values, e.g. --sensor S4:distance=80 (repeatable)
    #[arg(short, long)]
    sensor: Vec<String>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.toml file or a directory containing them
    path: String,
}

fn main() {
    // Backwards compatibility: if the first positional arg is not a known
    // subcommand, inject "run" so `nepo prog.xml` works like `nepo run prog.xml`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(first_pos) = args.iter().skip(1).find(|a| !a.starts_with('-')) {
        let first_pos = first_pos.clone();
        if !SUBCOMMANDS.contains(&first_pos.as_str()) {
            let pos = args.iter().position(|a| *a == first_pos).unwrap();
            args.insert(pos, "run".to_string());
        }
    }

    let cli = Cli::parse_from(&args);

    match cli.command {
        Command::Run(run_args) => do_run(run_args, cli.no_color),
        Command::Test(test_args) => {
            let exit_code = test_runner::run_tests(Path::new(&test_args.path));
            process::exit(exit_code);
        }
    }
}

fn do_run(args: RunArgs, no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let writer = StandardStream::stderr(color_choice);
    let term_config = term::Config::default();
    let mut files = SimpleFiles::new();

    // Parse the program
    let source = match std::fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", args.file, e);
            process::exit(1);
        }
    };
    let file_id = files.add(args.file.clone(), source.clone());
    let program = match nepo::parser::Parser::new(source, file_id).parse() {
        Ok(p) => p,
        Err(error) => {
            let _ = term::emit_to_write_style(
                &mut writer.lock(),
                &term_config,
                &files,
                &error.to_diagnostic(),
            );
            process::exit(1);
        }
    };

    // Parse the configuration, when given
    let config_tree = args.config.as_ref().map(|path| {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: cannot read '{}': {}", path, e);
                process::exit(1);
            }
        };
        let config_id = files.add(path.clone(), source.clone());
        match nepo::parser::Parser::new(source, config_id).parse() {
            Ok(tree) => tree,
            Err(error) => {
                let _ = term::emit_to_write_style(
                    &mut writer.lock(),
                    &term_config,
                    &files,
                    &error.to_diagnostic(),
                );
                process::exit(1);
            }
        }
    });

    // --tree: dump the lazy element forest
    if args.tree {
        print_tree(&program.root, 0);
        return;
    }

    // --check: validate entry block and configuration, then exit
    if args.check {
        if let Err(e) = nepo::block::find_start_block(&program) {
            eprintln!("error: {}", e);
            process::exit(1);
        }
        if let Some(tree) = &config_tree {
            if let Err(e) = nepo::config::parse_configuration(tree) {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        }
        eprintln!("ok: {} parsed successfully", args.file);
        return;
    }

    // Script sensor values onto the mock hardware
    let mut hardware = MockHardware::new();
    for arg in &args.sensor {
        match parse_sensor_arg(arg) {
            Ok((port, channel, value)) => hardware.push_sensor(port, channel, value),
            Err(msg) => {
                eprintln!("error: bad --sensor '{}': {}", arg, msg);
                process::exit(1);
            }
        }
    }

    // Execute; the action log is the program's observable output
    let outcome = interpreter::run(&program, config_tree.as_ref(), &mut hardware);

    for action in hardware.log() {
        println!("{}", action);
    }
    for warning in &outcome.warnings {
        eprintln!("warning: {}", warning);
    }
    match &outcome.reason {
        TerminationReason::Completed => eprintln!("program completed"),
        reason => {
            eprintln!("program did not complete: {}", reason);
            process::exit(1);
        }
    }
}

fn print_tree(el: &Element, indent: usize) {
    let pad = "  ".repeat(indent);
    let attrs: Vec<String> = el
        .attributes()
        .iter()
        .map(|a| format!("{}={:?}", a.name, a.value.as_str()))
        .collect();
    if attrs.is_empty() {
        println!("{}{}", pad, el.tag_name());
    } else {
        println!("{}{} {}", pad, el.tag_name(), attrs.join(" "));
    }
    match el.text() {
        Some(text) if !text.is_empty() => println!("{}  {:?}", pad, text),
        _ => {}
    }
    for child in el.children() {
        print_tree(child, indent + 1);
    }
}

/// Parse a `PORT:CHANNEL=VALUE` sensor script entry.
fn parse_sensor_arg(arg: &str) -> Result<(SensorPort, SensorChannel, f64), String> {
    let (port_part, rest) = arg
        .split_once(':')
        .ok_or("expected PORT:CHANNEL=VALUE")?;
    let (channel_part, value_part) = rest
        .split_once('=')
        .ok_or("expected PORT:CHANNEL=VALUE")?;
    let port = SensorPort::from_number(port_part)
        .ok_or_else(|| format!("unknown sensor port '{}'", port_part))?;
    let channel = SensorChannel::from_name(channel_part)
        .ok_or_else(|| format!("unknown channel '{}'", channel_part))?;
    let value: f64 = value_part
        .trim()
        .parse()
        .map_err(|_| format!("bad value '{}'", value_part))?;
    Ok((port, channel, value))
}
