use crate::config::load_config;
use crate::dump::{LayoutDump, write_layout_dump};
use crate::layout::compute_level_layout;
use crate::model::{Diagram, Level};
use crate::validate::{Severity, filter_for_display, validate};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "dfde", version, about = "DFD layout and validation engine")]
pub struct Args {
    /// Input diagram JSON file, or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// What to do with the diagram
    #[arg(short = 'm', long = "mode", value_enum, default_value = "check")]
    pub mode: Mode,

    /// View level (0, 1 or 2). Defaults to the diagram's active level.
    #[arg(short = 'l', long = "level")]
    pub level: Option<u8>,

    /// Engine config file (JSON or JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Output file for layout dumps. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Print raw findings without the display filter
    #[arg(long = "raw")]
    pub raw: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Mode {
    /// Validate and print findings; exits non-zero on errors.
    Check,
    /// Compute the level layout and dump it as JSON.
    Layout,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let input = read_input(args.input.as_deref())?;
    let diagram = Diagram::from_json(&input)?;
    let level = match args.level {
        Some(value) => Level::try_from(value)?,
        None => diagram.level,
    };

    match args.mode {
        Mode::Check => {
            let findings = if args.raw {
                validate(&diagram)
            } else {
                filter_for_display(validate(&diagram), &diagram)
            };
            for finding in &findings {
                let severity = match finding.severity {
                    Severity::Error => "error",
                    Severity::Warning => "warning",
                    Severity::Info => "info",
                };
                let subject = finding
                    .node
                    .as_deref()
                    .or(finding.edge.as_deref())
                    .unwrap_or("diagram");
                println!("{severity} {}: {} [{subject}]", finding.rule, finding.message);
            }
            let errors = findings
                .iter()
                .filter(|finding| finding.severity == Severity::Error)
                .count();
            if errors > 0 {
                return Err(anyhow::anyhow!("{errors} validation error(s)"));
            }
            Ok(())
        }
        Mode::Layout => {
            let layout = compute_level_layout(&diagram, level, &config);
            let findings = filter_for_display(validate(&diagram), &diagram);
            match args.output.as_deref() {
                Some(path) => write_layout_dump(path, &diagram, &layout, findings)?,
                None => {
                    let dump = LayoutDump::from_layout(&diagram, &layout, findings);
                    println!("{}", serde_json::to_string_pretty(&dump)?);
                }
            }
            Ok(())
        }
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}
