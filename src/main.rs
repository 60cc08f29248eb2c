// Sat Oct 17 2026 - Alex

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use colored::Colorize;
use cxx_layout::{
    config::{Abi, TargetConfig},
    layout::rtti::RttiDescriptors,
    layout::{LayoutValidator, SerializableLayout, StructLayout},
    registry::TypeRegistry,
    script::Script,
    utils::{pluralize, LoggingUtils},
};
use log::debug;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "C++ class layout engine: offsets, bitfields, vtables and RTTI", long_about = None)]
struct Args {
    /// Declaration script (JSON)
    script: PathBuf,

    /// Target preset: x86_64, i686 or x86_64-msvc
    #[arg(short, long, default_value = "x86_64")]
    target: String,

    /// Target configuration file, overrides --target
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the finalized layouts as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    #[arg(long)]
    no_rtti: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(long)]
    log_level: Option<String>,
}

fn main() {
    let args = Args::parse();

    let level = match &args.log_level {
        Some(level) => LoggingUtils::level_from_str(level),
        None => LoggingUtils::level_from_verbosity(args.verbose),
    };
    LoggingUtils::init_logger(level);

    if let Err(e) = run(&args) {
        eprintln!("{} {:#}", "[!]".red(), e);
        process::exit(1);
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => TargetConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => TargetConfig::preset(&args.target).ok_or_else(|| anyhow!("unknown target '{}'", args.target))?,
    };
    if args.no_rtti {
        config = config.with_rtti(false);
    }
    config.validate().map_err(|e| anyhow!(e))?;
    debug!("target: {:?}", config);

    let script = Script::load(&args.script)?;
    println!(
        "{} Loaded {} from {}",
        "[*]".blue(),
        pluralize(script.types.len(), "type", "types"),
        args.script.display()
    );

    let mut registry = TypeRegistry::with_builtins(&config);
    let report = script.run(&mut registry, &config)?;
    let validator = LayoutValidator::new(&config);

    let mut exported = Vec::new();
    for outcome in &report.outcomes {
        let layout = registry
            .layout(outcome.index)
            .ok_or_else(|| anyhow!("{} has no layout", outcome.name))?;

        println!();
        match &outcome.result {
            Ok(()) => {
                println!("{} {}", "[+]".green(), outcome.name.bold());
                print_layout(layout, &config);
                if let Err(e) = validator.validate(layout) {
                    println!("{} {}", "[!]".yellow(), e);
                }
            }
            Err(e) => println!("{} {}: {}", "[-]".red(), outcome.name.bold(), e.to_string().red()),
        }
        exported.push(SerializableLayout::from(layout));
    }

    for name in &report.skipped {
        println!("{} {} skipped", "[-]".yellow(), name);
    }

    if let Some(path) = &args.json {
        let json = serde_json::to_string_pretty(&exported)?;
        let mut file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        file.write_all(json.as_bytes())?;
        println!("\n{} Layouts written to {}", "[+]".green(), path.display());
    }

    let failures = report.failures().count();
    println!();
    if !report.is_success() {
        bail!(
            "{} failed to finalize, {} skipped",
            pluralize(failures, "type", "types"),
            report.skipped.len()
        );
    }
    println!(
        "{} {} finalized",
        "[+]".green(),
        pluralize(report.outcomes.len(), "type", "types")
    );
    Ok(())
}

fn print_layout(layout: &StructLayout, config: &TargetConfig) {
    for line in layout.to_string().lines() {
        if line.trim_start().starts_with("//") {
            println!("    {}", line.dimmed());
        } else {
            println!("    {}", line);
        }
    }
    if let Some(rtti) = layout.rtti() {
        print_rtti(rtti, config);
    }
}

fn print_rtti(rtti: &RttiDescriptors, config: &TargetConfig) {
    let itanium = format!("itanium: {}", rtti.itanium);
    let msvc = match &rtti.msvc {
        Some(msvc) => format!(
            "msvc: {} ({}, attributes 0x{:X})",
            msvc.type_descriptor.decorated_name,
            pluralize(msvc.hierarchy.num_base_classes(), "base descriptor", "base descriptors"),
            msvc.hierarchy.attributes.bits()
        ),
        None => "msvc: no complete object locator".to_string(),
    };
    let (first, second) = match config.abi {
        Abi::Itanium => (itanium, msvc),
        Abi::Msvc => (msvc, itanium),
    };
    println!("    {} {}", "rtti".cyan(), first);
    println!("         {}", second.dimmed());
}
