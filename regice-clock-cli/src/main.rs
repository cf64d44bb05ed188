use std::{fs, path::PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use regice_clock::{
    ClockTree,
    Description,
    FrequencyOverride,
    Hooks,
    MemoryMap,
    human_readable_frequency,
};

// ----------------------------------------------------------------------------
// Command-line Interface

/// Inspect the clock tree of a device described in TOML.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the clock tree description.
    description: PathBuf,
    /// Override the frequency of a fixed clock, e.g. `xtal=40M`.
    #[arg(long = "freq", value_name = "NAME=VALUE")]
    freqs: Vec<FrequencyOverride>,
    /// Write a register field before reading the tree, e.g. `CLK.SEL=0x2`.
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
    assignments: Vec<(String, u64)>,
    /// Print the clocks nested under the clock feeding them.
    #[arg(long)]
    tree: bool,
    /// Print the register fields and their values.
    #[arg(long)]
    registers: bool,
}

fn parse_assignment(s: &str) -> Result<(String, u64), String> {
    let (path, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, found '{s}'"))?;

    let value = value.trim();
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse::<u64>(),
    };

    let value = parsed.map_err(|err| format!("invalid value '{value}': {err}"))?;
    Ok((path.trim().to_string(), value))
}

// ----------------------------------------------------------------------------
// Application

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_module("regice_clock", log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    let input = fs::read_to_string(&cli.description)
        .with_context(|| format!("Failed to read {}", cli.description.display()))?;
    let description = Description::from_toml(&input)
        .with_context(|| format!("Failed to parse {}", cli.description.display()))?;

    let map = description.registers();
    for (path, value) in cli.assignments.iter() {
        map.write(path, *value)?;
        log::debug!("Set {path} to {value:#x}");
    }

    let mut tree = description.instantiate(&map, &Hooks::new())?;
    for freq in cli.freqs.iter() {
        tree.apply_override(freq);
    }

    if let Err(errors) = tree.validate() {
        for (name, err) in errors.iter() {
            log::error!("Clock '{name}': {err}");
        }
        bail!("{} invalid clock(s) in {}", errors.len(), cli.description.display());
    }

    list_clocks(&tree);

    if cli.tree {
        println!();
        print!("{}", tree.make_tree().render());
    }

    if cli.registers {
        println!();
        print!("{}", render_registers(&map));
    }

    Ok(())
}

fn list_clocks(tree: &ClockTree) {
    for (name, clock) in tree.iter() {
        let freq = match tree.get_freq(name) {
            Ok(freq) => {
                let (freq, unit) = human_readable_frequency(freq);
                format!("{freq:.3} {unit}")
            }
            Err(err) => format!("error: {err}"),
        };
        let state = match tree.is_gated(name) {
            Ok(true) => "gated".to_string(),
            Ok(false) => "running".to_string(),
            Err(err) => format!("error: {err}"),
        };

        println!("{name:<20} {:<8} {freq:>16}  {state}", clock.kind().to_string());
    }
}

fn render_registers(map: &MemoryMap) -> String {
    map.iter()
        .map(|(_, field)| format!("{} = {:#x}\n", field.path(), field.get()))
        .collect()
}
