//! dmm-compact entry point
//!
//! Re-encodes map files with minimal key churn and reports key usage.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use dmm_compact::baseline::load_baseline;
use dmm_compact::commit::FileCommitter;
use dmm_compact::save::{self, SaveReport};
use dmm_compact::{Settings, TileGrid};

#[derive(Parser)]
#[command(name = "dmm-compact", about = "Diff-friendly key compaction for DMM maps")]
struct Cli {
    /// Settings JSON file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Re-save a map, keeping the baseline's keys wherever possible
    Resave {
        /// Map file to read tiles from
        map: PathBuf,
        /// Previously saved version to stay close to (default: MAP)
        #[arg(long)]
        baseline: Option<PathBuf>,
        /// Where to write the result (default: MAP)
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Print the save report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print key usage of a map
    Stats {
        map: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct MapStats {
    format: &'static str,
    extents: String,
    tiles: usize,
    key_length: usize,
    keys: usize,
    unused_keys: Vec<String>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load(path),
        None => Settings::default(),
    };

    let result = match cli.command {
        Command::Resave {
            map,
            baseline,
            output,
            json,
        } => resave(&map, baseline.as_deref(), output.as_deref(), json, &settings),
        Command::Stats { map, json } => stats(&map, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn resave(
    map: &Path,
    baseline: Option<&Path>,
    output: Option<&Path>,
    json: bool,
    settings: &Settings,
) -> Result<(), String> {
    let current = load_baseline(map).map_err(|err| err.to_string())?;
    let tiles = TileGrid::from_map(&current);
    let baseline = baseline.unwrap_or(map);
    let output = output.unwrap_or(map);
    log::info!(
        "Re-saving {} against {} into {}",
        map.display(),
        baseline.display(),
        output.display()
    );

    let mut committer = FileCommitter::new(output);
    let report = save::save(baseline, &tiles, &mut committer, settings).map_err(|err| err.to_string())?;
    print_report(&report, json)
}

fn print_report(report: &SaveReport, json: bool) -> Result<(), String> {
    if json {
        let text = serde_json::to_string_pretty(report).map_err(|err| err.to_string())?;
        println!("{}", text);
    } else {
        println!("keys:                 {}", report.dictionary_size);
        println!("key length:           {}", report.final_key_length);
        println!("reused by content:    {}", report.reused_by_content);
        println!("restored by position: {}", report.restored_by_position);
        println!("deduplicated:         {}", report.deduplicated);
        println!("from leftover keys:   {}", report.taken_from_pool);
        println!("newly generated:      {}", report.generated);
        println!("key length growths:   {}", report.growths);
    }
    Ok(())
}

fn stats(map: &Path, json: bool) -> Result<(), String> {
    let data = load_baseline(map).map_err(|err| err.to_string())?;
    let stats = MapStats {
        format: data.format.as_str(),
        extents: data.extents().to_string(),
        tiles: data.extents().count(),
        key_length: data.key_length,
        keys: data.dictionary.len(),
        unused_keys: data.unused_keys().iter().map(|k| k.to_string()).collect(),
    };

    if json {
        let text = serde_json::to_string_pretty(&stats).map_err(|err| err.to_string())?;
        println!("{}", text);
    } else {
        println!("format:      {}", stats.format);
        println!("extents:     {} ({} tiles)", stats.extents, stats.tiles);
        println!("key length:  {}", stats.key_length);
        println!("keys:        {}", stats.keys);
        if !stats.unused_keys.is_empty() {
            println!("unused keys: {}", stats.unused_keys.join(" "));
        }
    }
    Ok(())
}
