mod cli;

use livets::{config, session};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use livets_media::ts::demux::demux;
use livets_media::StreamKind;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "livets=debug,livets_media=trace".to_string()
        } else {
            "livets=info,livets_media=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Transmux {
            inputs,
            out_dir,
            interval_ms,
        } => transmux(inputs, cli.config.as_deref(), out_dir, interval_ms),
        Commands::Inspect { file, json } => inspect(&file, json),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("livets {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn transmux(
    inputs: Vec<PathBuf>,
    config_path: Option<&Path>,
    out_dir: Option<PathBuf>,
    interval_ms: Option<u32>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // CLI flags override config
    if let Some(dir) = out_dir {
        config.output.dir = dir;
    }
    if let Some(interval) = interval_ms {
        config.segmenter.interval_ms = interval;
    }
    config::validate_config(&config)?;

    for input in &inputs {
        if !input.exists() {
            anyhow::bail!("Input file does not exist: {:?}", input);
        }
    }

    let rt = tokio::runtime::Runtime::new()?;
    let summaries = rt.block_on(session::run_all(inputs, config.clone()))?;

    for summary in &summaries {
        println!(
            "{}: {} tags ({} dropped), {} segments, {} bytes, {:.3}s",
            summary.name,
            summary.tags,
            summary.dropped_tags,
            summary.segments,
            summary.bytes,
            summary.duration_ms as f64 / 1000.0
        );
    }
    println!("Output: {}", config.output.dir.display());

    Ok(())
}

fn inspect(file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let data = std::fs::read(file).with_context(|| format!("Failed to read {:?}", file))?;
    let report = demux(&data).with_context(|| format!("Failed to demux {:?}", file))?;

    if json {
        let json_str = serde_json::to_string_pretty(&report)?;
        println!("{}", json_str);
        return Ok(());
    }

    println!("File: {}", file.display());
    println!("Packets: {}", report.packets);
    match &report.program {
        Some(program) => {
            print!(
                "Program: {} (PMT PID 0x{:04x}",
                program.program_number, program.pmt_pid
            );
            if let Some(pcr_pid) = program.pcr_pid {
                print!(", PCR PID 0x{:04x}", pcr_pid);
            }
            println!(")");
            for stream in &program.streams {
                println!(
                    "  PID 0x{:04x}: stream type 0x{:02x}",
                    stream.pid, stream.stream_type
                );
            }
        }
        None => println!("Program: none"),
    }

    for kind in [StreamKind::Video, StreamKind::Audio] {
        let pes: Vec<_> = report.stream(kind).collect();
        print!("\n{}: {} PES", kind, pes.len());
        if let (Some(first), Some(last)) = (pes.first(), pes.last()) {
            print!(
                ", PTS {:.3}s - {:.3}s",
                first.pts as f64 / 90_000.0,
                last.pts as f64 / 90_000.0
            );
        }
        println!();
        let bytes: usize = pes.iter().map(|p| p.payload_len).sum();
        println!("  Payload: {} bytes", bytes);
        let incomplete = pes.iter().filter(|p| !p.complete).count();
        if incomplete > 0 {
            println!("  Incomplete: {}", incomplete);
        }
    }

    println!("\nContinuity errors: {}", report.continuity_errors.len());
    for err in &report.continuity_errors {
        println!(
            "  packet {}: PID 0x{:04x} expected {} found {}",
            err.packet_index, err.pid, err.expected, err.found
        );
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!("  Segment interval: {} ms", config.segmenter.interval_ms);
    println!(
        "  Repeat parameter sets: {}",
        config.segmenter.repeat_parameter_sets
    );
    println!("  Multiple NALUs per tag: {}", config.decoder.multi_nalu);
    println!("  Output: {}", config.output.dir.display());
    if config.output.playlist {
        println!("  Playlist: {}", config.output.playlist_name);
    }

    Ok(())
}
