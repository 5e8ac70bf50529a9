//! Aurora - command-line control for the Aurora light sculpture

mod colors;
mod logging_setup;

use anyhow::{bail, Context, Result};
use aurora_core::{AuroraConfig, TopologyIndex};
use aurora_dmx::{
    FileLink, MemoryLink, MemoryLinkHandle, SerialLink, SerialPortLink, UniverseCoordinator,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use crate::colors::NamedColor;

#[derive(Parser)]
#[command(name = "aurora")]
#[command(author, version, about = "Aurora DMX control", long_about = None)]
struct Cli {
    /// Rig config (.toml or .json)
    #[arg(short, long, default_value = "aurora.toml")]
    config: PathBuf,

    /// Record frames in memory and print them instead of opening the universes
    #[arg(long, conflicts_with = "capture")]
    dry_run: bool,

    /// Write raw frames to <DIR>/universe-<n>.dmx instead of the serial ports
    #[arg(long, value_name = "DIR")]
    capture: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every pod, limb and branch
    Config,

    /// Set one branch to a named color and send
    Set {
        /// Limb, counted across all pods from 0
        limb: usize,
        /// Branch position on the limb
        position: usize,
        /// red, green, blue, white, off, cyan, magenta or yellow
        color: NamedColor,
    },

    /// Set raw channels start..end on one universe and send
    Channels {
        start: usize,
        end: usize,
        value: u8,
        #[arg(short, long, default_value_t = 0)]
        universe: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AuroraConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config {:?}", cli.config))?;
    let _log_guard = logging_setup::init(&config.logging, cli.verbose)?;

    let params = config.topology_params()?;
    let topology = TopologyIndex::resolve(&params).context("Invalid rig configuration")?;

    match cli.command {
        Commands::Config => {
            print_config(&topology);
            Ok(())
        }
        Commands::Set {
            limb,
            position,
            color,
        } => {
            let branch = topology
                .branch_at(limb, position)
                .with_context(|| format!("No branch at limb {limb}, position {position}"))?;
            let index = branch.index;
            println!("{branch}");

            let (mut dmx, handles) = start(topology, &config, &cli)?;
            dmx.set_branch_rgb(index, color.rgb())?;
            finish(dmx, &handles);
            Ok(())
        }
        Commands::Channels {
            start: first,
            end,
            value,
            universe,
        } => {
            if first > end {
                bail!("start {first} is after end {end}");
            }
            let (mut dmx, handles) = start(topology, &config, &cli)?;
            if universe >= dmx.link_count() {
                bail!("universe {universe} is not configured");
            }
            for address in first..end {
                dmx.set_channel(universe, address, value)?;
            }
            finish(dmx, &handles);
            Ok(())
        }
    }
}

fn print_config(topology: &TopologyIndex) {
    for pod in topology.pods() {
        for limb in &pod.limbs {
            println!("pod {} limb {}", pod.name, limb.name);
            for &index in &limb.branches {
                if let Some(branch) = topology.branch(index) {
                    println!("   {branch}");
                }
            }
        }
    }
}

/// Coordinator over the serial ports, capture files, or memory links for a
/// dry run
fn start(
    topology: TopologyIndex,
    config: &AuroraConfig,
    cli: &Cli,
) -> Result<(UniverseCoordinator, Vec<MemoryLinkHandle>)> {
    let mut handles = Vec::new();
    let links: Vec<Box<dyn SerialLink>> = topology
        .link_ids()
        .iter()
        .enumerate()
        .map(|(universe, id)| -> Box<dyn SerialLink> {
            if cli.dry_run {
                let (link, handle) = MemoryLink::new(id.clone());
                handles.push(handle);
                Box::new(link)
            } else if let Some(dir) = &cli.capture {
                Box::new(FileLink::new(dir.join(format!("universe-{universe}.dmx"))))
            } else {
                Box::new(SerialPortLink::new(id.clone()))
            }
        })
        .collect();

    let dmx = UniverseCoordinator::new(topology, links, config.transmit)?;
    Ok((dmx, handles))
}

/// Send once, wait for the senders to drain, and report
fn finish(mut dmx: UniverseCoordinator, handles: &[MemoryLinkHandle]) {
    let summary = dmx.send_all();
    dmx.shutdown();
    info!(
        "Queued {} frame(s), dropped {}",
        summary.queued, summary.dropped
    );

    for (universe, handle) in handles.iter().enumerate() {
        for frame in handle.writes() {
            println!("universe {universe}: frame of {} bytes", frame.len());
            for (address, &value) in frame.iter().enumerate().skip(1) {
                if value > 0 {
                    println!("chan {:3} val {:3}", address - 1, value);
                }
            }
        }
    }

    for universe in 0..dmx.link_count() {
        if let Some(stats) = dmx.link_stats(universe) {
            if stats.frames_sent < stats.frames_enqueued {
                eprintln!(
                    "universe {} ({}): {} of {} frame(s) reached the transport",
                    universe,
                    dmx.link_name(universe).unwrap_or("?"),
                    stats.frames_sent,
                    stats.frames_enqueued
                );
            }
        }
    }
}
