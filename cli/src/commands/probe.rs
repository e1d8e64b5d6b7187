//! Probe command implementation

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use vramwatch_gpu::{MemoryReporter, SysfsVramProbe};

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// DRM card index
    #[arg(long, default_value = "0")]
    pub card: u32,

    /// Counter file to read instead of the card's default
    #[arg(long)]
    pub sysfs_path: Option<PathBuf>,
}

pub fn run(args: ProbeArgs) -> Result<()> {
    let probe = match args.sysfs_path {
        Some(path) => SysfsVramProbe::new(path),
        None => SysfsVramProbe::for_card(args.card),
    };

    // An unreadable counter is logged and reported as 0, never an error
    println!("{}: {}", probe.label(), probe.read_memory());
    Ok(())
}
