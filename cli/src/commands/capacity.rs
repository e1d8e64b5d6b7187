//! Capacity command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::io::Write;
use tracing::debug;
use vramwatch_gpu::{GpuRuntime, RuntimeCapacityProbe};
use vramwatch_shared::{MemoryReading, MemoryUnit};

#[derive(Args, Debug)]
pub struct CapacityArgs {
    /// Only report this device (index within the first driver)
    #[arg(short, long)]
    pub device: Option<usize>,
}

/// Print one line per device: bank 0 capacity in MB
pub fn write_capacities<R: GpuRuntime, W: Write>(
    probe: &mut RuntimeCapacityProbe<R>,
    device: Option<usize>,
    out: &mut W,
) -> Result<()> {
    if let Some(index) = device {
        let reading = probe
            .read_capacity_mb(index)
            .context("Failed to query device memory")?;
        writeln!(out, "Device {} total memory: {}", index, reading)?;
        return Ok(());
    }

    let capacities = probe
        .device_capacities()
        .context("Failed to query device memory")?;
    for capacity in &capacities {
        for (bank_index, bank) in capacity.banks.iter().enumerate() {
            debug!(
                "Device {} bank {} ({}): {}",
                capacity.device,
                bank_index,
                bank.name,
                MemoryReading::from_bytes(bank.total_size, MemoryUnit::Megabytes)
            );
        }
        writeln!(
            out,
            "Device {} total memory: {}",
            capacity.device,
            capacity.first_bank_mb()
        )?;
    }
    Ok(())
}

#[cfg(feature = "level-zero")]
pub fn run(args: CapacityArgs) -> Result<()> {
    use vramwatch_gpu::probe::level_zero::LevelZeroRuntime;

    let mut probe = RuntimeCapacityProbe::new(LevelZeroRuntime::new());
    let stdout = std::io::stdout();
    write_capacities(&mut probe, args.device, &mut stdout.lock())
}

#[cfg(not(feature = "level-zero"))]
pub fn run(_args: CapacityArgs) -> Result<()> {
    anyhow::bail!("Level Zero support not available; rebuild with --features level-zero")
}
