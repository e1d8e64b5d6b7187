//! Run command implementation

use crate::settings::{Backend, ProbeKind, Settings};
use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;
use vramwatch_gpu::{
    AllocationPolicy, ComputeDriver, HostExecutor, MatmulExecutor, MatmulShape, MemoryReporter,
    MonitorConfig, MonitorLoop,
};
use vramwatch_shared::RunReport;

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Config file (TOML, YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of matmul iterations [default: 10]
    #[arg(short, long)]
    pub iterations: Option<u32>,

    /// Pause between iterations (e.g. "500ms", "1s") [default: 500ms]
    #[arg(short, long)]
    pub delay: Option<String>,

    /// Rows of A and C [default: 512]
    #[arg(short)]
    pub m: Option<usize>,

    /// Inner dimension [default: 512]
    #[arg(short)]
    pub k: Option<usize>,

    /// Columns of B and C [default: 512]
    #[arg(short)]
    pub n: Option<usize>,

    /// Compute backend [default: host]
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Used-memory source [default: sysfs]
    #[arg(long, value_enum)]
    pub probe: Option<ProbeKind>,

    /// DRM card index for the sysfs counter [default: 0]
    #[arg(long)]
    pub card: Option<u32>,

    /// GPU engine index for the oneDNN backend [default: 0]
    #[arg(long)]
    pub device: Option<usize>,

    /// Read used memory from this file instead of the card's counter
    #[arg(long)]
    pub sysfs_path: Option<PathBuf>,

    /// Buffer allocation policy: per-iteration or hoisted [default: per-iteration]
    #[arg(long)]
    pub allocation: Option<AllocationPolicy>,

    /// Allocate buffers once and reuse them across iterations (same as --allocation hoisted)
    #[arg(long, conflicts_with = "allocation")]
    pub hoist: bool,

    /// Skip output verification
    #[arg(long)]
    pub no_verify: bool,

    /// Also write the run report as JSON
    #[arg(long)]
    pub json: Option<PathBuf>,
}

/// Apply command-line flags on top of file/env settings
pub fn apply_overrides(mut settings: Settings, args: &RunArgs) -> Settings {
    if let Some(iterations) = args.iterations {
        settings.iterations = iterations;
    }
    if let Some(delay) = &args.delay {
        settings.delay = delay.clone();
    }
    if let Some(m) = args.m {
        settings.m = m;
    }
    if let Some(k) = args.k {
        settings.k = k;
    }
    if let Some(n) = args.n {
        settings.n = n;
    }
    if let Some(backend) = args.backend {
        settings.backend = backend;
    }
    if let Some(probe) = args.probe {
        settings.probe = probe;
    }
    if let Some(card) = args.card {
        settings.card = card;
    }
    if let Some(device) = args.device {
        settings.device = device;
    }
    if let Some(path) = &args.sysfs_path {
        settings.sysfs_path = Some(path.clone());
    }
    if let Some(allocation) = args.allocation {
        settings.allocation = allocation;
    }
    if args.hoist {
        settings.allocation = AllocationPolicy::Hoisted;
    }
    if args.no_verify {
        settings.verify = false;
    }
    if let Some(json) = &args.json {
        settings.json = Some(json.clone());
    }
    settings
}

pub fn run(args: RunArgs) -> Result<()> {
    let settings = apply_overrides(Settings::load(args.config.as_deref())?, &args);
    settings.validate()?;
    info!("Configuration: {:?}", settings);

    let shape = MatmulShape::new(settings.m, settings.k, settings.n)?;
    let config = MonitorConfig {
        iterations: settings.iterations,
        delay: settings.delay()?,
        verify: settings.verify,
    };
    let policy = settings.allocation_policy();

    let report = match settings.backend {
        Backend::Host => {
            let executor = HostExecutor::new();
            let reporter: Box<dyn MemoryReporter> = match settings.probe {
                ProbeKind::Host => Box::new(executor.tracker().clone()),
                ProbeKind::Sysfs => Box::new(settings.sysfs_probe()),
            };
            monitor(executor, reporter, shape, policy, config)?
        }
        Backend::Onednn => run_onednn(&settings, shape, policy, config)?,
    };

    if let Some(path) = &settings.json {
        output::write_report(&report, path)?;
    }

    Ok(())
}

fn monitor<E: MatmulExecutor, R: MemoryReporter>(
    executor: E,
    reporter: R,
    shape: MatmulShape,
    policy: AllocationPolicy,
    config: MonitorConfig,
) -> Result<RunReport> {
    info!(
        "Running {} iterations of {}x{}x{} matmul on {} ({} buffers)",
        config.iterations,
        shape.m(),
        shape.k(),
        shape.n(),
        executor.name(),
        policy
    );

    let driver = ComputeDriver::new(executor, shape).with_policy(policy);
    let mut monitor = MonitorLoop::new(driver, reporter, config);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    monitor.run(&mut out).context("Matmul loop failed")
}

#[cfg(feature = "onednn")]
fn run_onednn(
    settings: &Settings,
    shape: MatmulShape,
    policy: AllocationPolicy,
    config: MonitorConfig,
) -> Result<RunReport> {
    let executor = vramwatch_gpu::compute::onednn::DnnlExecutor::new(settings.device)
        .context("Failed to create oneDNN GPU engine")?;
    monitor(executor, settings.sysfs_probe(), shape, policy, config)
}

#[cfg(not(feature = "onednn"))]
fn run_onednn(
    _settings: &Settings,
    _shape: MatmulShape,
    _policy: AllocationPolicy,
    _config: MonitorConfig,
) -> Result<RunReport> {
    anyhow::bail!("oneDNN backend not available; rebuild with --features onednn")
}
