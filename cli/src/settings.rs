//! Run settings
//!
//! Settings are layered: built-in defaults, then an optional config file,
//! then `VRAMWATCH_*` environment variables, then command-line flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use vramwatch_gpu::{AllocationPolicy, SysfsVramProbe};

/// Compute backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// CPU stand-in with allocation tracking
    Host,
    /// oneDNN matmul primitive on a GPU engine
    Onednn,
}

/// Where the used-memory figure comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// DRM sysfs VRAM counter
    Sysfs,
    /// Bytes held by the host backend's live buffers
    Host,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Number of matmul iterations
    pub iterations: u32,

    /// Pause between iterations (e.g. "500ms")
    pub delay: String,

    /// Matmul shape
    pub m: usize,
    pub k: usize,
    pub n: usize,

    pub backend: Backend,

    pub probe: ProbeKind,

    /// DRM card index for the default sysfs path
    pub card: u32,

    /// GPU engine index for the oneDNN backend
    pub device: usize,

    /// Explicit counter file, overriding `card`
    pub sysfs_path: Option<PathBuf>,

    /// "per-iteration" or "hoisted" (A/B/C allocated once and reused)
    pub allocation: AllocationPolicy,

    /// Check each output against the expected constant
    pub verify: bool,

    /// Optional JSON report path
    pub json: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            iterations: 10,
            delay: "500ms".to_string(),
            m: 512,
            k: 512,
            n: 512,
            backend: Backend::Host,
            probe: ProbeKind::Sysfs,
            card: 0,
            device: 0,
            sysfs_path: None,
            allocation: AllocationPolicy::PerIteration,
            verify: true,
            json: None,
        }
    }
}

impl Settings {
    /// Load defaults, the optional config file and `VRAMWATCH_*` variables
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(config::Environment::with_prefix("VRAMWATCH"));

        builder
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn delay(&self) -> Result<Duration> {
        vramwatch_shared::utils::parse_duration(&self.delay)
            .with_context(|| format!("Invalid delay: {}", self.delay))
    }

    pub fn allocation_policy(&self) -> AllocationPolicy {
        self.allocation
    }

    pub fn sysfs_probe(&self) -> SysfsVramProbe {
        match &self.sysfs_path {
            Some(path) => SysfsVramProbe::new(path),
            None => SysfsVramProbe::for_card(self.card),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            anyhow::bail!("Iterations must be greater than 0");
        }

        if self.m == 0 || self.k == 0 || self.n == 0 {
            anyhow::bail!(
                "Matrix dimensions must be positive (got {}x{}x{})",
                self.m,
                self.k,
                self.n
            );
        }

        self.delay()?;

        if self.backend == Backend::Onednn && !cfg!(feature = "onednn") {
            anyhow::bail!("oneDNN backend not available; rebuild with --features onednn");
        }

        if self.probe == ProbeKind::Host && self.backend != Backend::Host {
            anyhow::bail!("The host probe only tracks the host backend's buffers");
        }

        Ok(())
    }
}
