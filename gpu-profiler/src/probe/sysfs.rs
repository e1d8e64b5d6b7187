//! sysfs VRAM counter
//!
//! The amdgpu driver exposes used VRAM as a plain-text byte count under
//! `/sys/class/drm/card<N>/`. The file holds a single decimal integer.

use super::MemoryReporter;
use std::fs;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use vramwatch_shared::{MemoryReading, MemoryUnit};

pub const DEFAULT_VRAM_USED_PATH: &str = "/sys/class/drm/card0/mem_info_vram_used";

/// Parse the first whitespace-separated token of a counter file as bytes
pub fn parse_counter(text: &str) -> Result<u64, ParseIntError> {
    text.split_whitespace().next().unwrap_or("").parse()
}

/// Reads used VRAM from a sysfs counter file
#[derive(Debug, Clone)]
pub struct SysfsVramProbe {
    path: PathBuf,
}

impl SysfsVramProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Counter of DRM card `index`
    pub fn for_card(index: u32) -> Self {
        Self::new(format!("/sys/class/drm/card{}/mem_info_vram_used", index))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Used VRAM in bytes, or `None` after logging a diagnostic
    pub fn read_bytes(&self) -> Option<u64> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to open: {} ({})", self.path.display(), e);
                return None;
            }
        };

        match parse_counter(&text) {
            Ok(bytes) => {
                debug!("{}: {} bytes", self.path.display(), bytes);
                Some(bytes)
            }
            Err(e) => {
                error!("Failed to parse counter in {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Used VRAM in kilobytes; 0 when the counter cannot be read
    pub fn read_used_kb(&self) -> u64 {
        self.read_memory().value
    }
}

impl Default for SysfsVramProbe {
    fn default() -> Self {
        Self::new(DEFAULT_VRAM_USED_PATH)
    }
}

impl MemoryReporter for SysfsVramProbe {
    fn read_memory(&self) -> MemoryReading {
        match self.read_bytes() {
            Some(bytes) => MemoryReading::from_bytes(bytes, MemoryUnit::Kilobytes),
            None => MemoryReading::zero(MemoryUnit::Kilobytes),
        }
    }
}
