//! Memory readings
//!
//! A reading is a single point-in-time figure with its unit attached. Sources
//! report raw bytes; conversion into the reporting unit truncates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reporting unit for a memory figure (binary multiples)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryUnit {
    #[serde(rename = "B")]
    Bytes,
    #[serde(rename = "KB")]
    Kilobytes,
    #[serde(rename = "MB")]
    Megabytes,
}

impl MemoryUnit {
    /// Number of bytes in one unit
    pub fn bytes_per_unit(self) -> u64 {
        match self {
            MemoryUnit::Bytes => 1,
            MemoryUnit::Kilobytes => 1024,
            MemoryUnit::Megabytes => 1024 * 1024,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            MemoryUnit::Bytes => "B",
            MemoryUnit::Kilobytes => "KB",
            MemoryUnit::Megabytes => "MB",
        }
    }
}

impl fmt::Display for MemoryUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// A single memory figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryReading {
    pub value: u64,
    pub unit: MemoryUnit,
}

impl MemoryReading {
    pub fn new(value: u64, unit: MemoryUnit) -> Self {
        Self { value, unit }
    }

    /// The reading reported when a source could not be read
    pub fn zero(unit: MemoryUnit) -> Self {
        Self { value: 0, unit }
    }

    /// Convert a raw byte count into `unit`, truncating
    pub fn from_bytes(bytes: u64, unit: MemoryUnit) -> Self {
        Self {
            value: bytes / unit.bytes_per_unit(),
            unit,
        }
    }
}

impl fmt::Display for MemoryReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}
