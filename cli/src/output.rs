//! JSON report output

use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;
use vramwatch_shared::RunReport;

/// Write the run report as pretty-printed JSON
pub fn write_report(report: &RunReport, output_path: &Path) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;

    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, report).context("Failed to serialize run report")?;

    info!("Run report written to {}", output_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vramwatch_shared::{IterationSample, MemoryReading, MemoryUnit};

    #[test]
    fn test_write_report() {
        let mut report = RunReport::new(
            "host",
            (512, 512, 512),
            "per-iteration",
            MemoryReading::new(10, MemoryUnit::Kilobytes),
        );
        report.push_sample(IterationSample {
            iteration: 1,
            reading: MemoryReading::new(12, MemoryUnit::Kilobytes),
            timestamp_ns: 42,
        });

        let temp_dir = tempfile::tempdir().unwrap();
        let output_path = temp_dir.path().join("report.json");

        write_report(&report, &output_path).unwrap();

        let contents = std::fs::read_to_string(&output_path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed["samples"][0]["iteration"], 1);
        assert_eq!(parsed["samples"][0]["reading"]["value"], 12);
        assert_eq!(parsed["allocation"], "per-iteration");
    }

    #[test]
    fn test_write_report_bad_path() {
        let report = RunReport::new(
            "host",
            (1, 1, 1),
            "hoisted",
            MemoryReading::zero(MemoryUnit::Kilobytes),
        );
        let temp_dir = tempfile::tempdir().unwrap();
        let bad = temp_dir.path().join("missing-dir").join("report.json");
        assert!(write_report(&report, &bad).is_err());
    }
}
