use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::models::datasets::traces::TransformedTraceData;

/// Writes each block's transformed traces as one newline-delimited JSON
/// file, `<output_dir>/traces/<block_number>.ndjson`. A file is only
/// visible under its final name once fully written, so the highest file
/// name doubles as the resume point.
pub struct NdjsonStorage {
    traces_dir: PathBuf,
}

impl NdjsonStorage {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let traces_dir = output_dir.as_ref().join("traces");
        fs::create_dir_all(&traces_dir)
            .with_context(|| format!("failed to create output dir {}", traces_dir.display()))?;
        info!("Writing trace output to {}", traces_dir.display());
        Ok(Self { traces_dir })
    }

    pub fn write_traces(&self, block_number: u64, traces: &[TransformedTraceData]) -> Result<()> {
        let final_path = self.traces_dir.join(format!("{block_number:012}.ndjson"));
        let tmp_path = final_path.with_extension("ndjson.tmp");

        {
            let mut writer = BufWriter::new(
                File::create(&tmp_path)
                    .with_context(|| format!("failed to create {}", tmp_path.display()))?,
            );
            for trace in traces {
                serde_json::to_writer(&mut writer, trace)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }

        fs::rename(&tmp_path, &final_path)
            .with_context(|| format!("failed to move {} into place", final_path.display()))?;
        Ok(())
    }

    /// Highest block number already written, `None` for a fresh directory.
    pub fn last_processed_block(&self) -> Result<Option<u64>> {
        let mut last = None;
        for entry in fs::read_dir(&self.traces_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("ndjson") {
                continue;
            }
            if let Some(block_number) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<u64>().ok())
            {
                last = last.max(Some(block_number));
            }
        }
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resumes_from_highest_written_block() {
        let dir = std::env::temp_dir().join(format!("trace-indexer-test-{}", std::process::id()));
        let storage = NdjsonStorage::new(&dir).unwrap();

        assert_eq!(storage.last_processed_block().unwrap(), None);

        storage.write_traces(15630274, &[]).unwrap();
        storage.write_traces(2191709, &[]).unwrap();
        assert_eq!(storage.last_processed_block().unwrap(), Some(15630274));

        fs::remove_dir_all(&dir).unwrap();
    }
}
