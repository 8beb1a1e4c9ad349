use super::workbook_writer::workbook_bytes;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;

pub const XLSX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A finished workbook ready to be saved or handed to a download.
#[derive(Debug, Clone)]
pub struct OutputArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

pub struct StorageManager;

impl StorageManager {
    /// `{date}_{label}.xlsx`, e.g. `241016_RINCOS_온드_주문등록양식_큐텐.xlsx`.
    pub fn generate_file_name(label: &str, date_format: &str, date: NaiveDate) -> String {
        format!("{}_{}.xlsx", date.format(date_format), label)
    }

    pub fn generate_today_file_name(label: &str, date_format: &str) -> String {
        Self::generate_file_name(label, date_format, Local::now().date_naive())
    }

    pub fn package(df: &DataFrame, file_name: String) -> Result<OutputArtifact> {
        let bytes = workbook_bytes(df)
            .with_context(|| format!("Failed to build workbook {}", file_name))?;

        Ok(OutputArtifact {
            file_name,
            mime_type: XLSX_MIME_TYPE,
            bytes,
        })
    }

    pub fn save(artifact: &OutputArtifact, directory: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(directory)
            .with_context(|| format!("Failed to create output directory: {}", directory.display()))?;

        let path = directory.join(&artifact.file_name);
        std::fs::write(&path, &artifact.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!(
            "Saved {} ({} bytes, {})",
            path.display(),
            artifact.bytes.len(),
            artifact.mime_type
        );
        Ok(path)
    }
}
