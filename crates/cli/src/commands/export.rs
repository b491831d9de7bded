//! CSV export command.
//!
//! # Usage
//!
//! ```bash
//! fl-cli export sales --out sales.csv
//! ```
//!
//! Writes the same document the dashboard serves for download.

use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;

use flipledger_dashboard::services::{ExportError, ServiceContext};

use super::CommandError;

/// Which records to export.
#[derive(Debug, Clone, Copy)]
pub enum Kind {
    Inventory,
    Sales,
}

/// Errors while exporting.
#[derive(Debug, Error)]
pub enum ExportCommandError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Build the CSV and write it to `out`, or to its download name.
pub async fn run(kind: Kind, out: Option<&Path>) -> Result<(), ExportCommandError> {
    let (store, _cache, settings) = super::open_store().await?;
    let export = ServiceContext::new(store.as_ref(), &settings, Local::now().date_naive()).export();

    let file = match kind {
        Kind::Inventory => export.inventory_csv().await?,
        Kind::Sales => export.sales_csv().await?,
    };

    let path = out.map_or_else(|| PathBuf::from(&file.filename), Path::to_path_buf);
    std::fs::write(&path, &file.body).map_err(|source| ExportCommandError::Write {
        path: path.display().to_string(),
        source,
    })?;

    tracing::info!(path = %path.display(), bytes = file.body.len(), "Export written");
    Ok(())
}
