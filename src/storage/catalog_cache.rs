use super::workbook_reader::read_workbook;
use anyhow::{Result, anyhow};
use polars::prelude::*;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Where the product catalog comes from for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    /// The bundled catalog, loaded once per process through [`CatalogCache`]
    Default,
    /// A catalog file supplied for this run
    Uploaded(PathBuf),
}

impl CatalogSource {
    /// Resolve the catalog toggle. Turning the default off without supplying a
    /// file is an error that asks the operator to choose.
    pub fn select(use_default: bool, uploaded: Option<PathBuf>) -> Result<Self> {
        match (use_default, uploaded) {
            (true, _) => Ok(CatalogSource::Default),
            (false, Some(path)) => Ok(CatalogSource::Uploaded(path)),
            (false, None) => {
                warn!("No catalog selected");
                Err(anyhow!(
                    "Upload a catalog workbook with --catalog or use the default catalog"
                ))
            }
        }
    }
}

/// Read-only default catalog, loaded on first use and shared afterwards.
///
/// Loading happens under the lock, so concurrent first callers wait for a
/// single load. A missing file caches an empty catalog; a read error is
/// returned and nothing is cached.
pub struct CatalogCache {
    path: PathBuf,
    loaded: Mutex<Option<DataFrame>>,
}

impl CatalogCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CatalogCache {
            path: path.into(),
            loaded: Mutex::new(None),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    pub fn load(&self) -> Result<DataFrame> {
        let mut slot = self
            .loaded
            .lock()
            .map_err(|_| anyhow!("Default catalog cache lock poisoned"))?;

        if let Some(catalog) = slot.as_ref() {
            return Ok(catalog.clone());
        }

        let catalog = if self.path.exists() {
            info!("Loading default catalog from {}", self.path.display());
            read_workbook(&self.path)?
        } else {
            error!(
                "⚠️ Default catalog {} not found, continuing with an empty catalog",
                self.path.display()
            );
            DataFrame::empty()
        };

        *slot = Some(catalog.clone());
        Ok(catalog)
    }
}

/// Load the catalog for a run according to its source.
pub fn load_catalog(source: &CatalogSource, cache: &CatalogCache) -> Result<DataFrame> {
    match source {
        CatalogSource::Default => cache.load(),
        CatalogSource::Uploaded(path) => read_workbook(path),
    }
}
