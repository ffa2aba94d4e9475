//! Static camera catalog.
//!
//! The catalog is a comma-separated table with columns
//! `[id, latitude, longitude, area]` mapping a camera identifier to the
//! named area it watches. It is read in full on each load so a run always
//! reflects the table currently on disk. The live feed may legitimately
//! reference cameras the catalog has never heard of (newly installed
//! ones); lookup therefore returns an `Option`, and an unknown identifier
//! is not an error.

use std::collections::HashMap;
use std::path::Path;

use crate::errors::PipelineError;

/// Identifier-to-area-label reference table, immutable once loaded.
#[derive(Debug, Default)]
pub struct AreaCatalog {
    areas: HashMap<String, String>,
}

impl AreaCatalog {
    /// Read the catalog table from `path`.
    ///
    /// An optional header row (first column literally `id`) is skipped.
    /// Blank lines are ignored. Rows with fewer than four columns fail
    /// with `CatalogMalformed`, naming the offending line.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::CatalogUnavailable(format!("{}: {}", path.display(), e))
        })?;
        Self::parse(&raw)
    }

    /// Parse catalog rows from raw text. Split out of `load` so malformed
    /// tables are testable without touching the filesystem.
    pub fn parse(raw: &str) -> Result<Self, PipelineError> {
        let mut areas = HashMap::new();
        let mut seen_content = false;
        for (index, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let columns: Vec<&str> = line.split(',').map(str::trim).collect();
            if !seen_content {
                seen_content = true;
                if columns[0].eq_ignore_ascii_case("id") {
                    continue;
                }
            }
            if columns.len() < 4 {
                return Err(PipelineError::CatalogMalformed {
                    line: index + 1,
                    reason: format!("expected 4 columns, found {}", columns.len()),
                });
            }
            let id = columns[0];
            if id.is_empty() {
                return Err(PipelineError::CatalogMalformed {
                    line: index + 1,
                    reason: "empty camera identifier".to_string(),
                });
            }
            // Duplicate identifiers: last row wins, plain map semantics.
            areas.insert(id.to_string(), columns[3].to_string());
        }
        Ok(Self { areas })
    }

    /// Area label for `camera_id`, or `None` when the catalog does not
    /// list it.
    pub fn area_for(&self, camera_id: &str) -> Option<&str> {
        self.areas.get(camera_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}
