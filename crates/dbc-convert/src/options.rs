//! Conversion options

use crate::MAX_ENTRY_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Options controlling an archive conversion
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Output directory; defaults to `<archive stem>_ipynb` next to the archive
    pub output_dir: Option<PathBuf>,
    /// Entries (and decompressed payloads) above this many bytes are skipped
    pub max_entry_size: u64,
    /// Split plain-text entries on the command separator instead of writing
    /// them as a single cell
    pub split_plain_text: bool,
}

impl Default for ConvertOptions {
    #[inline]
    fn default() -> Self {
        Self {
            output_dir: None,
            max_entry_size: MAX_ENTRY_SIZE,
            split_plain_text: false,
        }
    }
}

impl ConvertOptions {
    /// Set the output directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Set the per-entry size limit
    #[must_use]
    pub const fn with_max_entry_size(mut self, max: u64) -> Self {
        self.max_entry_size = max;
        self
    }

    /// Enable or disable splitting of plain-text entries
    #[must_use]
    pub const fn with_split_plain_text(mut self, split: bool) -> Self {
        self.split_plain_text = split;
        self
    }

    /// Output directory for `archive`, applying the default when unset
    #[must_use]
    pub fn resolve_output_dir(&self, archive: &Path) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| default_output_dir(archive))
    }
}

/// `<dir>/<stem>_ipynb` for an archive at `<dir>/<stem>.<ext>`
#[must_use]
pub fn default_output_dir(archive: &Path) -> PathBuf {
    let mut dir = archive.with_extension("").into_os_string();
    dir.push("_ipynb");
    PathBuf::from(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_dir() {
        assert_eq!(
            default_output_dir(Path::new("/data/export.dbc")),
            PathBuf::from("/data/export_ipynb")
        );
        assert_eq!(
            default_output_dir(Path::new("export")),
            PathBuf::from("export_ipynb")
        );
        assert_eq!(
            default_output_dir(Path::new("dir/my.archive.dbc")),
            PathBuf::from("dir/my.archive_ipynb")
        );
    }

    #[test]
    fn test_resolve_output_dir() {
        let archive = Path::new("/data/export.dbc");
        assert_eq!(
            ConvertOptions::default().resolve_output_dir(archive),
            PathBuf::from("/data/export_ipynb")
        );
        assert_eq!(
            ConvertOptions::default()
                .with_output_dir("/tmp/out")
                .resolve_output_dir(archive),
            PathBuf::from("/tmp/out")
        );
    }

    #[test]
    fn test_builder() {
        let options = ConvertOptions::default()
            .with_max_entry_size(10)
            .with_split_plain_text(true);
        assert_eq!(options.max_entry_size, 10);
        assert!(options.split_plain_text);
        assert_eq!(ConvertOptions::default().max_entry_size, MAX_ENTRY_SIZE);
    }
}
