//! Databricks archive traversal
//!
//! A `.dbc` file is a ZIP container. Every entry is decoded, split into
//! notebook records and written out as `.ipynb` files. Problems with a single
//! entry are logged and skipped; only an unreadable archive aborts the run.

use crate::assemble::{assemble, DEFAULT_LANGUAGE};
use crate::decode::{decode_with_limit, PayloadFormat};
use crate::error::{ConvertError, Result};
use crate::extract::extract;
use crate::ipynb::{notebook_from_text, single_cell_notebook, write_document, write_notebook};
use crate::options::ConvertOptions;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, Read, Seek};
use std::path::{Component, Path, PathBuf};
use zip::result::ZipError;
use zip::ZipArchive;

/// Name used when neither the record nor the entry yields a usable one
const FALLBACK_NAME: &str = "notebook";

/// Outcome of converting one archive
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversionReport {
    /// Notebook files written, in archive order
    pub written: Vec<PathBuf>,
    /// Non-directory entries examined
    pub entries: usize,
    /// Entries or records intentionally left out (manifests, blank text)
    pub skipped: usize,
    /// Entries or records that could not be read, decoded or written
    pub failed: usize,
}

/// What an archive entry holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPayload {
    /// `MANIFEST.MF`, never converted
    Manifest,
    /// Password-protected entry
    Encrypted,
    /// Larger than the configured limit
    TooLarge,
    /// Could not be read
    Unreadable,
    /// JSON recovered with the given decoding
    Decoded(PayloadFormat),
    /// Non-JSON text, converted as a single notebook
    PlainText,
    /// Nothing but whitespace
    Blank,
}

impl std::fmt::Display for EntryPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manifest => write!(f, "manifest"),
            Self::Encrypted => write!(f, "encrypted"),
            Self::TooLarge => write!(f, "too large"),
            Self::Unreadable => write!(f, "unreadable"),
            Self::Decoded(format) => write!(f, "{format}"),
            Self::PlainText => write!(f, "text"),
            Self::Blank => write!(f, "blank"),
        }
    }
}

/// Information about one entry of a Databricks archive
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryInfo {
    /// Entry name within the archive
    pub name: String,
    /// Uncompressed size
    pub size: u64,
    /// Compressed size
    pub compressed_size: u64,
    /// Whether the entry is encrypted
    pub is_encrypted: bool,
    /// Detected payload
    pub payload: EntryPayload,
    /// Notebook files the entry would produce
    pub notebooks: usize,
}

/// Convert every notebook in a `.dbc` archive to an `.ipynb` file.
///
/// With no `output_dir`, files go to `<archive stem>_ipynb` next to the
/// archive. Returns the paths written.
///
/// # Errors
///
/// Returns `ConvertError::InvalidArchive` if the input is not a ZIP
/// container, or an I/O error if it cannot be opened or the output
/// directory cannot be created.
///
/// # Examples
///
/// ```no_run
/// use dbc_convert::convert;
/// use std::path::Path;
///
/// let written = convert(Path::new("export.dbc"), None)?;
/// for path in written {
///     println!("Wrote {}", path.display());
/// }
/// # Ok::<(), dbc_convert::ConvertError>(())
/// ```
pub fn convert(archive_path: &Path, output_dir: Option<&Path>) -> Result<Vec<PathBuf>> {
    let options = ConvertOptions {
        output_dir: output_dir.map(Path::to_path_buf),
        ..ConvertOptions::default()
    };
    Ok(convert_with_options(archive_path, &options)?.written)
}

/// Convert an archive with explicit options, returning a full report.
///
/// # Errors
///
/// Same conditions as [`convert`].
pub fn convert_with_options(
    archive_path: &Path,
    options: &ConvertOptions,
) -> Result<ConversionReport> {
    let mut archive = open_archive(archive_path)?;

    let out_dir = options.resolve_output_dir(archive_path);
    fs::create_dir_all(&out_dir)?;

    let mut report = ConversionReport::default();

    for i in 0..archive.len() {
        let (name, contents) = match read_entry(&mut archive, i, options.max_entry_size) {
            EntryRead::Directory => continue,
            EntryRead::Manifest => {
                debug!("Skipping manifest entry #{i}");
                report.entries += 1;
                report.skipped += 1;
                continue;
            }
            EntryRead::Failed => {
                report.entries += 1;
                report.failed += 1;
                continue;
            }
            EntryRead::Contents { name, contents } => (name, contents),
        };

        report.entries += 1;
        convert_entry(&name, &contents, &out_dir, options, &mut report);
    }

    info!(
        "Converted {}: {} notebooks written, {} skipped, {} failed",
        archive_path.display(),
        report.written.len(),
        report.skipped,
        report.failed
    );

    Ok(report)
}

/// List the entries of an archive with their detected payloads.
///
/// # Errors
///
/// Returns `ConvertError::InvalidArchive` if the input is not a ZIP
/// container, or an I/O error if it cannot be opened.
pub fn list_archive(archive_path: &Path, max_entry_size: u64) -> Result<Vec<EntryInfo>> {
    let mut archive = open_archive(archive_path)?;
    let mut entries = Vec::new();

    for i in 0..archive.len() {
        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cannot read archive entry #{i}: {e}");
                continue;
            }
        };

        if entry.is_dir() || entry.name().ends_with('/') {
            continue;
        }

        let name = entry.name().to_string();
        let size = entry.size();
        let compressed_size = entry.compressed_size();
        let is_encrypted = entry.encrypted();

        let (payload, notebooks) = if is_manifest(&name) {
            (EntryPayload::Manifest, 0)
        } else if is_encrypted {
            (EntryPayload::Encrypted, 0)
        } else if size > max_entry_size {
            (EntryPayload::TooLarge, 0)
        } else {
            let mut contents = Vec::new();
            match entry.read_to_end(&mut contents) {
                Ok(_) => classify_entry(&name, &contents, max_entry_size),
                Err(e) => {
                    warn!("Cannot read {name}: {e}");
                    (EntryPayload::Unreadable, 0)
                }
            }
        };

        entries.push(EntryInfo {
            name,
            size,
            compressed_size,
            is_encrypted,
            payload,
            notebooks,
        });
    }

    Ok(entries)
}

fn open_archive(archive_path: &Path) -> Result<ZipArchive<BufReader<File>>> {
    let invalid = |source| ConvertError::InvalidArchive {
        path: archive_path.to_path_buf(),
        source,
    };
    let file = File::open(archive_path).map_err(|e| invalid(ZipError::Io(e)))?;
    ZipArchive::new(BufReader::new(file)).map_err(invalid)
}

enum EntryRead {
    Directory,
    Manifest,
    Failed,
    Contents { name: String, contents: Vec<u8> },
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, index: usize, max: u64) -> EntryRead {
    let mut entry = match archive.by_index(index) {
        Ok(entry) => entry,
        Err(e) => {
            warn!("Skipping archive entry #{index}: {e}");
            return EntryRead::Failed;
        }
    };

    let name = entry.name().to_string();
    if entry.is_dir() || name.ends_with('/') {
        return EntryRead::Directory;
    }
    if is_manifest(&name) {
        return EntryRead::Manifest;
    }
    if entry.encrypted() {
        warn!("Skipping encrypted entry: {name}");
        return EntryRead::Failed;
    }

    let size = entry.size();
    if size > max {
        let err = ConvertError::EntryTooLarge { name, size, max };
        warn!("Skipping entry: {err}");
        return EntryRead::Failed;
    }

    let mut contents = Vec::new();
    if let Err(e) = entry.read_to_end(&mut contents) {
        warn!("Skipping unreadable entry {name}: {e}");
        return EntryRead::Failed;
    }

    EntryRead::Contents { name, contents }
}

/// Decode one entry and write its notebooks, updating `report`.
fn convert_entry(
    name: &str,
    contents: &[u8],
    out_dir: &Path,
    options: &ConvertOptions,
    report: &mut ConversionReport,
) {
    let default_name = entry_stem(name);

    let Some((format, value)) = decode_with_limit(contents, options.max_entry_size) else {
        debug!("{name}: no JSON payload, converting as plain text");
        convert_plain_text(name, contents, &default_name, out_dir, options, report);
        return;
    };

    debug!("{name}: decoded as {format}");

    for record in extract(value) {
        let doc = assemble(&record, &default_name);
        if doc.is_blank() {
            debug!("{name}: notebook '{}' has no source, skipping", doc.name);
            report.skipped += 1;
            continue;
        }

        let path = notebook_path(out_dir, &doc.name, &default_name);
        match write_notebook(&path, &doc.text, &doc.language) {
            Ok(written) => {
                info!("Wrote {} ({})", written.display(), doc.language);
                report.written.push(written);
            }
            Err(e) => {
                warn!("{name}: failed to write notebook '{}': {e}", doc.name);
                report.failed += 1;
            }
        }
    }
}

fn convert_plain_text(
    name: &str,
    contents: &[u8],
    default_name: &str,
    out_dir: &Path,
    options: &ConvertOptions,
    report: &mut ConversionReport,
) {
    let text = String::from_utf8_lossy(contents);
    if text.trim().is_empty() {
        report.skipped += 1;
        return;
    }

    let notebook = if options.split_plain_text {
        notebook_from_text(&text, DEFAULT_LANGUAGE)
    } else {
        single_cell_notebook(&text, DEFAULT_LANGUAGE)
    };

    let path = notebook_path(out_dir, default_name, default_name);
    match notebook.and_then(|notebook| write_document(&path, notebook)) {
        Ok(written) => {
            info!("Wrote {} (plain text)", written.display());
            report.written.push(written);
        }
        Err(e) => {
            warn!("{name}: failed to write plain-text notebook: {e}");
            report.failed += 1;
        }
    }
}

/// Payload classification and would-be notebook count for listings
fn classify_entry(name: &str, contents: &[u8], max: u64) -> (EntryPayload, usize) {
    match decode_with_limit(contents, max) {
        Some((format, value)) => {
            let default_name = entry_stem(name);
            let notebooks = extract(value)
                .filter(|record| !assemble(record, &default_name).is_blank())
                .count();
            (EntryPayload::Decoded(format), notebooks)
        }
        None if String::from_utf8_lossy(contents).trim().is_empty() => (EntryPayload::Blank, 0),
        None => (EntryPayload::PlainText, 1),
    }
}

fn is_manifest(name: &str) -> bool {
    Path::new(name)
        .file_name()
        .is_some_and(|n| n.to_string_lossy().eq_ignore_ascii_case("manifest.mf"))
}

/// Base file name of an entry without its extension
fn entry_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}

/// Sanitize a notebook name to prevent path traversal (e.g., `../../etc/x`)
///
/// Keeps only normal path components, so names with `/` land in
/// subdirectories of the output directory. Returns None if nothing is left.
#[inline]
fn sanitize_name(name: &str) -> Option<PathBuf> {
    let mut sanitized = PathBuf::new();

    for component in Path::new(name).components() {
        if let Component::Normal(part) = component {
            sanitized.push(part);
        }
    }

    if sanitized.as_os_str().is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

/// `<out_dir>/<name>.ipynb`, with `name` confined to `out_dir`
fn notebook_path(out_dir: &Path, name: &str, default_name: &str) -> PathBuf {
    let relative = sanitize_name(name)
        .or_else(|| sanitize_name(default_name))
        .unwrap_or_else(|| PathBuf::from(FALLBACK_NAME));
    let mut file_name = relative.into_os_string();
    file_name.push(".ipynb");
    out_dir.join(file_name)
}
