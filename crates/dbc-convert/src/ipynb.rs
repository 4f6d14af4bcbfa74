//! Jupyter notebook (ipynb) writing and read-back
//!
//! Notebooks are built as [`nbformat::v4::Notebook`] values and serialized
//! with [`nbformat::serialize_notebook`].

use crate::assemble::COMMAND_SEPARATOR;
use crate::error::{ConvertError, Result};
use nbformat::v4::{Cell, CellId, CellMetadata, KernelSpec, Metadata, Notebook};
use serde_json::json;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// nbformat major version written
pub const NBFORMAT: i32 = 4;
/// nbformat minor version written (cell ids are mandatory from 4.5)
pub const NBFORMAT_MINOR: i32 = 5;

/// Empty notebook with kernel metadata derived from `language`.
///
/// `language_info` holds only the language name and goes through the
/// untyped metadata map; the typed field always writes `version` and
/// `codemirror_mode`, even when unset.
#[must_use]
pub fn new_notebook(language: &str) -> Notebook {
    let (display_name, kernel_name) = if language == "python" {
        ("Python 3".to_string(), "python3".to_string())
    } else {
        (language.to_string(), language.to_string())
    };

    let mut additional = HashMap::new();
    additional.insert("language_info".to_string(), json!({ "name": language }));

    Notebook {
        metadata: Metadata {
            kernelspec: Some(KernelSpec {
                display_name,
                name: kernel_name,
                language: Some(language.to_string()),
                additional: HashMap::new(),
            }),
            language_info: None,
            authors: None,
            additional,
        },
        nbformat: NBFORMAT,
        nbformat_minor: NBFORMAT_MINOR,
        cells: Vec::new(),
    }
}

/// Notebook with one code cell per separator-delimited chunk of `text`.
///
/// Chunks are kept verbatim.
///
/// # Errors
///
/// Returns an error if a cell id cannot be built.
pub fn notebook_from_text(text: &str, language: &str) -> Result<Notebook> {
    let mut notebook = new_notebook(language);
    for chunk in text.split(COMMAND_SEPARATOR) {
        push_code_cell(&mut notebook, chunk)?;
    }
    Ok(notebook)
}

/// Notebook holding `text` as a single code cell.
///
/// # Errors
///
/// Returns an error if the cell id cannot be built.
pub fn single_cell_notebook(text: &str, language: &str) -> Result<Notebook> {
    let mut notebook = new_notebook(language);
    push_code_cell(&mut notebook, text)?;
    Ok(notebook)
}

/// Append an unexecuted code cell with id `cell-<index>`.
///
/// # Errors
///
/// Returns an error if the cell id is rejected by nbformat.
pub fn push_code_cell(notebook: &mut Notebook, source: &str) -> Result<()> {
    let id = CellId::try_from(format!("cell-{:04}", notebook.cells.len()))
        .map_err(|e| ConvertError::InvalidNotebook(e.to_string()))?;

    notebook.cells.push(Cell::Code {
        id,
        metadata: empty_cell_metadata(),
        execution_count: None,
        source: source.split_inclusive('\n').map(String::from).collect(),
        outputs: Vec::new(),
    });
    Ok(())
}

fn empty_cell_metadata() -> CellMetadata {
    CellMetadata {
        id: None,
        collapsed: None,
        scrolled: None,
        deletable: None,
        editable: None,
        format: None,
        name: None,
        tags: None,
        jupyter: None,
        execution: None,
        additional: HashMap::new(),
    }
}

/// Serialize with sorted keys, one-space indentation and a trailing newline.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_string(notebook: Notebook) -> Result<String> {
    Ok(nbformat::serialize_notebook(&nbformat::Notebook::V4(notebook))?)
}

/// Write `text` as a notebook, one cell per command chunk.
///
/// Never overwrites: when `path` exists the first free `<stem>_<n>` variant
/// is used. Returns the path actually written.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the file
/// cannot be written.
pub fn write_notebook(path: &Path, text: &str, language: &str) -> Result<PathBuf> {
    write_document(path, notebook_from_text(text, language)?)
}

/// Write a prepared notebook under a collision-free name.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the file
/// cannot be written. A partially written file is removed.
pub fn write_document(path: &Path, notebook: Notebook) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = to_json_string(notebook)?;
    let (final_path, mut file) = create_unique(path)?;

    let outcome = file.write_all(json.as_bytes()).and_then(|()| file.flush());
    drop(file);
    if let Err(e) = outcome {
        let _ = fs::remove_file(&final_path);
        return Err(e.into());
    }

    Ok(final_path)
}

/// Create `path`, or `<stem>_<n><ext>` for the first free `n`.
///
/// `create_new` makes each existence check and creation a single atomic step.
fn create_unique(path: &Path) -> std::io::Result<(PathBuf, File)> {
    let mut candidate = path.to_path_buf();
    let mut n: u32 = 0;
    loop {
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                n += 1;
                candidate = numbered_path(path, n);
            }
            Err(e) => return Err(e),
        }
    }
}

fn numbered_path(path: &Path, n: u32) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_{n}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{n}"),
    };
    path.with_file_name(name)
}

/// Notebook read back from disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ParsedNotebook {
    /// Kernel name (e.g., "python3", "sql")
    pub kernel_name: Option<String>,
    /// Programming language name
    pub language_name: Option<String>,
    /// Cells in order
    pub cells: Vec<ParsedCell>,
}

/// A cell read back from a notebook
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ParsedCell {
    /// Type of cell
    pub cell_type: CellType,
    /// Cell source content
    pub source: String,
}

/// Type of notebook cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CellType {
    /// Executable code cell
    #[default]
    Code,
    /// Markdown documentation cell
    Markdown,
    /// Raw text cell (no formatting)
    Raw,
}

impl std::fmt::Display for CellType {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Code => "code",
            Self::Markdown => "markdown",
            Self::Raw => "raw",
        };
        write!(f, "{s}")
    }
}

/// Read a Jupyter notebook from a file path
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read (I/O error)
/// - The notebook JSON is malformed or not nbformat 4
pub fn read_notebook<P: AsRef<Path>>(path: P) -> Result<ParsedNotebook> {
    let content = fs::read_to_string(path)?;
    parse_notebook_from_str(&content)
}

/// Parse a Jupyter notebook from a string
///
/// nbformat 4.0-4.4 notebooks are upgraded to 4.5 before reading.
///
/// # Errors
///
/// Returns an error if the notebook JSON is malformed or is not nbformat 4.
pub fn parse_notebook_from_str(content: &str) -> Result<ParsedNotebook> {
    let notebook = match nbformat::parse_notebook(content)? {
        nbformat::Notebook::V4(notebook) => notebook,
        nbformat::Notebook::Legacy(legacy) => nbformat::upgrade_legacy_notebook(legacy)
            .map_err(|e| ConvertError::InvalidNotebook(e.to_string()))?,
    };

    let kernel_name = notebook
        .metadata
        .kernelspec
        .as_ref()
        .map(|ks| ks.name.clone());

    let language_name = notebook
        .metadata
        .language_info
        .as_ref()
        .map(|li| li.name.clone());

    let cells = notebook
        .cells
        .iter()
        .map(|cell| match cell {
            Cell::Code { source, .. } => ParsedCell {
                cell_type: CellType::Code,
                source: source.join(""),
            },
            Cell::Markdown { source, .. } => ParsedCell {
                cell_type: CellType::Markdown,
                source: source.join(""),
            },
            Cell::Raw { source, .. } => ParsedCell {
                cell_type: CellType::Raw,
                source: source.join(""),
            },
        })
        .collect();

    Ok(ParsedNotebook {
        kernel_name,
        language_name,
        cells,
    })
}
