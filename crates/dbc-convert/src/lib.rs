//! # dbc-convert
//!
//! Conversion of Databricks archives (`.dbc`) into Jupyter notebooks
//! (`.ipynb`), one file per embedded notebook.
//!
//! A `.dbc` file is a ZIP container whose entries hold serialized notebooks.
//! Each entry goes through a small pipeline:
//! - [`decode`]: recover JSON from plain, base64, gzip or zlib payloads
//! - [`extract`]: find notebook records (single, wrapped list, bare list)
//! - [`assemble`]: join command sources and normalize the language tag
//! - [`ipynb`]: write one code cell per command under a collision-free name
//!
//! Entries that hold no JSON are converted as plain text.
//!
//! ## Example
//!
//! ```no_run
//! use dbc_convert::{convert_with_options, ConvertOptions};
//! use std::path::Path;
//!
//! let options = ConvertOptions::default().with_output_dir("notebooks");
//! let report = convert_with_options(Path::new("export.dbc"), &options)?;
//! println!("{} notebooks written", report.written.len());
//! # Ok::<(), dbc_convert::ConvertError>(())
//! ```

/// Archive traversal and listing
pub mod archive;
/// Command joining and language normalization
pub mod assemble;
/// Entry payload decoding
pub mod decode;
/// Error types for conversion
pub mod error;
/// Notebook record extraction
pub mod extract;
/// Jupyter notebook writer and reader
pub mod ipynb;
/// Conversion options
pub mod options;

/// Maximum size for a single archive entry or decompressed payload (100 MB).
///
/// Larger entries are skipped to keep memory bounded on hostile archives.
pub const MAX_ENTRY_SIZE: u64 = 100_000_000;

pub use archive::{
    convert, convert_with_options, list_archive, ConversionReport, EntryInfo, EntryPayload,
};
pub use assemble::{
    assemble, normalize_language, AssembledDocument, COMMAND_SEPARATOR, DEFAULT_LANGUAGE,
};
pub use decode::{decode, decode_with_format, decode_with_limit, PayloadFormat};
pub use error::{ConvertError, Result};
pub use extract::{extract, NotebookRecord, NotebookRecords, PayloadShape};
pub use ipynb::{
    new_notebook, notebook_from_text, parse_notebook_from_str, read_notebook,
    single_cell_notebook, write_document, write_notebook, CellType, ParsedCell, ParsedNotebook,
};
pub use options::{default_output_dir, ConvertOptions};
