//! Assembly of notebook records into separator-joined source text

use crate::extract::NotebookRecord;
use serde_json::Value;
use std::cmp::Ordering;

/// Separator placed between commands in assembled text.
///
/// Matches the marker Databricks writes into source exports.
pub const COMMAND_SEPARATOR: &str = "\n\n# COMMAND ----------\n\n";

/// Language assumed when a record does not name one
pub const DEFAULT_LANGUAGE: &str = "python";

/// A notebook reduced to its name, source text and language
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AssembledDocument {
    /// Display name, used as the output file stem
    pub name: String,
    /// Command sources joined by [`COMMAND_SEPARATOR`]
    pub text: String,
    /// Normalized language tag
    pub language: String,
}

impl AssembledDocument {
    /// True when the text holds nothing but whitespace
    #[inline]
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Normalize a Databricks language tag.
///
/// `pyspark`, `python3` and friends become `python`; anything mentioning
/// `sql` becomes `sql`; unknown languages pass through lowercased.
#[must_use]
pub fn normalize_language(language: Option<&str>) -> String {
    let lang = match language {
        Some(l) if !l.is_empty() => l.to_lowercase(),
        _ => DEFAULT_LANGUAGE.to_string(),
    };

    if lang.contains("py") {
        "python".to_string()
    } else if lang.contains("sql") {
        "sql".to_string()
    } else if lang.contains("scala") {
        "scala".to_string()
    } else if lang == "r" || lang == "rscript" {
        "r".to_string()
    } else {
        lang
    }
}

/// Assemble one notebook record.
///
/// `default_name` is used when the record carries no usable `name`. The
/// returned text may be blank; callers skip such documents.
#[must_use]
pub fn assemble(record: &NotebookRecord, default_name: &str) -> AssembledDocument {
    let name = record_name(record).unwrap_or_else(|| default_name.to_string());
    let language = normalize_language(record.get("language").and_then(Value::as_str));

    let text = if let Some(commands) = record.get("commands") {
        join_commands(commands)
    } else if let Some(cells) = record.get("cells") {
        join_cells(cells)
    } else {
        serde_json::to_string_pretty(record).unwrap_or_default()
    };

    AssembledDocument {
        name,
        text,
        language,
    }
}

fn record_name(record: &NotebookRecord) -> Option<String> {
    match record.get("name")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

/// Join `commands` entries in `position` order.
fn join_commands(commands: &Value) -> String {
    let mut entries: Vec<(f64, &Value)> = commands
        .as_array()
        .map(|list| {
            list.iter()
                .filter(|c| c.is_object())
                .map(|c| (c.get("position").and_then(Value::as_f64).unwrap_or(0.0), c))
                .collect()
        })
        .unwrap_or_default();

    // sort_by is stable, ties (-0.0 == 0.0 included) keep list order
    entries.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    join_parts(entries.into_iter().map(|(_, c)| c.get("command")))
}

/// Join `cells` entries in list order, preferring `command` over `source`.
fn join_cells(cells: &Value) -> String {
    let Some(list) = cells.as_array() else {
        return String::new();
    };

    join_parts(list.iter().filter_map(Value::as_object).map(|cell| {
        if cell.contains_key("command") {
            cell.get("command")
        } else {
            cell.get("source")
        }
    }))
}

fn join_parts<'a>(sources: impl Iterator<Item = Option<&'a Value>>) -> String {
    sources
        .filter_map(|src| source_text(src?))
        .map(|code| code.trim().to_string())
        .filter(|code| !code.is_empty())
        .collect::<Vec<_>>()
        .join(COMMAND_SEPARATOR)
}

/// Source as text: a string, or a list of strings concatenated.
fn source_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(lines) => Some(lines.iter().filter_map(Value::as_str).collect()),
        _ => None,
    }
}
