// Sizes are parsed from human input and printed for display only.
#![allow(
    clippy::cast_possible_truncation,  // file sizes - safe ranges
    clippy::cast_sign_loss,            // sizes are always non-negative
    clippy::cast_precision_loss,       // f64 sufficient for display purposes
    clippy::needless_pass_by_value,    // clap requires owned values
)]

//! dbc2ipynb - Databricks archive to Jupyter notebook converter
//!
//! A command-line interface around `dbc_convert`.

mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use config::{project_config_path, user_config_path, Config};
use dbc_convert::{convert_with_options, list_archive, read_notebook, ConvertOptions};
use std::fs;
use std::path::PathBuf;

/// Format bytes as human-readable size (e.g., "1.5 MB")
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} bytes")
    }
}

/// Parse a human-readable file size string into bytes.
///
/// Supports formats:
/// - Plain numbers: "1048576" -> 1048576 bytes
/// - KB suffix: "100K", "100KB", "100k" -> 102400 bytes
/// - MB suffix: "10M", "10MB", "10m" -> 10485760 bytes
/// - GB suffix: "1G", "1GB", "1g" -> 1073741824 bytes
///
/// Decimal values are supported: "1.5M" -> 1572864 bytes
fn parse_file_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty file size".to_string());
    }

    let s_upper = s.to_uppercase();
    let (num_str, multiplier) = if s_upper.ends_with("GB") {
        (&s[..s.len() - 2], 1024 * 1024 * 1024)
    } else if s_upper.ends_with("MB") {
        (&s[..s.len() - 2], 1024 * 1024)
    } else if s_upper.ends_with("KB") {
        (&s[..s.len() - 2], 1024)
    } else if s_upper.ends_with('G') {
        (&s[..s.len() - 1], 1024 * 1024 * 1024)
    } else if s_upper.ends_with('M') {
        (&s[..s.len() - 1], 1024 * 1024)
    } else if s_upper.ends_with('K') {
        (&s[..s.len() - 1], 1024)
    } else if s_upper.ends_with('B') {
        (&s[..s.len() - 1], 1)
    } else {
        (s, 1)
    };

    let num_str = num_str.trim();
    if num_str.is_empty() {
        return Err("missing numeric value".to_string());
    }

    let value: f64 = num_str
        .parse()
        .map_err(|_| format!("invalid number: '{num_str}'"))?;

    if value < 0.0 {
        return Err("file size cannot be negative".to_string());
    }

    Ok((value * f64::from(multiplier)).round() as u64)
}

#[derive(Parser)]
#[command(name = "dbc2ipynb")]
#[command(about = "Convert Databricks archives (.dbc) to Jupyter notebooks (.ipynb)", long_about = None)]
#[command(version)]
struct Cli {
    /// Show per-notebook progress
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress everything except errors and written paths
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every notebook in a .dbc archive to .ipynb files
    #[command(after_help = "Written notebook paths are printed to stdout, one per line.\n\
                      Defaults can be set via .dbc2ipynb.toml configuration file.")]
    Convert {
        /// Input .dbc archive
        archive: PathBuf,

        /// Output directory (default: <archive stem>_ipynb next to the archive)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Skip entries larger than this (e.g. 50M, 1G)
        #[arg(long, value_parser = parse_file_size)]
        max_entry_size: Option<u64>,

        /// Split plain-text entries into cells at "# COMMAND ----------" markers
        #[arg(long)]
        split_plain_text: bool,

        /// Print the conversion report as JSON instead of paths
        #[arg(long)]
        json: bool,
    },

    /// List archive entries and what each would convert to
    List {
        /// Input .dbc archive
        archive: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the cells of a written .ipynb notebook
    Inspect {
        /// Notebook file
        notebook: PathBuf,
    },

    /// Manage configuration files
    #[command(after_help = "Configuration files:\n\
                        1. User config: ~/.dbc2ipynb.toml\n\
                        2. Project config: ./.dbc2ipynb.toml")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand)]
enum ConfigAction {
    /// Create a new .dbc2ipynb.toml configuration file with defaults
    Init {
        /// Create in user home directory (~/.dbc2ipynb.toml) instead of current directory
        #[arg(long)]
        user: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration after merging all files
    Show,
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let (user_config, project_config) = Config::discover_configs();
    let config = Config::merge(user_config, project_config);

    match cli.command {
        Commands::Convert {
            archive,
            output_dir,
            max_entry_size,
            split_plain_text,
            json,
        } => {
            let mut options = config.convert_options();
            if let Some(dir) = output_dir {
                options.output_dir = Some(dir);
            }
            if let Some(max) = max_entry_size {
                options.max_entry_size = max;
            }
            if split_plain_text {
                options.split_plain_text = true;
            }
            convert_command(&archive, &options, json, cli.quiet)
        }
        Commands::List { archive, json } => {
            list_command(&archive, config.convert_options().max_entry_size, json)
        }
        Commands::Inspect { notebook } => inspect_command(&notebook),
        Commands::Config { action } => config_command(action, &config),
    }
}

fn convert_command(
    archive: &std::path::Path,
    options: &ConvertOptions,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let report = convert_with_options(archive, options)
        .with_context(|| format!("Failed to convert {}", archive.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for path in &report.written {
            println!("{}", path.display());
        }
    }

    if !quiet {
        eprintln!(
            "{} {} notebook(s) from {} entries ({} skipped, {} failed)",
            "Converted".green().bold(),
            report.written.len(),
            report.entries,
            report.skipped,
            report.failed
        );
    }

    Ok(())
}

fn list_command(archive: &std::path::Path, max_entry_size: u64, json: bool) -> Result<()> {
    let entries = list_archive(archive, max_entry_size)
        .with_context(|| format!("Failed to read {}", archive.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{:<48} {:>10} {:>12} {:>3}",
            entry.name,
            format_bytes(entry.size),
            entry.payload.to_string(),
            entry.notebooks
        );
    }
    let total: usize = entries.iter().map(|e| e.notebooks).sum();
    println!(
        "{} entries, {} notebook(s)",
        entries.len(),
        total.to_string().bold()
    );

    Ok(())
}

fn inspect_command(path: &std::path::Path) -> Result<()> {
    let notebook = read_notebook(path)
        .with_context(|| format!("Failed to read notebook {}", path.display()))?;

    println!(
        "{} {}",
        "Kernel:".bold(),
        notebook.kernel_name.as_deref().unwrap_or("-")
    );
    println!(
        "{} {}",
        "Language:".bold(),
        notebook.language_name.as_deref().unwrap_or("-")
    );
    println!("{} {}", "Cells:".bold(), notebook.cells.len());

    for (i, cell) in notebook.cells.iter().enumerate() {
        println!();
        println!("{}", format!("[{i}] {}", cell.cell_type).cyan());
        println!("{}", cell.source);
    }

    Ok(())
}

fn config_command(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Init { user, force } => {
            let path = if user {
                user_config_path().context("Cannot determine home directory")?
            } else {
                project_config_path()
            };

            if path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }

            fs::write(&path, Config::starter().to_toml()?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} {}", "Created".green().bold(), path.display());
        }
        ConfigAction::Show => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_size() {
        assert_eq!(parse_file_size("1048576"), Ok(1_048_576));
        assert_eq!(parse_file_size("100K"), Ok(102_400));
        assert_eq!(parse_file_size("10mb"), Ok(10_485_760));
        assert_eq!(parse_file_size("1.5M"), Ok(1_572_864));
        assert_eq!(parse_file_size("1G"), Ok(1_073_741_824));
        assert_eq!(parse_file_size("12B"), Ok(12));
        assert!(parse_file_size("").is_err());
        assert!(parse_file_size("M").is_err());
        assert!(parse_file_size("-5").is_err());
        assert!(parse_file_size("abc").is_err());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
