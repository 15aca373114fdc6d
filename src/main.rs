//! Main entry point for the tarlens CLI application.
//!
//! Lists or prints entries of `.tgz` and `.zip` archives from the local
//! filesystem or a remote HTTP URL.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use std::path::PathBuf;

use tarlens::cli::Output;
use tarlens::logging::{LogConfig, init_logging};
use tarlens::{Cli, Engine, EngineConfig, EntryContentResolver, IndexResult, ParseResult};

/// One listing row, shared by eager results and lazy indexes
struct Row<'a> {
    path: &'a str,
    size: u64,
    is_directory: bool,
    is_binary: bool,
    offset: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&LogConfig {
        level: cli.log_level.clone(),
    });

    let engine = Engine::init(EngineConfig {
        limits: cli.limits(),
        ..EngineConfig::default()
    })?;

    if cli.is_http_url() {
        let options = cli.fetch_options().map_err(|e| anyhow!(e))?;
        if cli.lazy {
            let (store, index) = engine.index_into_store(&cli.file, &options).await?;
            let resolver = EntryContentResolver::new(store);
            let outcome = show_index(&index, &resolver, &cli);
            resolver.store().dispose();
            outcome
        } else {
            let result = engine.fetch_and_parse(&cli.file, &options).await?;
            show_parsed(&result, &cli)
        }
    } else {
        if cli.lazy {
            bail!("--lazy requires an http(s) URL");
        }
        let path = PathBuf::from(&cli.file);
        let result = tokio::task::spawn_blocking(move || engine.parse_file(&path))
            .await?
            .with_context(|| format!("cannot parse {}", cli.file))?;
        show_parsed(&result, &cli)
    }
}

fn show_parsed(result: &ParseResult, cli: &Cli) -> Result<()> {
    let verbose = match cli.output() {
        Output::Json => {
            println!("{}", serde_json::to_string_pretty(result)?);
            return Ok(());
        }
        Output::Print => {
            let selected: Vec<_> = result
                .files
                .iter()
                .filter(|f| !f.is_directory && cli.selects(&f.path))
                .collect();
            if selected.is_empty() && !cli.paths.is_empty() {
                bail!("no matching entries in {}", cli.file);
            }
            let show_name = selected.len() > 1;
            for file in selected {
                print_content(&file.path, &file.content, file.is_binary, show_name);
            }
            return Ok(());
        }
        Output::List { verbose } => verbose,
    };

    let rows = result.files.iter().map(|f| Row {
        path: &f.path,
        size: f.size,
        is_directory: f.is_directory,
        is_binary: f.is_binary,
        offset: None,
    });
    list_rows(rows, cli, verbose);
    Ok(())
}

fn show_index(index: &IndexResult, resolver: &EntryContentResolver, cli: &Cli) -> Result<()> {
    let verbose = match cli.output() {
        Output::Json => {
            println!("{}", serde_json::to_string_pretty(index)?);
            return Ok(());
        }
        Output::Print => {
            let selected: Vec<_> = index
                .files
                .iter()
                .filter(|e| !e.is_directory && cli.selects(&e.path))
                .collect();
            if selected.is_empty() && !cli.paths.is_empty() {
                bail!("no matching entries in {}", cli.file);
            }
            let show_name = selected.len() > 1;
            for entry in selected {
                let file = resolver.read_file(&entry.path)?;
                print_content(&entry.path, &file.content, file.is_binary, show_name);
            }
            return Ok(());
        }
        Output::List { verbose } => verbose,
    };

    let rows = index.files.iter().map(|e| Row {
        path: &e.path,
        size: e.size,
        is_directory: e.is_directory,
        is_binary: e.is_binary,
        offset: Some(e.raw_offset),
    });
    list_rows(rows, cli, verbose);
    Ok(())
}

fn print_content(path: &str, content: &str, is_binary: bool, show_name: bool) {
    if show_name {
        println!("--- {} ---", path);
    }
    if is_binary {
        eprintln!("{}: binary content not shown", path);
    } else {
        print!("{}", content);
    }
}

/// List entries in either the short (`-l`, default) or verbose (`-v`) form.
fn list_rows<'a>(rows: impl Iterator<Item = Row<'a>>, cli: &Cli, verbose: bool) {
    let rows = rows.filter(|r| cli.selects(r.path));

    if !verbose {
        for row in rows {
            println!("{}", row.path);
        }
        return;
    }

    println!("{:>12}  {:<6}  {:>12}  Name", "Length", "Kind", "Offset");
    println!("{}", "-".repeat(60));

    let mut total = 0u64;
    let mut file_count = 0usize;
    for row in rows {
        let kind = if row.is_directory {
            "dir"
        } else if row.is_binary {
            "binary"
        } else {
            "text"
        };
        let offset = row
            .offset
            .map(|o| o.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:>12}  {:<6}  {:>12}  {}", row.size, kind, offset, row.path);

        if !row.is_directory {
            total += row.size;
            file_count += 1;
        }
    }

    println!("{}", "-".repeat(60));
    println!("{:>12}  {} files", format_size(total), file_count);
}

/// Format a byte size into a human-readable string.
///
/// ```ignore
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
