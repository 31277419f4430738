mod ui;

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use arl::{Arl, Content};
use clap::Parser;
use colored::*;
use humansize::{DECIMAL, format_size};
use tracing_subscriber::EnvFilter;

/// Fetch every file an authenticated resource locator points at
#[derive(Debug, Parser)]
#[command(name = "arl", version, about)]
struct Cli {
    /// Locator, e.g. `[github,owner/repo/dir,token,XXXX]` or `https://host/file`
    #[arg(env = "ARL")]
    locator: String,

    /// Per-resource size ceiling in bytes (0 = unlimited)
    #[arg(long, env = "ARL_MAX_SIZE", default_value_t = 0)]
    max_size: u64,

    /// Maximum number of simultaneous downloads
    #[arg(long, short = 'c', env = "ARL_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Save files under this directory instead of only listing them
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Only print failures
    #[arg(long, short = 'q')]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let arl = match Arl::new(&cli.locator, cli.max_size, cli.concurrency) {
        Ok(arl) => arl,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(2);
        }
    };

    let spinner = (!cli.quiet).then(|| ui::create_spinner("Resolving locator..."));
    let fetched = arl.fetch().await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let mut files = match fetched {
        Ok(files) => files,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(3);
        }
    };

    let (mut ok, mut failed, mut bytes) = (0usize, 0usize, 0u64);
    while let Some(content) = files.next().await {
        if let Some(e) = &content.error {
            failed += 1;
            eprintln!("{} {}: {}", "failed".red().bold(), content.path, e);
            continue;
        }

        if let Some(root) = &cli.output {
            let saved = save_content(root, &content)?;
            if !cli.quiet {
                println!(
                    "{:>10}  {}",
                    format_size(content.data.len(), DECIMAL).cyan(),
                    saved.display()
                );
            }
        } else if !cli.quiet {
            println!(
                "{:>10}  {}",
                format_size(content.data.len(), DECIMAL).cyan(),
                content.path
            );
        }
        ok += 1;
        bytes += content.data.len() as u64;
    }

    if !cli.quiet {
        println!(
            "{} {} files, {}",
            "Done:".green().bold(),
            ok,
            format_size(bytes, DECIMAL)
        );
    }
    if failed > 0 {
        eprintln!("{} {} files failed", "Warning:".yellow().bold(), failed);
        std::process::exit(1);
    }
    Ok(())
}

/// Relative on-disk location for a fetched path. Schemes, leading slashes
/// and `..` components are dropped so nothing lands outside the output root.
fn local_path(path: &str) -> PathBuf {
    let without_scheme = path.split_once("://").map_or(path, |(_, rest)| rest);
    Path::new(without_scheme)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}

fn save_content(root: &Path, content: &Content) -> Result<PathBuf> {
    let relative = local_path(&content.path);
    if relative.as_os_str().is_empty() {
        anyhow::bail!("cannot derive a file name from {:?}", content.path);
    }
    let target = root.join(relative);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&target, &content.data)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    Ok(target)
}
