// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio: document browser and signature appearance tool
//
// Entry point. Initialises logging and backend services, then dispatches one
// command.

mod services;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use folio_core::error::{FolioError, Result};
use folio_core::types::FileNode;
use folio_core::SortOrder;
use folio_document::{apply_image_signature, compute_fit, find_signature_widgets};
use lopdf::Document;

use services::app_services::{AppServices, Listing};

#[derive(Parser, Debug)]
#[command(
    name = "folio",
    version,
    about = "Browse local folders and granted document trees, place signature images in PDFs"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List one local directory
    Browse {
        dir: PathBuf,
        /// Append every descendant as a hidden search row
        #[arg(long)]
        recursive: bool,
        /// name, path, date, date-only, folder-path, folder-date, external-path, external-date
        #[arg(long, value_parser = parse_sort)]
        sort: Option<SortOrder>,
        /// Leave folder rows out of the listing
        #[arg(long)]
        no_folders: bool,
    },
    /// Flat list of every document below a root, or below all storage
    All {
        root: Option<PathBuf>,
        #[arg(long, value_parser = parse_sort)]
        sort: Option<SortOrder>,
    },
    /// List granted document trees, or a folder inside one
    Trees {
        #[arg(long)]
        recursive: bool,
        /// Folder URI to reopen
        #[arg(long)]
        folder: Option<String>,
        /// Document URI to reselect inside the folder
        #[arg(long)]
        leaf: Option<String>,
    },
    /// Grant access to a directory as a document tree
    Grant { dir: PathBuf },
    /// Release a granted tree
    Revoke { tree_id: String },
    /// Fit a source box into a target box and print the placement
    #[command(allow_negative_numbers = true)]
    Fit {
        target_width: f64,
        target_height: f64,
        source_width: f64,
        source_height: f64,
    },
    /// Put an image into the first signature field of a PDF
    #[command(name = "sign-appearance")]
    SignAppearance {
        input: PathBuf,
        image: PathBuf,
        output: PathBuf,
    },
    /// Show recently recorded entry access failures
    Reports {
        #[arg(default_value_t = 20)]
        limit: u32,
    },
}

fn parse_sort(name: &str) -> std::result::Result<SortOrder, String> {
    SortOrder::from_name(name).ok_or_else(|| format!("unknown sort order {name:?}"))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Browse {
            dir,
            recursive,
            sort,
            no_folders,
        } => {
            let services = AppServices::init()?;
            let listing = services.browse(dir, recursive, sort, !no_folders).await;
            print_listing(&listing);
        }
        Command::All { root, sort } => {
            let services = AppServices::init()?;
            let listing = services.all_files(root, sort).await;
            print_listing(&listing);
        }
        Command::Trees {
            recursive,
            folder,
            leaf,
        } => {
            let services = AppServices::init()?;
            let result = services.trees(recursive, folder, leaf).await;
            for root in &result.roots {
                println!("root  {}  {}", root.name, uri_of(root));
            }
            if let Some(folder) = &result.saved.folder {
                println!("saved folder  {}", uri_of(folder));
            }
            if let Some(leaf) = &result.saved.leaf {
                println!("saved leaf    {}", uri_of(leaf));
            }
            print_listing(&result.listing);
        }
        Command::Grant { dir } => {
            let tree = AppServices::init()?.grant(&dir)?;
            println!("{}  {tree}", tree.tree_id());
        }
        Command::Revoke { tree_id } => {
            AppServices::init()?.revoke(&tree_id)?;
            println!("released {tree_id}");
        }
        Command::Fit {
            target_width,
            target_height,
            source_width,
            source_height,
        } => {
            let fit = compute_fit(target_width, target_height, source_width, source_height)?;
            let [a, b, c, d, e, f] = fit.matrix().to_array();
            let placed = fit.placement();
            println!("cm         {a} {b} {c} {d} {e} {f}");
            println!(
                "placement  [{} {} {} {}]",
                placed.llx, placed.lly, placed.urx, placed.ury
            );
            println!("{}", serde_json::to_string_pretty(&fit)?);
        }
        Command::SignAppearance {
            input,
            image,
            output,
        } => sign_appearance(&input, &image, &output)?,
        Command::Reports { limit } => {
            let services = AppServices::init()?;
            for entry in services.recent_reports(limit)? {
                println!(
                    "{}  {:<9}  {}  {}",
                    entry.timestamp,
                    entry.context,
                    entry.path.as_deref().unwrap_or("-"),
                    entry.message
                );
            }
        }
    }
    Ok(())
}

/// Put `image` into the first signature field of `input` and save as `output`.
fn sign_appearance(input: &Path, image: &Path, output: &Path) -> Result<()> {
    let mut doc = Document::load(input).map_err(|e| FolioError::PdfError(e.to_string()))?;
    let widget = find_signature_widgets(&doc)
        .into_iter()
        .next()
        .ok_or_else(|| {
            FolioError::PdfError(format!("{} has no signature field", input.display()))
        })?;
    let bytes = std::fs::read(image)?;

    let appearance = apply_image_signature(&mut doc, widget.id, &bytes)?;
    doc.save(output)
        .map_err(|e| FolioError::PdfError(e.to_string()))?;

    tracing::info!(
        field = widget.field_name.as_deref().unwrap_or("?"),
        output = %output.display(),
        "signature appearance written"
    );
    if let Some(placed) = appearance.fit.map(|fit| fit.placement()) {
        println!(
            "placed in [{} {} {} {}]",
            placed.llx, placed.lly, placed.urx, placed.ury
        );
    }
    Ok(())
}

fn uri_of(node: &FileNode) -> String {
    node.uri().map(ToString::to_string).unwrap_or_default()
}

fn print_listing(listing: &Listing) {
    for node in &listing.nodes {
        let marker = match (node.hidden, node.is_directory()) {
            (true, _) => "  ",
            (false, true) => "d ",
            (false, false) => "- ",
        };
        let shown = node
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| node.name.clone());
        if node.hidden {
            println!("{marker}[search] {shown}");
        } else {
            println!("{marker}{shown}");
        }
    }
    tracing::info!(outcome = ?listing.outcome, rows = listing.nodes.len(), "listing done");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Command, clap::Error> {
        Cli::try_parse_from(std::iter::once("folio").chain(args.iter().copied()))
            .map(|cli| cli.command)
    }

    #[test]
    fn browse_flags_and_sort_names() {
        match parse(&["browse", "/tmp/docs", "--recursive", "--sort", "folder-date"]).unwrap() {
            Command::Browse {
                dir,
                recursive,
                sort,
                no_folders,
            } => {
                assert_eq!(dir, PathBuf::from("/tmp/docs"));
                assert!(recursive);
                assert_eq!(sort, Some(SortOrder::FolderDate));
                assert!(!no_folders);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse(&["browse", "/tmp", "--sort", "size"]).is_err());
        assert!(parse(&["browse"]).is_err());
    }

    #[test]
    fn optional_and_defaulted_positionals() {
        assert!(matches!(
            parse(&["all"]).unwrap(),
            Command::All { root: None, sort: None }
        ));
        assert!(matches!(
            parse(&["reports"]).unwrap(),
            Command::Reports { limit: 20 }
        ));
        assert!(matches!(
            parse(&["reports", "5"]).unwrap(),
            Command::Reports { limit: 5 }
        ));
        assert!(parse(&["reports", "many"]).is_err());
    }

    #[test]
    fn fit_takes_four_numbers() {
        match parse(&["fit", "200", "50", "-400", "100"]).unwrap() {
            Command::Fit {
                target_width,
                source_width,
                ..
            } => {
                assert_eq!(target_width, 200.0);
                assert_eq!(source_width, -400.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse(&["fit", "200", "50", "400"]).is_err());
        assert!(parse(&["sign-appearance", "in.pdf", "sig.png", "out.pdf"]).is_ok());
    }

    #[test]
    fn command_line_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
