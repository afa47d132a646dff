use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;

use vorlage_docx::{build_replacement_rules_with_order, extract_paragraph_texts, DocumentKind};
use vorlage_download::{
    atomic_write_bytes, Company, DownloadService, FsStorage, Settings, Template,
};

#[derive(Debug, Parser)]
#[command(
    name = "vorlage",
    version,
    about = "Personalize shared document templates for a company."
)]
struct Args {
    /// Organization settings (JSON). Defaults apply when the file does not exist.
    #[arg(long, global = true, default_value = "vorlage.json")]
    settings: PathBuf,

    /// Override the number of finished downloads kept in memory (0 disables caching).
    #[arg(long, global = true)]
    cache_capacity: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Produce the personalized download of a template for one or more companies.
    Personalize {
        /// Directory the template's storage path is resolved against.
        #[arg(long)]
        root: PathBuf,

        /// Template record (JSON).
        #[arg(long)]
        template: PathBuf,

        /// Company record (JSON). Repeatable.
        #[arg(long = "company", required = true)]
        companies: Vec<PathBuf>,

        /// Output directory; files are named after the template and company.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Print the replacement rules for a company as JSON.
    Rules {
        /// Company record (JSON).
        #[arg(long)]
        company: PathBuf,
    },
    /// Print the logical text of every paragraph of a DOCX file.
    Inspect {
        /// Document to inspect.
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let _ = {
        use log::LevelFilter::*;
        env_logger::builder()
            .filter_module("vorlage", Info)
            .filter_module("vorlage_docx", Warn)
            .filter_module("vorlage_download", Info)
            .parse_default_env()
            .try_init()
    };

    let args = Args::parse();
    let mut settings = Settings::load(&args.settings)?;
    if let Some(capacity) = args.cache_capacity {
        settings.cache_capacity = capacity;
    }

    match args.command {
        Command::Personalize {
            root,
            template,
            companies,
            out_dir,
        } => personalize(settings, &root, &template, &companies, &out_dir),
        Command::Rules { company } => {
            let company: Company = read_json(&company)?;
            let rules = build_replacement_rules_with_order(
                &settings.source,
                &company.details,
                settings.rule_order,
            );
            println!("{}", serde_json::to_string_pretty(&rules)?);
            Ok(())
        }
        Command::Inspect { file } => inspect(&file),
    }
}

fn personalize(
    settings: Settings,
    root: &Path,
    template: &Path,
    companies: &[PathBuf],
    out_dir: &Path,
) -> Result<()> {
    let template: Template = read_json(template)?;
    let service = DownloadService::new(FsStorage::new(root), settings);

    for path in companies {
        let company: Company = read_json(path)?;
        let download = service.download(&template, &company).with_context(|| {
            format!(
                "personalize template {} for company {}",
                template.id, company.id
            )
        })?;
        let dest = out_dir.join(&download.filename);
        atomic_write_bytes(&dest, &download.bytes)
            .with_context(|| format!("write {}", dest.display()))?;
        println!("{} ({})", dest.display(), download.content_type);
    }

    if let Some(cache) = service.cache() {
        let stats = cache.stats();
        log::debug!(
            "download cache: {} hit(s), {} miss(es)",
            stats.hits,
            stats.misses
        );
    }
    Ok(())
}

fn inspect(file: &Path) -> Result<()> {
    let kind = file
        .extension()
        .and_then(|ext| ext.to_str())
        .map(DocumentKind::from_type_tag)
        .unwrap_or(DocumentKind::Other);
    if !kind.is_patchable() {
        anyhow::bail!("{} is not a DOCX file ({kind:?})", file.display());
    }

    let bytes = std::fs::read(file).with_context(|| format!("read {}", file.display()))?;
    let paragraphs = extract_paragraph_texts(&bytes)
        .with_context(|| format!("parse {}", file.display()))?;
    for paragraph in paragraphs {
        println!("{paragraph}");
    }
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
}
