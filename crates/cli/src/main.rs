use anyhow::{Context, Result};
use civic_core::categorize::{KeywordRules, suggest_category};
use civic_core::clock::SystemClock;
use civic_core::config::TriageConfig;
use civic_core::db;
use civic_core::duplicates::{detect_duplicates_with, should_warn_duplicate_with};
use civic_core::schema::{DuplicateMatch, ExistingIssue, IssueDraft};
use civic_core::scoring::sort_by_priority_with;
use clap::{Parser, Subcommand};
use schemars::schema_for;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "civic")]
#[command(about = "Civic issue triage CLI", long_about = None)]
struct Cli {
    /// SQLite snapshot of the issue store
    #[arg(long, global = true, default_value = "issues.db")]
    db: String,

    /// TOML file overriding duplicate and priority thresholds
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export JSON Schemas for the issue records
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
    /// Work with the local issue snapshot
    Issues {
        #[command(subcommand)]
        command: IssueCommands,
    },
    /// Generate an Obsidian vault from the snapshot
    Vault {
        #[command(subcommand)]
        command: VaultCommands,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Export JSON Schema files for canonical types
    Export {
        /// Output directory (default: ./schemas)
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum IssueCommands {
    /// Import a JSON array of issues exported from the backend
    Import { file: PathBuf },
    /// Check a drafted report against open issues
    Duplicates {
        /// JSON file holding the draft report
        #[arg(long)]
        draft: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List issues ordered by priority
    Rank {
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Suggest a category for a description
    Suggest {
        #[arg(long)]
        description: String,
        /// YAML keyword rules replacing the built-in ones
        #[arg(long)]
        rules: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum VaultCommands {
    Build {
        #[arg(long, default_value = "vault")]
        vault: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("civic_core=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = TriageConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Schema { command } => match command {
            SchemaCommands::Export { out_dir } => schema_export(out_dir),
        },
        Commands::Issues { command } => match command {
            IssueCommands::Import { file } => issues_import(&cli.db, &file),
            IssueCommands::Duplicates { draft, json } => {
                issues_duplicates(&cli.db, &draft, json, &config)
            }
            IssueCommands::Rank { limit, json } => issues_rank(&cli.db, limit, json, &config),
            IssueCommands::Suggest { description, rules } => {
                issues_suggest(&description, rules.as_deref())
            }
        },
        Commands::Vault { command } => match command {
            VaultCommands::Build { vault } => vault_build(&cli.db, &vault, &config),
        },
    }
}

fn schema_export(out_dir: PathBuf) -> Result<()> {
    fs::create_dir_all(&out_dir)?;

    write_schema(&out_dir, "IssueDraft", schema_for!(civic_core::schema::IssueDraft))?;
    write_schema(&out_dir, "ExistingIssue", schema_for!(civic_core::schema::ExistingIssue))?;
    write_schema(&out_dir, "DuplicateMatch", schema_for!(civic_core::schema::DuplicateMatch))?;
    write_schema(&out_dir, "PriorityScore", schema_for!(civic_core::schema::PriorityScore))?;
    write_schema(
        &out_dir,
        "CategorySuggestion",
        schema_for!(civic_core::categorize::CategorySuggestion),
    )?;

    println!("Exported schemas to {}", out_dir.display());
    Ok(())
}

fn write_schema(out_dir: &Path, name: &str, schema: schemars::schema::RootSchema) -> Result<()> {
    let json = serde_json::to_string_pretty(&schema)?;
    fs::write(out_dir.join(format!("{name}.schema.json")), json)?;
    Ok(())
}

fn issues_import(db_path: &str, file: &Path) -> Result<()> {
    let raw = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let issues: Vec<ExistingIssue> = serde_json::from_str(&raw)?;

    let conn = db::open(db_path)?;
    for issue in &issues {
        db::upsert_issue(&conn, issue)?;
    }
    info!(count = issues.len(), db = db_path, "issues imported");
    println!("Imported {} issues into {db_path}", issues.len());
    Ok(())
}

#[derive(Serialize)]
struct DuplicateReport {
    warn: bool,
    matches: Vec<DuplicateMatch>,
}

fn issues_duplicates(db_path: &str, draft: &Path, json: bool, config: &TriageConfig) -> Result<()> {
    let raw = fs::read_to_string(draft).with_context(|| format!("reading {}", draft.display()))?;
    let draft: IssueDraft = serde_json::from_str(&raw)?;

    let conn = db::open(db_path)?;
    let open = db::list_open_issues(&conn)?;
    let matches = detect_duplicates_with(&draft, &open, &config.duplicates);
    let report = DuplicateReport {
        warn: should_warn_duplicate_with(&matches, config.duplicates.warn_threshold),
        matches,
    };

    if report.warn {
        warn!(best = %report.matches[0].issue_id, "draft looks like an existing issue");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.matches.is_empty() {
        println!("No likely duplicates among {} open issues.", open.len());
        return Ok(());
    }
    for m in &report.matches {
        println!("{:>5.2}  {}  {}", m.similarity, m.issue_id, m.reason);
    }
    if report.warn {
        println!("Warning: this report may already exist.");
    }
    Ok(())
}

fn issues_rank(db_path: &str, limit: Option<usize>, json: bool, config: &TriageConfig) -> Result<()> {
    let conn = db::open(db_path)?;
    let mut ranked = sort_by_priority_with(db::list_open_issues(&conn)?, &SystemClock, &config.priority);
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
        return Ok(());
    }

    for r in &ranked {
        println!(
            "{:>5.1}  {:<8}  {:<7}  {:<15}  {}",
            r.priority_score.score,
            r.priority_score.rank.to_string(),
            r.priority_score.rank.color(),
            r.issue.category.label(),
            r.issue.title
        );
    }
    Ok(())
}

fn issues_suggest(description: &str, rules: Option<&Path>) -> Result<()> {
    let rules = match rules {
        Some(path) => KeywordRules::load(path)?,
        None => KeywordRules::default(),
    };
    let suggestion = suggest_category(description, &rules);
    println!("{}", serde_json::to_string_pretty(&suggestion)?);
    Ok(())
}

fn vault_build(db_path: &str, vault: &Path, config: &TriageConfig) -> Result<()> {
    let conn = db::open(db_path)?;
    let written = obsidian::vault::build_vault(&conn, vault, &SystemClock, &config.priority)?;
    println!("Wrote {written} issue notes to {}", vault.display());
    Ok(())
}
