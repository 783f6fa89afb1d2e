//! vcard CLI - character card drafting from the command line
//!
//! Usage:
//!   vcard init                        Write .vcard/config.toml
//!   vcard import <card.json>          Card file to normalized draft
//!   vcard export <draft.json>         Draft to card file
//!   vcard lint <draft.json>           Lint report (exit 1 on errors)
//!   vcard board <draft.json>          Render a board block
//!   vcard parse-board <transcript>    Current draft from a transcript
//!   vcard read <draft.json> <path>... Bounded reads
//!   vcard tree <draft.json>           File tree or summary
//!   vcard diff <before> <after>       Changed artifact paths
//!   vcard plan pick|advance|starter   Plan scheduling

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;
use vcard_board::{
    append_board, build_draft_board_markdown, draft_artifact_diff_with,
    parse_draft_from_board_markdown,
};
use vcard_codec::{card_draft_to_chara_card_v3, import_card_json, ExportMode, ExportOptions};
use vcard_core::{normalize_card_draft, Draft, VcardConfig};
use vcard_fs::{
    build_file_system_summary_with, build_file_tree, build_read_result_text,
    normalize_read_request_with, parse_read_request_text, ReadRequest,
};
use vcard_planning::{advance_vibe_plan, pick_vibe_plan_current, starter_plan, DraftPlanExt};
use vcard_validation::lint_card_draft_with;

#[derive(Parser)]
#[command(name = "vcard")]
#[command(author, version, about = "Character card drafting engine")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to .vcard/config.toml in the current directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Repository path (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Convert a chara_card_v3 (or v1) JSON file into a draft
    Import {
        /// Card JSON file
        card: PathBuf,
    },

    /// Convert a draft into a chara_card_v3 JSON file
    Export {
        /// Draft JSON file
        draft: PathBuf,

        /// Export mode (defaults to the configured mode)
        #[arg(long)]
        mode: Option<CliExportMode>,
    },

    /// Lint a draft
    Lint {
        /// Draft JSON file
        draft: PathBuf,
    },

    /// Render a board for a draft
    Board {
        /// Draft JSON file
        draft: PathBuf,

        /// Append the board to this transcript file instead of printing it
        #[arg(long, value_name = "FILE")]
        append: Option<PathBuf>,
    },

    /// Recover the current draft from a transcript
    ParseBoard {
        /// Transcript Markdown file
        transcript: PathBuf,
    },

    /// Read slices of a draft by path
    Read {
        /// Draft JSON file
        draft: PathBuf,

        /// Slash or dotted paths
        #[arg(required_unless_present = "transcript")]
        paths: Vec<String>,

        /// Take the last read request from a transcript file instead
        #[arg(long, value_name = "FILE", conflicts_with = "paths")]
        transcript: Option<PathBuf>,

        /// Character offset for text leaves
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Maximum characters per item
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show a draft as a file tree
    Tree {
        /// Draft JSON file
        draft: PathBuf,

        /// Print the JSON summary instead of the tree
        #[arg(long)]
        summary: bool,
    },

    /// List artifact paths that changed between two drafts
    Diff {
        before: PathBuf,
        after: PathBuf,
    },

    /// Plan scheduling
    Plan {
        #[command(subcommand)]
        action: PlanCommands,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Show the task the cursor resolves to
    Pick {
        /// Draft JSON file
        draft: PathBuf,
    },

    /// Mark a task done and print the updated draft
    Advance {
        /// Draft JSON file
        draft: PathBuf,

        /// Finished task id
        task: String,
    },

    /// Embed the starter plan and print the updated draft
    Starter {
        /// Draft JSON file
        draft: PathBuf,

        /// Plan goal
        #[arg(long, default_value = "Build a complete character card")]
        goal: String,
    },
}

/// CLI-friendly export mode
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliExportMode {
    Work,
    Publish,
}

impl From<CliExportMode> for ExportMode {
    fn from(m: CliExportMode) -> Self {
        match m {
            CliExportMode::Work => ExportMode::Work,
            CliExportMode::Publish => ExportMode::Publish,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { path } => cmd_init(&path),
        Commands::Import { card } => cmd_import(&card),
        Commands::Export { draft, mode } => cmd_export(&draft, mode, &config),
        Commands::Lint { draft } => cmd_lint(&draft, &config),
        Commands::Board { draft, append } => cmd_board(&draft, append.as_deref()),
        Commands::ParseBoard { transcript } => cmd_parse_board(&transcript),
        Commands::Read {
            draft,
            paths,
            transcript,
            offset,
            limit,
        } => cmd_read(&draft, paths, transcript.as_deref(), offset, limit, &config),
        Commands::Tree { draft, summary } => cmd_tree(&draft, summary, &config),
        Commands::Diff { before, after } => cmd_diff(&before, &after, &config),
        Commands::Plan { action } => cmd_plan(action),
    }
}

fn load_config(path: Option<&Path>) -> Result<VcardConfig> {
    match path {
        Some(path) => VcardConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path)),
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            VcardConfig::load_or_default(&cwd).context("Failed to load .vcard/config.toml")
        }
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON in {:?}", path))
}

/// Load any draft-shaped JSON file and normalize it
fn load_draft(path: &Path) -> Result<Draft> {
    let draft = normalize_card_draft(&read_json(path)?);
    debug!("Loaded draft '{}' from {:?}", draft.card.name, path);
    Ok(draft)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_init(path: &Path) -> Result<()> {
    info!("Initializing vcard in {:?}", path);
    VcardConfig::write_default(path).context("Failed to write config")?;

    println!("Initialized vcard in {:?}", path);
    println!("Created:");
    println!("  .vcard/config.toml");
    Ok(())
}

fn cmd_import(card: &Path) -> Result<()> {
    let content = std::fs::read_to_string(card)
        .with_context(|| format!("Failed to read {:?}", card))?;
    let draft = import_card_json(&content).context("Failed to import card")?;
    info!("Imported '{}'", draft.card.name);
    print_json(&draft)
}

fn cmd_export(draft: &Path, mode: Option<CliExportMode>, config: &VcardConfig) -> Result<()> {
    let draft = load_draft(draft)?;
    let options = match mode {
        Some(mode) => ExportOptions { mode: mode.into() },
        None => ExportOptions::from_config(&config.export)?,
    };
    info!("Exporting '{}' ({})", draft.card.name, options.mode);
    print_json(&card_draft_to_chara_card_v3(&draft, &options))
}

fn cmd_lint(draft: &Path, config: &VcardConfig) -> Result<()> {
    let draft = load_draft(draft)?;
    let report = lint_card_draft_with(&draft, &config.lint);
    print_json(&report)?;

    if !report.is_clean() {
        info!("{} error(s), {} warning(s)", report.errors.len(), report.warnings.len());
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_board(draft: &Path, append: Option<&Path>) -> Result<()> {
    let draft = load_draft(draft)?;

    let Some(transcript_path) = append else {
        print!("{}", build_draft_board_markdown(&draft)?);
        return Ok(());
    };

    let transcript = if transcript_path.exists() {
        std::fs::read_to_string(transcript_path)
            .with_context(|| format!("Failed to read {:?}", transcript_path))?
    } else {
        String::new()
    };
    std::fs::write(transcript_path, append_board(&transcript, &draft)?)
        .with_context(|| format!("Failed to write {:?}", transcript_path))?;
    println!("Appended board to {:?}", transcript_path);
    Ok(())
}

fn cmd_parse_board(transcript: &Path) -> Result<()> {
    let markdown = std::fs::read_to_string(transcript)
        .with_context(|| format!("Failed to read {:?}", transcript))?;
    let snapshot = parse_draft_from_board_markdown(&markdown).context("Failed to parse board")?;
    print_json(&snapshot.draft)
}

fn cmd_read(
    draft: &Path,
    paths: Vec<String>,
    transcript: Option<&Path>,
    offset: usize,
    limit: Option<usize>,
    config: &VcardConfig,
) -> Result<()> {
    let draft = load_draft(draft)?;

    let request: ReadRequest = match transcript {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {:?}", path))?;
            parse_read_request_text(&text).context("Failed to parse read request")?
        }
        None => {
            let limit = limit.unwrap_or(config.read.default_limit);
            let reads: Vec<Value> = paths
                .iter()
                .map(|path| serde_json::json!({"path": path, "offset": offset, "limit": limit}))
                .collect();
            normalize_read_request_with(&Value::from(reads), &config.read)?
        }
    };

    println!("{}", build_read_result_text(&draft, &request)?);
    Ok(())
}

fn cmd_tree(draft: &Path, summary: bool, config: &VcardConfig) -> Result<()> {
    let draft = load_draft(draft)?;
    if summary {
        print_json(&build_file_system_summary_with(&draft, &config.summary))
    } else {
        print!("{}", build_file_tree(&draft));
        Ok(())
    }
}

fn cmd_diff(before: &Path, after: &Path, config: &VcardConfig) -> Result<()> {
    let before = load_draft(before)?;
    let after = load_draft(after)?;
    print_json(&draft_artifact_diff_with(&before, &after, &config.diff))
}

fn cmd_plan(action: PlanCommands) -> Result<()> {
    match action {
        PlanCommands::Pick { draft } => {
            let draft = load_draft(&draft)?;
            let Some(plan) = draft.vibe_plan() else {
                bail!("Draft has no vibePlan; run 'vcard plan starter' first");
            };
            let resolution = pick_vibe_plan_current(&plan);
            info!("{}", resolution);
            print_json(&resolution)
        }
        PlanCommands::Advance { draft, task } => {
            let draft = load_draft(&draft)?;
            let Some(plan) = draft.vibe_plan() else {
                bail!("Draft has no vibePlan; run 'vcard plan starter' first");
            };
            if plan.task(&task).is_none() {
                bail!("No task with id {}", task);
            }
            let next = advance_vibe_plan(&plan, &task).touched(Utc::now());
            print_json(&draft.with_vibe_plan(&next))
        }
        PlanCommands::Starter { draft, goal } => {
            let draft = load_draft(&draft)?;
            if draft.vibe_plan().is_some() {
                info!("Replacing existing vibePlan");
            }
            print_json(&draft.with_vibe_plan(&starter_plan(goal, Utc::now())))
        }
    }
}
