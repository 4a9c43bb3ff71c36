use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::config::AppConfig;
use crate::importer::{ImportSettings, Importer};
use crate::model::board::NamedEntry;
use crate::providers::trello::TrelloClient;
use crate::providers::BoardApi;
use crate::resolver::{ResolvePolicy, Strictness};
use crate::schema::SchemaVariant;

/// Import spreadsheet rows as cards on a Trello board.
#[derive(Debug, Parser)]
#[command(name = "cartollero", version)]
pub struct Cli {
    /// Config file to use instead of ~/.cartollero/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create one card per spreadsheet row
    Import(ImportArgs),
    /// List the boards visible to the configured credentials
    Boards,
    /// List the lists of a board
    Lists {
        /// Board id, as printed by `boards`
        board_id: String,
    },
    /// List boards, then prompt for a board and list its lists
    Discover,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Spreadsheet to import (.xlsx, .xls, .ods or .csv)
    pub file: String,

    /// Column layout of the spreadsheet
    #[arg(long, value_enum)]
    pub schema: Option<SchemaVariant>,

    /// Halt the whole run on the first bad row
    #[arg(long, conflicts_with = "lenient")]
    pub strict: bool,

    /// Skip bad rows and drop unknown labels/members with a warning
    #[arg(long)]
    pub lenient: bool,

    /// Resolve every row without creating anything
    #[arg(long)]
    pub dry_run: bool,

    /// Board id (overrides config and TRELLO_BOARD_ID)
    #[arg(long)]
    pub board: Option<String>,

    /// Target list id (overrides config and TRELLO_LIST_ID)
    #[arg(long)]
    pub list: Option<String>,
}

impl ImportArgs {
    fn strict_override(&self) -> Option<bool> {
        if self.strict {
            Some(true)
        } else if self.lenient {
            Some(false)
        } else {
            None
        }
    }
}

/// Merge config file, environment and flags into the settings for one run.
pub fn import_settings(config: &AppConfig, args: &ImportArgs) -> Result<ImportSettings> {
    let schema = args.schema.or(config.import.schema).unwrap_or_default();
    let strict = args
        .strict_override()
        .or(config.import.strict)
        .unwrap_or_else(|| schema.strict_by_default());
    let required = schema.requires_references_by_default();

    let mut trello = config.trello.clone();
    if let Some(board) = &args.board {
        trello.board_id = Some(board.clone());
    }
    if let Some(list) = &args.list {
        trello.list_id = Some(list.clone());
    }

    Ok(ImportSettings {
        board_id: trello.board_id().ok().map(str::to_string),
        list_id: trello.list_id()?.to_string(),
        schema,
        policy: ResolvePolicy {
            strictness: Strictness::from_flag(strict),
            require_labels: config.import.require_labels.unwrap_or(required),
            require_members: config.import.require_members.unwrap_or(required),
        },
        dry_run: args.dry_run,
    })
}

pub async fn handle_import(config: &AppConfig, args: &ImportArgs) -> Result<()> {
    let settings = import_settings(config, args)?;
    let client = TrelloClient::new(&config.trello)?;

    println!(
        "Importing {} (schema: {}, {})",
        args.file,
        settings.schema.as_str(),
        match settings.policy.strictness {
            Strictness::Strict => "strict",
            Strictness::Lenient => "lenient",
        }
    );

    let summary = Importer::new(&client, settings)
        .run(Path::new(&args.file))
        .await?;

    if args.dry_run {
        println!("Dry run: {} row(s) resolved, {} skipped", summary.resolved, summary.skipped);
    } else {
        println!(
            "Done: {} card(s) created, {} attachment(s), {} row(s) skipped",
            summary.created, summary.attachments, summary.skipped
        );
    }
    Ok(())
}

pub async fn handle_boards(config: &AppConfig) -> Result<()> {
    let client = TrelloClient::new(&config.trello)?;
    let boards = client.list_boards().await?;
    print_entries("Boards", &boards);
    Ok(())
}

pub async fn handle_lists(config: &AppConfig, board_id: &str) -> Result<()> {
    let client = TrelloClient::new(&config.trello)?;
    let lists = client.list_lists(board_id).await?;
    print_entries(&format!("Lists of board {board_id}"), &lists);
    Ok(())
}

pub async fn handle_discover(config: &AppConfig) -> Result<()> {
    let client = TrelloClient::new(&config.trello)?;
    let stdin = io::stdin();
    discover(&client, &mut stdin.lock()).await
}

/// Show boards, read a board id from `input`, then show that board's lists.
async fn discover(api: &dyn BoardApi, input: &mut impl BufRead) -> Result<()> {
    let boards = api.list_boards().await?;
    print_entries("Boards", &boards);
    if boards.is_empty() {
        return Ok(());
    }

    print!("\nBoard id to inspect: ");
    io::stdout().flush().ok();

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read board id")?;
    let board_id = line.trim();
    if board_id.is_empty() {
        bail!("No board id entered");
    }

    let lists = api.list_lists(board_id).await?;
    print_entries(&format!("Lists of board {board_id}"), &lists);
    Ok(())
}

fn format_entries(title: &str, entries: &[NamedEntry]) -> String {
    let mut out = format!("\n=== {title} ===\n");
    if entries.is_empty() {
        out.push_str("(none)\n");
    }
    for entry in entries {
        out.push_str(&format!("- {} (ID: {})\n", entry.name, entry.id));
    }
    out
}

fn print_entries(title: &str, entries: &[NamedEntry]) {
    print!("{}", format_entries(title, entries));
}
