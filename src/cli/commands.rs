use clap::{Parser, Subcommand};
use crate::api::LocalApi;
use crate::board::filter::select;
use crate::board::{Board, DragEvent, DragId, LeadFilter, LeadSort, Outcome};
use crate::cli::error::{confirm, parse_lead_status, user_error, validate_lead_id, validate_non_empty, validate_stage_key};
use crate::cli::output::{
    format_board, format_history, format_lead_table, format_ok, format_rollback, format_stage_list,
    get_terminal_width, is_tty, ConsoleNotifier,
};
use crate::config::RcConfig;
use crate::db::DbConnection;
use crate::models::NewLead;
use anyhow::{Context, Result};

type CliBoard = Board<LocalApi, ConsoleNotifier>;

#[derive(Parser)]
#[command(name = "leadboard")]
#[command(about = "Leadboard - CRM pipeline board with optimistic drag-and-drop stage management")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the pipeline board (one column per stage)
    Board {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Stage management commands
    Stages {
        #[command(subcommand)]
        subcommand: StageCommands,
    },
    /// Lead management commands
    Leads {
        #[command(subcommand)]
        subcommand: LeadCommands,
    },
}

#[derive(Subcommand)]
pub enum StageCommands {
    /// List stages in board order
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Create a stage at the end of the board
    Add {
        /// Make the new stage the default for incoming leads
        #[arg(long)]
        default: bool,
        /// Stage title
        #[arg(required = true)]
        title: Vec<String>,
    },
    /// Rename a stage (its key does not change)
    Rename {
        /// Stage key
        stage: String,
        /// New title
        #[arg(required = true)]
        title: Vec<String>,
    },
    /// Make a stage the default for new leads
    Default {
        /// Stage key
        stage: String,
    },
    /// Delete an empty, non-default stage
    Delete {
        /// Stage key
        stage: String,
        /// Delete without confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Drag a stage onto another stage's slot
    Move {
        /// Stage key to move
        stage: String,
        /// Stage key whose slot it takes
        onto: String,
    },
}

#[derive(Subcommand)]
pub enum LeadCommands {
    /// Add a new lead
    Add {
        /// Stage key (defaults to the default stage)
        #[arg(long)]
        stage: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// Where the lead came from (e.g. web, referral)
        #[arg(long)]
        source: Option<String>,
        /// Full name
        #[arg(required = true)]
        name: Vec<String>,
    },
    /// List leads
    List {
        /// Only leads in this stage
        #[arg(long)]
        stage: Option<String>,
        /// Only leads with this status (active, converted, lost)
        #[arg(long)]
        status: Option<String>,
        /// Sort order: newest, oldest, name
        #[arg(long, default_value = "newest")]
        sort: String,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
        /// Search text (name, email, or phone)
        query: Vec<String>,
    },
    /// Drag a lead onto a stage column or onto another lead
    Move {
        /// Lead ID
        lead: String,
        /// Stage key (or stage-<key>), or the ID of a lead whose stage to join
        target: String,
    },
    /// Permanently delete a lead
    Delete {
        /// Lead ID
        lead: String,
        /// Delete without confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Show a lead's stage history
    History {
        /// Lead ID
        lead: String,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };
    handle_command(cli)
}

fn handle_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Board { json } => handle_board(json),
        Commands::Stages { subcommand } => handle_stages(subcommand),
        Commands::Leads { subcommand } => handle_leads(subcommand),
    }
}

/// Open the database and load the board from it
fn open_board() -> Result<CliBoard> {
    let rc = RcConfig::load().unwrap_or_else(|e| user_error(&format!("{:#}", e)));
    let db_path = match rc.data_location {
        Some(path) => path,
        None => DbConnection::default_path()?,
    };
    let conn = DbConnection::connect_at(&db_path)
        .context("Failed to connect to database")?;

    let api = LocalApi::new(conn).read_only(rc.board.read_only);
    let mut board = Board::new(api, ConsoleNotifier::new(), rc.board);
    board.refresh()?;
    Ok(board)
}

/// Exit non-zero when an optimistic change did not stick
fn finish(outcome: Outcome) -> Result<()> {
    match outcome {
        Outcome::RolledBack | Outcome::Superseded => {
            eprintln!("{}", format_rollback(is_tty()));
            std::process::exit(1);
        }
        Outcome::Noop | Outcome::Persisted => Ok(()),
    }
}

fn handle_board(json: bool) -> Result<()> {
    let board = open_board()?;
    let columns = board.columns();

    if json {
        println!("{}", serde_json::to_string_pretty(&columns)?);
    } else {
        print!("{}", format_board(&columns, get_terminal_width(), is_tty()));
    }
    Ok(())
}

fn require_stage_key(board: &CliBoard, key: &str) {
    if let Err(e) = validate_stage_key(key) {
        user_error(&e);
    }
    if board.stages().stage_by_key(key).is_none() {
        user_error(&format!("Stage '{}' not found", key));
    }
}

fn handle_stages(cmd: StageCommands) -> Result<()> {
    match cmd {
        StageCommands::List { json } => {
            let board = open_board()?;
            if json {
                println!("{}", serde_json::to_string_pretty(board.stages().stages())?);
            } else {
                print!("{}", format_stage_list(board.stages().stages(), is_tty()));
            }
            Ok(())
        }
        StageCommands::Add { default, title } => {
            let title = title.join(" ");
            if let Err(e) = validate_non_empty(&title, "Stage title") {
                user_error(&e);
            }
            let mut board = open_board()?;
            let stage = board.create_stage(&title, default)?;
            println!("{}", format_ok(&format!("Key: {}", stage.stage_id), is_tty()));
            Ok(())
        }
        StageCommands::Rename { stage, title } => {
            let title = title.join(" ");
            if let Err(e) = validate_non_empty(&title, "Stage title") {
                user_error(&e);
            }
            let mut board = open_board()?;
            require_stage_key(&board, &stage);
            board.rename_stage(&stage, &title)?;
            Ok(())
        }
        StageCommands::Default { stage } => {
            let mut board = open_board()?;
            require_stage_key(&board, &stage);
            board.set_default_stage(&stage)?;
            Ok(())
        }
        StageCommands::Delete { stage, yes } => {
            let mut board = open_board()?;
            require_stage_key(&board, &stage);
            if !yes {
                let title = board.stages().title_of(&stage).to_string();
                if !confirm(&format!("Delete stage '{}'?", title))? {
                    println!("Cancelled.");
                    return Ok(());
                }
            }
            board.delete_stage(&stage)?;
            Ok(())
        }
        StageCommands::Move { stage, onto } => {
            let mut board = open_board()?;
            require_stage_key(&board, &stage);
            require_stage_key(&board, &onto);

            let active = DragId::stage(&stage);
            board.handle_drag(DragEvent::start(&active))?;
            let outcome = board.handle_drag(DragEvent::end(&active, Some(&DragId::stage(&onto))))?;
            if outcome == Outcome::Noop {
                println!("Stage '{}' is already in that position.", stage);
            }
            finish(outcome)
        }
    }
}

fn parse_lead_arg(board: &CliBoard, raw: &str) -> i64 {
    let id = validate_lead_id(raw).unwrap_or_else(|e| user_error(&e));
    if board.leads().lead(id).is_none() {
        user_error(&format!("Lead {} not found", id));
    }
    id
}

/// Drop id for a `leads move` target. `stage-<key>` and bare stage keys name
/// a column; a number names another lead's card unless no such lead exists.
fn move_target(board: &CliBoard, target: &str) -> String {
    if let Some(key) = target.strip_prefix("stage-") {
        if board.stages().stage_by_key(key).is_some() {
            return DragId::stage(key);
        }
    }
    if let Ok(other) = validate_lead_id(target) {
        if board.leads().lead(other).is_some() {
            return other.to_string();
        }
        if board.stages().stage_by_key(target).is_none() {
            user_error(&format!("Lead {} not found", other));
        }
    }
    require_stage_key(board, target);
    DragId::stage(target)
}

fn handle_leads(cmd: LeadCommands) -> Result<()> {
    match cmd {
        LeadCommands::Add { stage, email, phone, source, name } => {
            let full_name = name.join(" ");
            if let Err(e) = validate_non_empty(&full_name, "Full name") {
                user_error(&e);
            }
            let mut board = open_board()?;
            if let Some(key) = &stage {
                require_stage_key(&board, key);
            }
            let lead = board.create_lead(&NewLead {
                full_name,
                stage,
                email,
                phone,
                source,
            })?;
            println!("Created lead {} in {}", lead.id, board.stages().title_of(&lead.stage));
            Ok(())
        }
        LeadCommands::List { stage, status, sort, json, query } => {
            let status = status
                .map(|s| parse_lead_status(&s).unwrap_or_else(|e| user_error(&e)));
            let sort: LeadSort = sort.parse().unwrap_or_else(|e: String| user_error(&e));
            let filter = LeadFilter {
                query: if query.is_empty() { None } else { Some(query.join(" ")) },
                stage,
                status,
            };

            let board = open_board()?;
            let leads = select(board.leads().leads(), &filter, sort);
            if json {
                println!("{}", serde_json::to_string_pretty(&leads)?);
            } else {
                print!(
                    "{}",
                    format_lead_table(&leads, |key| board.stages().title_of(key), get_terminal_width(), is_tty())
                );
            }
            Ok(())
        }
        LeadCommands::Move { lead, target } => {
            let mut board = open_board()?;
            let lead_id = parse_lead_arg(&board, &lead);

            let over = move_target(&board, &target);

            let active = lead_id.to_string();
            board.handle_drag(DragEvent::start(&active))?;
            let outcome = board.handle_drag(DragEvent::end(&active, Some(&over)))?;
            if outcome == Outcome::Noop {
                let stage = board
                    .leads()
                    .lead(lead_id)
                    .map(|l| board.stages().title_of(&l.stage).to_string())
                    .unwrap_or_default();
                println!("Lead {} is already in {}.", lead_id, stage);
            }
            finish(outcome)
        }
        LeadCommands::Delete { lead, yes } => {
            let mut board = open_board()?;
            let lead_id = parse_lead_arg(&board, &lead);
            if !yes {
                let name = board.leads().lead(lead_id).map(|l| l.full_name.clone()).unwrap_or_default();
                if !confirm(&format!("Delete lead {} ({})?", lead_id, name))? {
                    println!("Cancelled.");
                    return Ok(());
                }
            }
            let outcome = board.delete_lead(lead_id)?;
            finish(outcome)
        }
        LeadCommands::History { lead, json } => {
            let mut board = open_board()?;
            let lead_id = parse_lead_arg(&board, &lead);
            let notes = board.lead_history(lead_id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&notes)?);
            } else if let Some(lead) = board.leads().lead(lead_id) {
                print!("{}", format_history(lead, &notes, is_tty()));
            }
            Ok(())
        }
    }
}
