//! Interactive driver for the conversation engine
//!
//! A terminal stand-in for the chat platform: free text goes through the
//! engine exactly like a chat message, and slash commands stand in for the
//! button presses the real presentation layer would send.
//!
//! # Usage
//!
//! ```bash
//! # In-memory records, fuzzy local category resolution
//! spendbot_repl
//!
//! # Append saved records to a JSONL file
//! spendbot_repl --records records.jsonl
//!
//! # Inside the prompt:
//! #   /add lunch 350.50 at McDonald's     stage a draft
//! #   /approve <draft-id>   /edit <draft-id>   /reject <draft-id>
//! #   /save   /cancel   /new   /stats   /quit
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use spendbot::classify::ClassificationCatalog;
use spendbot::collab::{
    CategoryResolver, GenerativeResolver, JaroWinklerResolver, JsonlSink, MemorySink, RecordSink,
};
use spendbot::config::EngineConfig;
use spendbot::engine::edit_flow::parse_amount;
use spendbot::engine::{
    AttrValue, Attributes, DraftId, EngineResponse, Field, FlowEngine, UserId, UserInput,
};

#[derive(Parser)]
#[command(name = "spendbot_repl")]
#[command(version = "0.1.0")]
#[command(about = "Interactive driver for the spendbot conversation engine")]
struct Cli {
    /// Acting user id
    #[arg(long, default_value_t = 1)]
    user: i64,

    /// Append saved records to this JSONL file (in-memory when omitted)
    #[arg(long)]
    records: Option<std::path::PathBuf>,

    /// Session inactivity timeout in minutes
    #[arg(long, env = "SPENDBOT_SESSION_TIMEOUT_MINUTES")]
    timeout_minutes: Option<i64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spendbot=info".into()),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = EngineConfig::from_env();
    if let Some(minutes) = cli.timeout_minutes {
        config.session_timeout = chrono::Duration::minutes(minutes);
    }

    // An API key upgrades category resolution from local fuzzy matching to
    // the generative endpoint.
    let resolver: Arc<dyn CategoryResolver> = match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Arc::new(GenerativeResolver::new(key)?),
        _ => Arc::new(JaroWinklerResolver::default()),
    };

    let sink: Arc<dyn RecordSink> = match &cli.records {
        Some(path) => Arc::new(JsonlSink::new(path)),
        None => Arc::new(MemorySink::new()),
    };

    let engine = Arc::new(FlowEngine::new(
        config,
        ClassificationCatalog::with_default_set()?,
        resolver,
        sink,
    ));
    let _sweeper = engine.clone().spawn_sweeper();

    let user = UserId(cli.user);
    println!(
        "{} user {user} - type an expense, or /help",
        "spendbot".green().bold()
    );

    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        editor.add_history_entry(&line)?;

        match parse_command(&line) {
            Command::Quit => break,
            Command::Help => print_help(),
            Command::Stats => {
                let stats = engine.session_stats().await;
                println!(
                    "sessions: {} (users: {}, <5m: {}, <30m: {}, ≥30m: {})",
                    stats.sessions, stats.users, stats.under_5min, stats.under_30min,
                    stats.over_30min
                );
            }
            Command::Add(text) => match stage_draft(&engine, user, &text).await {
                Ok(response) => render(&response),
                Err(e) => println!("{} {e}", "!".red()),
            },
            Command::Input(input) => {
                let response = engine.handle(user, input).await;
                render(&response);
            }
        }
    }
    Ok(())
}

enum Command {
    Input(UserInput),
    Add(String),
    Stats,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Command {
    // Raw callback descriptors (what a chat platform button would send)
    // decode straight into structured input.
    if let Some(input) = spendbot::engine::action::decode(line) {
        return Command::Input(input);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Input(UserInput::message(line));
    };
    let (cmd, arg) = match rest.split_once(' ') {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (rest, ""),
    };
    match cmd {
        "add" => Command::Add(arg.to_string()),
        "approve" => Command::Input(UserInput::Approve {
            draft_id: DraftId::from(arg),
        }),
        "reject" => Command::Input(UserInput::Reject {
            draft_id: DraftId::from(arg),
        }),
        "edit" => Command::Input(UserInput::StartEdit {
            draft_id: DraftId::from(arg),
        }),
        "save" => Command::Input(UserInput::Save),
        "cancel" => Command::Input(UserInput::CancelFlow),
        "new" => Command::Input(UserInput::StartWizard),
        "stats" => Command::Stats,
        "quit" | "exit" => Command::Quit,
        _ => Command::Help,
    }
}

/// Crude stand-in for the AI parsing collaborator: scrape an amount, treat
/// the text as merchant/notes, and let the engine's keyword matching pick a
/// category.
async fn stage_draft(
    engine: &FlowEngine,
    user: UserId,
    text: &str,
) -> anyhow::Result<EngineResponse> {
    let amount = parse_amount(text).map_err(|e| anyhow::anyhow!("{e}"))?;
    let attrs = Attributes::new()
        .with(Field::Amount, AttrValue::Number(amount))
        .with(Field::Notes, AttrValue::text(text))
        .with(
            Field::Date,
            AttrValue::Date(chrono::Utc::now().date_naive()),
        );
    Ok(engine.submit_draft(user, attrs).await)
}

fn render(response: &EngineResponse) {
    match response {
        EngineResponse::DraftPending { draft } => {
            println!(
                "{} draft {} - amount {:?}, category {:?}",
                "pending".yellow().bold(),
                draft.id,
                draft.attributes.amount(),
                draft.attributes.category().unwrap_or("-"),
            );
            println!("  /approve {0} | /edit {0} | /reject {0}", draft.id);
        }
        EngineResponse::Approved { draft_id } => {
            println!("{} {draft_id} saved", "approved".green().bold())
        }
        EngineResponse::Rejected { draft_id } => {
            println!("{} {draft_id} discarded", "rejected".red())
        }
        EngineResponse::PromptAmount { current, .. } => {
            println!("new amount? (current: {current:?})")
        }
        EngineResponse::PromptCategory { amount } => {
            println!("amount set to {amount}. which category?")
        }
        EngineResponse::ConfirmSuggestion {
            original,
            suggested,
        } => println!("did you mean '{suggested}' instead of '{original}'? (yes/no)"),
        EngineResponse::ReadyToSave {
            category,
            newly_created,
        } => {
            let marker = if *newly_created { " (new)" } else { "" };
            println!("category '{category}'{marker}. /save or /cancel");
        }
        EngineResponse::Saved { attributes, .. } => println!(
            "{} {:?} / {:?}",
            "saved".green().bold(),
            attributes.amount(),
            attributes.category().unwrap_or("-"),
        ),
        EngineResponse::SaveFailed { error } => {
            println!("{} {error} (retry with /save)", "save failed".red().bold())
        }
        EngineResponse::Cancelled { flow } => println!("{} {flow:?} flow", "cancelled".red()),
        EngineResponse::WizardPrompt { step } => match step {
            spendbot::engine::WizardStep::CollectingName => println!("name for the new category?"),
            spendbot::engine::WizardStep::CollectingGlyph { name } => {
                println!("'{name}'. glyph? (anything short)")
            }
            spendbot::engine::WizardStep::CollectingKeywords { name, glyph } => {
                println!("{glyph} '{name}'. keywords, comma-separated (or 'none')?")
            }
        },
        EngineResponse::ClassificationCreated { classification } => println!(
            "{} {} '{}' ({} keywords)",
            "created".green().bold(),
            classification.glyph,
            classification.name,
            classification.keywords.len(),
        ),
        EngineResponse::Reprompt { error, .. } => println!("{} {error}", "!".yellow()),
        EngineResponse::NoActiveFlow => println!("nothing in progress - /help"),
        EngineResponse::FlowExpired => println!("{}", "that session expired; start over".yellow()),
        EngineResponse::Idle { content } => {
            println!("(no active flow; '{content}' would go to the NL pipeline; try /add)")
        }
    }
}

fn print_help() {
    println!("  <text>            reply to the active flow");
    println!("  /add <expense>    stage a draft (e.g. /add lunch 350.50)");
    println!("  /approve <id>     persist a pending draft");
    println!("  /edit <id>        open the edit flow on a draft");
    println!("  /reject <id>      discard a pending draft");
    println!("  /save /cancel     finish or abandon the active flow");
    println!("  /new              create a classification");
    println!("  /stats            session store stats");
    println!("  /quit             leave");
}
