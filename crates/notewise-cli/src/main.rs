//! Notewise — study notes and quizzes from parsed documents.

use serde_json::Value;
use tracing_subscriber::EnvFilter;

use notewise_core::{Outcome, Result};

mod args;
mod commands;

use args::Args;
use commands::Context;

const USAGE: &str = "\
Notewise: study notes and quizzes from parsed documents

Usage: notewise <command> [args]

Commands:
  notes <records.json>... [--out DIR] [--owner ID]   Generate notes from page records
  quiz <notes.md> [--mc N] [--fill N] [--tf N] [--short N] [--prefs TEXT] [--ask TEXT]
                                                     Generate a quiz from notes
  outline <notes.md>                                 Table of contents and mind map
  section <notes.md> <title> [--mindmap]             Print one section
  chat <notes.md> <message> [--apply]                Ask about or edit the notes
  answer <questions.json> <index> <answer> [--session ID] [--secs N]
                                                     Grade and record an answer
  report <answers-dir> <session>                     Build an answer report
  grade <type> <user-answer> <correct-answer>        Grade a single answer
  help                                               Show this help message

Environment: NOTEWISE_DATA_DIR, NOTEWISE_API_KEY, NOTEWISE_BASE_URL, NOTEWISE_MODEL";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the JSON result.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let raw: Vec<String> = std::env::args().collect();
    let Some(command) = raw.get(1) else {
        println!("{}", USAGE);
        return Ok(());
    };
    let rest = &raw[2..];

    let result = match command.as_str() {
        "--help" | "-h" | "help" => {
            println!("{}", USAGE);
            return Ok(());
        }
        "notes" | "quiz" | "outline" | "section" | "chat" | "answer" | "report" | "grade" => {
            run(command, rest).await
        }
        other => {
            eprintln!("Unknown command: {}. Use 'notewise help' for usage.", other);
            std::process::exit(1);
        }
    };

    let success = result.is_ok();
    let outcome = Outcome::from_result(result, None::<String>);
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !success {
        std::process::exit(1);
    }
    Ok(())
}

async fn run(command: &str, rest: &[String]) -> Result<Value> {
    let args = Args::parse(rest, &["apply", "mindmap"])?;
    match command {
        "outline" => commands::outline(&args),
        "grade" => commands::grade(&args),
        "section" if !args.has("mindmap") => commands::section(None, &args).await,
        _ => {
            let ctx = Context::load()?;
            match command {
                "notes" => commands::notes(&ctx, &args).await,
                "quiz" => commands::quiz(&ctx, &args).await,
                "section" => commands::section(Some(&ctx), &args).await,
                "chat" => commands::chat(&ctx, &args).await,
                "answer" => commands::answer(&ctx, &args).await,
                "report" => commands::report(&ctx, &args).await,
                other => Err(notewise_core::Error::Input(format!("unknown command {}", other))),
            }
        }
    }
}
