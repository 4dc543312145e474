use anyhow::Result;
use chat::ChatSession;
use clap::{Parser, Subcommand};
use cli::repl::{HELP, ReplCommand};
use cli::{AppConfig, logging, render};
use client::{ReadifyApi, UploadFile};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Chat with your documents through the Readify backend
#[derive(Parser, Debug)]
#[command(name = "readify", version)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload documents and start an interactive chat about them
    Chat {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_json);
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Chat { files } => chat(&config, &files).await,
    }
}

async fn chat(config: &AppConfig, paths: &[PathBuf]) -> Result<()> {
    let client = config.readify_client()?;
    info!(backend = client.base_url(), "Connecting to Readify");

    let mut session = ChatSession::new(client);
    println!("Session {}", session.session_id());
    upload(&mut session, paths).await;

    if let Some(greeting) = session.messages().first() {
        print!("{}", render::chat_message(greeting));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Ask(question) => {
                if let Some(reply) = session.ask(&question).await {
                    print!("{}", render::chat_message(reply));
                }
            }
            ReplCommand::Files => {
                if session.files().is_empty() {
                    println!("No active documents.");
                }
                for name in session.files() {
                    println!("  {}", name);
                }
            }
            ReplCommand::Add(path) => upload(&mut session, &[path]).await,
            ReplCommand::Remove(name) => {
                session.remove_file(&name).await;
                println!("Removed {}", name);
            }
            ReplCommand::Reset => match session.reset().await {
                Ok(()) => {
                    println!("Session reset. New session {}", session.session_id());
                    println!("Upload documents with /add <path>.");
                }
                Err(e) => eprintln!("{}", e),
            },
            ReplCommand::Help => println!("{}", HELP),
            ReplCommand::Quit => break,
            ReplCommand::Invalid(reason) => eprintln!("{} (try /help)", reason),
        }
    }

    Ok(())
}

/// Unreadable paths are reported and skipped; the rest go up in one request.
async fn upload<A: ReadifyApi>(session: &mut ChatSession<A>, paths: &[PathBuf]) {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match UploadFile::from_path(path).await {
            Ok(file) => files.push(file),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                eprintln!("Skipping {}: {}", path.display(), e);
            }
        }
    }
    if files.is_empty() {
        return;
    }

    match session.upload(&files).await {
        Ok(receipt) => {
            println!(
                "Indexed {} ({} chunks)",
                receipt.filenames.join(", "),
                receipt.chunks_processed
            );
            for error in &receipt.errors {
                eprintln!("  {}", error);
            }
        }
        Err(e) => eprintln!("{}", e),
    }
}
