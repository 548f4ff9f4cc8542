//! Interactive chat REPL.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::agent::{ChatAgent, ChatOutcome, ChatRequest, ChatStatus};
use crate::config::AgentConfig;
use crate::provider::ProviderKind;
use crate::stream::DeltaSink;
use crate::tools::{BookContext, ToolProgress, ToolProgressSink, ToolRegistry};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "ABACUS_LOG";

#[derive(Parser, Debug)]
#[command(name = "abacus", version, about = "Abacus bookkeeping assistant")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chat with the assistant
    Chat(ChatArgs),
}

#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// Provider (open_ai, deep_seek, qwen, moonshot, zhipu, open_router, azure, custom)
    #[arg(short, long)]
    pub provider: Option<ProviderKind>,

    /// Model name; defaults to the provider's default model
    #[arg(short, long)]
    pub model: Option<String>,

    /// Active book id passed to tools
    #[arg(long)]
    pub book_id: Option<String>,

    /// Display name of the active book
    #[arg(long, requires = "book_id")]
    pub book_name: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Install the stderr subscriber. `ABACUS_LOG` wins over `--verbose`.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "abacus=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn delta_printer(streamed: Arc<AtomicBool>) -> DeltaSink {
    Arc::new(move |delta: &str, complete: bool| {
        let mut out = std::io::stdout();
        if complete {
            let _ = writeln!(out);
        } else {
            streamed.store(true, Ordering::Relaxed);
            let _ = write!(out, "{delta}");
        }
        let _ = out.flush();
    })
}

/// Part of the reply the user has not already seen as streamed deltas.
fn unseen_text(outcome: &ChatOutcome, streamed: bool) -> Option<&str> {
    match outcome.status {
        ChatStatus::Failed => Some(&outcome.text),
        _ if streamed => outcome.notice.as_deref(),
        _ => Some(&outcome.text),
    }
}

fn progress_printer() -> ToolProgressSink {
    Arc::new(|event: ToolProgress| match event {
        ToolProgress::Started { index, total, name } => {
            eprintln!("\n[tool {}/{total}] {name}", index + 1);
        }
        ToolProgress::Succeeded { name, .. } => eprintln!("[tool] {name} ok"),
        ToolProgress::Failed { name, error, .. } => eprintln!("[tool] {name} failed: {error}"),
    })
}

/// Run the chat REPL until stdin closes or `/quit`.
pub async fn run_chat(args: ChatArgs) -> crate::error::Result<()> {
    let mut config = AgentConfig::load()?;
    if let Some(provider) = args.provider {
        config = config.with_provider(provider);
    }
    if let Some(model) = args.model {
        config = config.with_model(model);
    }
    config.validate()?;

    let book = args.book_id.map(|id| {
        let book = BookContext::new(id);
        match args.book_name {
            Some(name) => book.with_name(name),
            None => book,
        }
    });

    let mut agent = ChatAgent::from_config(config, Arc::new(ToolRegistry::new()))?;
    eprintln!(
        "abacus: {} / {} (Ctrl-C cancels a reply, /clear resets, /quit exits)",
        agent.config().provider,
        agent.config().model()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        let _ = std::io::stderr().flush();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                agent.clear_history();
                eprintln!("(history cleared)");
                continue;
            }
            _ => {}
        }

        let cancel = CancellationToken::new();
        let streamed = Arc::new(AtomicBool::new(false));
        let request = ChatRequest::new(line)
            .with_context(book.clone())
            .with_delta_sink(delta_printer(Arc::clone(&streamed)))
            .with_progress_sink(progress_printer())
            .with_cancellation(cancel.clone());

        let call = agent.send_message(request);
        tokio::pin!(call);
        let outcome = loop {
            tokio::select! {
                outcome = &mut call => break outcome?,
                _ = tokio::signal::ctrl_c() => {
                    cancel.cancel();
                }
            }
        };

        if outcome.status == ChatStatus::Canceled {
            eprintln!("\n(canceled)");
        } else if let Some(text) = unseen_text(&outcome, streamed.load(Ordering::Relaxed)) {
            println!("{text}");
        }
    }
    Ok(())
}
