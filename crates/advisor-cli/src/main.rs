//! Terminal chat with the farm advisory assistant.
//!
//! ```bash
//! advisor-chat --base-url http://localhost:5000
//! RUST_LOG=advisor_ox=debug advisor-chat
//! ```
//!
//! Type a question and press enter. Ctrl-C stops the reply being streamed; at the
//! prompt it leaves, as do `/quit` and end of input.

mod render;

use std::{
    future::Future,
    io::{self, Write},
    time::Duration,
};

use advisor_ox::{
    Advisor, CancellationToken, ChatPhase, ChatSession, Rejection, SessionConfig, SubmitOutcome,
    config::{DEFAULT_WELCOME_MESSAGE, timeout_from_secs},
};
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use crate::render::TranscriptPrinter;

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Parser)]
#[command(name = "advisor-chat")]
#[command(about = "Chat with the farm advisory assistant from the terminal")]
struct Args {
    /// Advisory backend URL [default: $ADVISOR_BASE_URL or http://localhost:5000]
    #[arg(long)]
    base_url: Option<String>,

    /// Prior messages sent along with each question [default: $ADVISOR_HISTORY_LIMIT or 6]
    #[arg(long)]
    history_limit: Option<usize>,

    /// Seconds to wait for the backend before giving up on a reply, 0 waits forever
    /// [default: $ADVISOR_IDLE_TIMEOUT_SECS or 120]
    #[arg(long)]
    idle_timeout_secs: Option<u64>,

    /// Start without the assistant's greeting
    #[arg(long)]
    no_welcome: bool,

    /// Enable verbose debug output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let advisor = match &args.base_url {
        Some(base_url) => Advisor::new(base_url.as_str()),
        None => Advisor::load_from_env(),
    };
    let config = session_config(&args)?;
    log::debug!("Using advisory backend at {}", advisor.base_url());

    let session = ChatSession::new(advisor, config);
    let mut printer = TranscriptPrinter::default();
    write_out(&printer.render(&session.transcript()))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        write_out("\nyou> ")?;
        let Some(line) = read_prompt(&mut lines, tokio::signal::ctrl_c()).await? else {
            break;
        };
        if line.trim() == "/quit" {
            break;
        }

        run_turn(&session, &mut printer, &line).await?;
    }

    write_out("\n")?;
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// Environment first, then command line flags on top
fn session_config(args: &Args) -> anyhow::Result<SessionConfig> {
    let mut config = SessionConfig::from_env()?;

    if let Some(limit) = args.history_limit {
        config.history_limit = limit;
    }

    config.idle_timeout = match args.idle_timeout_secs {
        Some(secs) => timeout_from_secs(secs),
        None if std::env::var_os("ADVISOR_IDLE_TIMEOUT_SECS").is_some() => config.idle_timeout,
        None => Some(DEFAULT_IDLE_TIMEOUT),
    };

    if !args.no_welcome {
        config.welcome_message = Some(DEFAULT_WELCOME_MESSAGE.to_string());
    }

    Ok(config)
}

/// Next input line, or `None` at end of input or once `interrupt` fires
async fn read_prompt<R, I>(lines: &mut Lines<R>, interrupt: I) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    I: Future,
{
    tokio::select! {
        line = lines.next_line() => line,
        _ = interrupt => Ok(None),
    }
}

/// Submit one line and print the reply as it streams in
async fn run_turn(
    session: &ChatSession<Advisor>,
    printer: &mut TranscriptPrinter,
    text: &str,
) -> io::Result<()> {
    let cancel = CancellationToken::new();
    let mut updates = session.subscribe();
    let mut phase = session.watch_phase();

    let submit = session.submit_with_cancel(text, &cancel);
    tokio::pin!(submit);

    let outcome = loop {
        tokio::select! {
            outcome = &mut submit => break outcome,
            Ok(()) = updates.changed() => {
                let out = printer.render(&updates.borrow_and_update());
                write_out(&out)?;
            }
            Ok(()) = phase.changed() => {
                if *phase.borrow_and_update() == ChatPhase::Submitting {
                    write_out("(thinking...)\n")?;
                }
            }
            _ = tokio::signal::ctrl_c(), if !cancel.is_cancelled() => cancel.cancel(),
        }
    };

    write_out(&printer.render(&session.transcript()))?;

    match outcome {
        SubmitOutcome::Cancelled => {
            let notice = &session.config().cancel_notice;
            if session.transcript().last().is_some_and(|m| &m.content != notice) {
                write_out(" [stopped]")?;
            }
        }
        SubmitOutcome::Rejected(Rejection::Busy) => {
            log::warn!("A reply is still streaming, message ignored");
        }
        SubmitOutcome::Failed(err) => log::debug!("Turn failed: {err:?}"),
        SubmitOutcome::Completed { .. } | SubmitOutcome::Rejected(Rejection::EmptyInput) => {}
    }

    Ok(())
}

fn write_out(text: &str) -> io::Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_prompt_returns_typed_line() {
        let (mut input, output) = tokio::io::duplex(64);
        input.write_all(b"When to sow wheat?\n").await.unwrap();
        let mut lines = BufReader::new(output).lines();

        let line = read_prompt(&mut lines, std::future::pending::<()>()).await.unwrap();
        assert_eq!(line.as_deref(), Some("When to sow wheat?"));
    }

    #[tokio::test]
    async fn test_interrupt_at_prompt_ends_input() {
        // Writer kept open, so the read alone would wait forever
        let (_input, output) = tokio::io::duplex(64);
        let mut lines = BufReader::new(output).lines();

        let line = read_prompt(&mut lines, std::future::ready(())).await.unwrap();
        assert!(line.is_none());
    }
}
