//! Chat command implementation.
//!
//! Without a message argument this starts an interactive session on stdin.
//! Replies stream to stdout token by token. `/clear` starts over and `/quit`
//! exits.

use std::io::Write;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use insight_ai::{Backend, ChatSession, backend_for};
use insight_service::{AppState, Config};

use crate::format::FormatOptions;
use crate::style;
use crate::util::local_state;

pub async fn cmd_chat(config: Config, message: Option<String>, opts: &FormatOptions) -> Result<()> {
    let state = local_state(config, 0).await?;
    let settings = state.ai.read().await.effective();
    let backend = backend_for(&settings, state.http.clone())
        .context("AI provider is not configured; see `factory-insight settings`")?;
    let mut session = ChatSession::new();

    if let Some(message) = message {
        return turn(&mut session, &message, backend.as_ref(), &state).await;
    }

    eprintln!(
        "{} {} ({}). Type /clear to start over, /quit to exit.",
        style::heading("Chatting with", opts.no_color),
        settings.provider.label(),
        settings.active().model
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        std::io::stderr().flush().ok();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear();
                eprintln!("Conversation cleared.");
            }
            message => turn(&mut session, message, backend.as_ref(), &state).await?,
        }
    }
    Ok(())
}

/// Send one message and print the reply as it streams.
async fn turn(
    session: &mut ChatSession,
    message: &str,
    backend: &dyn Backend,
    state: &AppState,
) -> Result<()> {
    let devices = state.monitor.lock().await.devices().to_vec();
    let mut streamed = String::new();
    let mut stdout = std::io::stdout();

    let reply = session
        .send_with(message, backend, &devices, |token| {
            streamed.push_str(token);
            let _ = write!(stdout, "{token}");
            let _ = stdout.flush();
        })
        .await;

    let mut stdout = std::io::stdout();
    match reply {
        // A failed turn replaces whatever streamed with the apology.
        Some(reply) if reply.text() != streamed => {
            if !streamed.is_empty() {
                writeln!(stdout)?;
            }
            writeln!(stdout, "{}", reply.text())?;
        }
        Some(_) => writeln!(stdout)?,
        None => {}
    }
    Ok(())
}
