//! `ask` and `chat` commands.
//!
//! Both open the page's session on the engine and run turns through
//! [`run_turn`], which renders the partial answer from the engine's
//! streaming channel while the turn is in flight. Ctrl-C cancels the
//! current turn instead of killing the process.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use pagechat_core::chat::{DEFAULT_REQUEST, TurnOutcome};
use pagechat_types::chat::ChatSession;
use pagechat_types::error::SubmitError;
use pagechat_types::llm::OutputLanguage;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::state::{AppState, ConcreteChatEngine};

/// In-chat controls. Anything not starting with `/` is a question.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    Help,
    Exit,
    /// Delete this page's sessions and start over.
    Reset,
    History,
    /// Switch the output language (`/lang fr`).
    Lang(String),
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (cmd, arg) = match trimmed.split_once(' ') {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (trimmed, ""),
    };

    let command = match cmd.to_lowercase().as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/exit" | "/quit" | "/q" => ChatCommand::Exit,
        "/reset" | "/new" => ChatCommand::Reset,
        "/history" => ChatCommand::History,
        "/lang" if !arg.is_empty() => ChatCommand::Lang(arg.to_string()),
        "/lang" => ChatCommand::Unknown("/lang requires a language code".to_string()),
        other => ChatCommand::Unknown(other.to_string()),
    };
    Some(command)
}

/// Answer one question about `url` and exit.
pub async fn ask(
    state: &AppState,
    url: &str,
    question: Option<String>,
    lang: Option<String>,
    new: bool,
    json: bool,
) -> Result<()> {
    let session = open_page(state, url, lang, new, json).await?;
    let question = question.unwrap_or_else(|| DEFAULT_REQUEST.to_string());

    let outcome = run_turn(&state.engine, &question, json).await?;

    if json {
        let result = serde_json::json!({
            "session_id": session.id.to_string(),
            "url": session.page_url,
            "question": question,
            "answer": outcome.message().text,
            "failed": outcome.is_failed(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    if outcome.is_failed() {
        bail!("generation failed");
    }
    Ok(())
}

/// Interactive conversation about `url`, one line per question.
pub async fn chat(
    state: &AppState,
    url: &str,
    lang: Option<String>,
    new: bool,
    json: bool,
) -> Result<()> {
    let session = open_page(state, url, lang, new, json).await?;
    if !json {
        print_history(&session);
        println!(
            "  {} Ask anything about this page. {} for commands.",
            style("i").blue().bold(),
            style("/help").cyan()
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if !json {
            print!("{} ", style(">").green().bold());
            std::io::stdout().flush()?;
        }

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Some(ChatCommand::Exit) => break,
            Some(ChatCommand::Help) => print_help(),
            Some(ChatCommand::Reset) => {
                let fresh = state.engine.reset().await?;
                println!(
                    "  {} Started a new conversation ({})",
                    style("ok").green(),
                    style(fresh.id).dim()
                );
            }
            Some(ChatCommand::History) => {
                if let Some(session) = state.engine.session().await {
                    print_history(&session);
                }
            }
            Some(ChatCommand::Lang(code)) => {
                let language = OutputLanguage::from_code(&code);
                println!(
                    "  {} Answers will be in {}",
                    style("ok").green(),
                    style(language.describe()).cyan()
                );
                state.engine.set_output_language(language);
            }
            Some(ChatCommand::Unknown(cmd)) => {
                println!("  {} Unknown command: {cmd}", style("!").yellow().bold());
            }
            None => match run_turn(&state.engine, &line, json).await {
                Ok(outcome) if json => {
                    println!(
                        "{}",
                        serde_json::json!({
                            "question": line.trim(),
                            "answer": outcome.message().text,
                            "failed": outcome.is_failed(),
                        })
                    );
                }
                Ok(_) => {}
                // Keep the conversation going on a refused turn.
                Err(e) => eprintln!("  {} {e}", style("!").yellow().bold()),
            },
        }
    }

    Ok(())
}

async fn open_page(
    state: &AppState,
    url: &str,
    lang: Option<String>,
    new: bool,
    json: bool,
) -> Result<ChatSession> {
    if let Some(code) = lang {
        state.engine.set_output_language(OutputLanguage::from_code(&code));
    }

    let session = state.engine.open(url, new).await?;

    if !json && let Some(page) = state.engine.page_content().await {
        if page.text.is_empty() {
            eprintln!(
                "  {} Could not read the {}; answering without page text.",
                style("!").yellow().bold(),
                page.kind
            );
        } else if page.is_truncated() {
            eprintln!(
                "  {} Only the first {}% of the {} fits the model's input.",
                style("!").yellow().bold(),
                page.percentage_kept,
                page.kind
            );
        }
    }

    Ok(session)
}

/// Submit `text` and render the answer as it streams in.
///
/// Refused turns come back as errors with a hint; generation failures come
/// back as a failed outcome whose message is already in the session.
async fn run_turn(engine: &Arc<ConcreteChatEngine>, text: &str, json: bool) -> Result<TurnOutcome> {
    let mut partial = engine.streaming();
    let turn = {
        let engine = Arc::clone(engine);
        let text = text.to_string();
        tokio::spawn(async move { engine.submit(&text).await })
    };
    tokio::pin!(turn);

    let spinner = (!json).then(thinking_spinner);
    let mut printed = 0usize;

    let joined = loop {
        tokio::select! {
            joined = &mut turn => break joined,
            changed = partial.changed() => {
                if changed.is_err() {
                    break (&mut turn).await;
                }
                if json {
                    continue;
                }
                let buffer = partial.borrow_and_update().clone();
                if buffer.len() > printed {
                    if let Some(spinner) = &spinner {
                        spinner.finish_and_clear();
                    }
                    print!("{}", &buffer[printed..]);
                    std::io::stdout().flush()?;
                    printed = buffer.len();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if engine.cancel() {
                    tracing::debug!("turn cancelled from the terminal");
                }
            }
        }
    };

    if let Some(spinner) = &spinner {
        spinner.finish_and_clear();
    }

    let outcome = match joined? {
        Ok(outcome) => outcome,
        Err(SubmitError::MissingCredential) => {
            bail!("No API key configured. Set one with: pagechat key set")
        }
        Err(e) => return Err(e.into()),
    };

    if !json {
        match &outcome {
            TurnOutcome::Completed(message) => {
                if let Some(rest) = message.text.get(printed..) {
                    print!("{rest}");
                }
                println!();
            }
            TurnOutcome::Failed(message) => {
                if printed > 0 {
                    println!();
                }
                eprintln!("  {} {}", style("x").red().bold(), message.text);
            }
        }
    }

    Ok(outcome)
}

fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("thinking...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

fn print_history(session: &ChatSession) {
    if session.messages.is_empty() {
        return;
    }
    println!();
    for message in &session.messages {
        let speaker = if message.from_user {
            style(message.speaker()).green().bold()
        } else {
            style(message.speaker()).cyan().bold()
        };
        println!("  {speaker}: {}", message.text);
    }
    println!();
}

fn print_help() {
    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    println!("  {}       Show this help message", style("/help").cyan());
    println!("  {}    Show the conversation so far", style("/history").cyan());
    println!("  {}   Switch answer language, e.g. /lang fr", style("/lang <code>").cyan());
    println!("  {}      Forget this page's chats and start over", style("/reset").cyan());
    println!("  {}       End the chat", style("/exit").cyan());
    println!();
}
