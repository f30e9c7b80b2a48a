//! pagechat CLI entry point.
//!
//! Binary name: `pagechat`
//!
//! Parses CLI arguments, sets up tracing, wires the services, then
//! dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;
use pagechat_observe::{TracingOptions, init_tracing, shutdown_tracing};

use cli::{Cli, Commands, KeyAction, SessionAction};
use state::AppState;

/// Default log filter for the given verbosity. RUST_LOG still wins.
fn verbosity_filter(verbose: u8, quiet: bool) -> &'static str {
    match verbose {
        0 if quiet => "error",
        0 => "warn",
        1 => "info,pagechat=debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = TracingOptions::new(verbosity_filter(cli.verbose, cli.quiet));
    if let Err(e) = init_tracing(&options) {
        eprintln!("warning: could not initialize logging: {e}");
    }

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions and the language list don't need app state
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(*shell, &mut cmd, "pagechat", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Languages => return cli::settings::languages(cli.json),
        _ => {}
    }

    let state = AppState::init().await?;
    let json = cli.json;

    match cli.command {
        Commands::Ask {
            url,
            question,
            lang,
            new,
        } => cli::chat::ask(&state, &url, question, lang, new, json).await?,

        Commands::Chat { url, lang, new } => cli::chat::chat(&state, &url, lang, new, json).await?,

        Commands::Key { action } => match action {
            KeyAction::Set { value } => cli::settings::key_set(&state, value, json).await?,
            KeyAction::Clear => cli::settings::key_clear(&state, json).await?,
            KeyAction::Status => cli::settings::key_status(&state, json).await?,
        },

        Commands::Theme { theme } => cli::settings::theme(&state, theme, json).await?,

        Commands::Toggle { url, pin } => cli::settings::toggle(&state, url, pin, json).await?,

        Commands::Sessions { action } => match action {
            SessionAction::List { url } => {
                cli::session::list_sessions(&state, url.as_deref(), json).await?
            }
            SessionAction::Show { id } => cli::session::show_session(&state, &id, json).await?,
            SessionAction::Reset { url } => cli::session::reset_sessions(&state, &url, json).await?,
            SessionAction::Delete { id } => cli::session::delete_session(&state, &id, json).await?,
        },

        Commands::Languages | Commands::Completions { .. } => {}
    }

    Ok(())
}
