//! CLI command definitions using clap derive.
//!
//! The command tree mirrors what the extension exposes to a user: asking
//! about a page, managing the API key and theme, toggling the sidebar, and
//! working with stored chat sessions.

pub mod chat;
pub mod session;
pub mod settings;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Chat with an assistant about the page you are reading.
#[derive(Parser)]
#[command(name = "pagechat", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask one question about a page and print the answer.
    Ask {
        /// Page URL or local file path.
        url: String,

        /// What to ask. Defaults to a pros/cons analysis of the terms.
        question: Option<String>,

        /// Output language code (auto, en, es, fr, ...).
        #[arg(long, short)]
        lang: Option<String>,

        /// Discard earlier conversations for this page first.
        #[arg(long)]
        new: bool,
    },

    /// Interactive conversation about a page.
    Chat {
        /// Page URL or local file path.
        url: String,

        /// Output language code (auto, en, es, fr, ...).
        #[arg(long, short)]
        lang: Option<String>,

        /// Discard earlier conversations for this page first.
        #[arg(long)]
        new: bool,
    },

    /// Manage the generation API key.
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Show or change the sidebar theme.
    Theme {
        /// `light` or `dark`. Omit to show the current theme.
        theme: Option<String>,
    },

    /// Simulate a toolbar icon click on a page tab.
    Toggle {
        /// URL of the focused tab.
        url: Option<String>,

        /// Pin or unpin the sidebar position before toggling.
        #[arg(long)]
        pin: Option<bool>,
    },

    /// Inspect or reset stored chat sessions.
    Sessions {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// List the supported output languages.
    Languages,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum KeyAction {
    /// Store the API key.
    Set {
        /// Key value. Read from GEMINI_API_KEY or stdin when omitted.
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        value: Option<String>,
    },

    /// Remove the stored API key.
    Clear,

    /// Show whether a key is stored.
    Status,
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// List stored sessions, most recent first.
    #[command(alias = "ls")]
    List {
        /// Only sessions for this page.
        #[arg(long)]
        url: Option<String>,
    },

    /// Start over on a page: delete its sessions and open a fresh one.
    Reset {
        /// Page URL or local file path.
        url: String,
    },

    /// Show one session's messages.
    Show {
        /// Session id.
        id: String,
    },

    /// Delete one session.
    Delete {
        /// Session id.
        id: String,
    },
}
