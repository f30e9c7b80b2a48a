//! Preference commands: API key, theme, sidebar toggle, languages.

use anyhow::{Context, Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use pagechat_core::message::{SidebarView, Transport};
use pagechat_types::llm::SUPPORTED_LANGUAGES;
use pagechat_types::message::{Message, MessageKind, Scope, TabInfo};
use pagechat_types::settings::Theme;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::state::AppState;

/// Show only the tail of a key.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{tail}", "*".repeat(chars.len() - 4))
}

/// Store the API key, reading it from stdin when no value was given.
pub async fn key_set(state: &AppState, value: Option<String>, json: bool) -> Result<()> {
    let raw = match value {
        Some(v) => v,
        None => {
            if !json {
                eprintln!("  {} Paste your API key and press Enter:", style("?").cyan().bold());
            }
            BufReader::new(tokio::io::stdin())
                .lines()
                .next_line()
                .await?
                .unwrap_or_default()
        }
    };

    let key = SecretString::from(raw.trim().to_string());
    if key.expose_secret().is_empty() {
        bail!("API key cannot be empty");
    }

    state.engine.settings().set_api_key(&key).await?;
    let masked = mask_key(key.expose_secret());

    if json {
        println!("{}", serde_json::json!({ "set": true, "masked": masked }));
    } else {
        println!("  {} API key saved ({masked})", style("ok").green().bold());
    }
    Ok(())
}

pub async fn key_clear(state: &AppState, json: bool) -> Result<()> {
    state.engine.settings().clear_api_key().await?;
    if json {
        println!("{}", serde_json::json!({ "cleared": true }));
    } else {
        println!("  {} API key removed", style("ok").green().bold());
    }
    Ok(())
}

pub async fn key_status(state: &AppState, json: bool) -> Result<()> {
    let key = state.engine.settings().api_key().await?;
    let masked = key.as_ref().map(|k| mask_key(k.expose_secret()));

    if json {
        println!(
            "{}",
            serde_json::json!({ "configured": key.is_some(), "masked": masked })
        );
        return Ok(());
    }

    match masked {
        Some(masked) => println!("  {} API key configured ({masked})", style("ok").green().bold()),
        None => println!(
            "  {} No API key configured. Set one with: {}",
            style("i").blue().bold(),
            style("pagechat key set").yellow()
        ),
    }
    Ok(())
}

/// Show the theme, or store a new one and broadcast it to open tabs.
///
/// The change travels the same path as a theme picked inside a page: the
/// tab sends it to the background context, which fans it out to every
/// active tab.
pub async fn theme(state: &AppState, theme: Option<String>, json: bool) -> Result<()> {
    let Some(raw) = theme else {
        let current = state.engine.settings().theme().await?;
        if json {
            println!("{}", serde_json::json!({ "theme": current }));
        } else {
            println!("  Theme: {}", style(current).cyan());
        }
        return Ok(());
    };

    let theme: Theme = raw.parse().map_err(anyhow::Error::msg)?;
    let tab = state.open_tab(None).await?;

    state.engine.settings().set_theme(theme).await?;
    let ack = state
        .bus
        .send_to(
            Scope::Background,
            &Message::with_payload(MessageKind::ThemeChanged, theme.as_str()),
        )
        .await
        .context("background context did not acknowledge the theme change")?;

    let view = tab.receiver.view();
    state.close_tab(tab);
    tracing::debug!(%theme, %ack, "theme broadcast");

    if json {
        println!(
            "{}",
            serde_json::json!({ "theme": theme, "applied": view.theme == theme })
        );
    } else {
        println!("  {} Theme set to {}", style("ok").green().bold(), style(theme).cyan());
    }
    Ok(())
}

/// Click the toolbar icon on a tab showing `url` and report the sidebar.
pub async fn toggle(
    state: &AppState,
    url: Option<String>,
    pin: Option<bool>,
    json: bool,
) -> Result<()> {
    let settings = state.engine.settings();
    if let Some(pin) = pin {
        settings.set_pinned(pin).await?;
    }

    let tab = state.open_tab(url.clone()).await?;
    let dispatched = state
        .background
        .on_icon_clicked(Some(TabInfo {
            id: Some(tab.id),
            url,
        }))
        .await;
    let view: SidebarView = tab.receiver.view();
    state.close_tab(tab);

    let position = settings.sidebar_position().await?;
    settings.save_sidebar_position(position).await?;
    let pinned = settings.pinned().await?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "dispatched": dispatched,
                "visible": view.visible,
                "theme": view.theme,
                "pinned": pinned,
                "position": position,
            })
        );
    } else {
        let shown = if view.visible { "shown" } else { "hidden" };
        println!(
            "  Sidebar {} ({} theme) at ({}, {}){}",
            style(shown).cyan(),
            view.theme,
            position.x,
            position.y,
            if pinned { ", pinned" } else { "" }
        );
    }
    Ok(())
}

pub fn languages(json: bool) -> Result<()> {
    if json {
        let list: Vec<_> = SUPPORTED_LANGUAGES
            .iter()
            .map(|l| serde_json::json!({ "code": l.code, "name": l.name }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Code").fg(Color::Cyan),
            Cell::new("Language").fg(Color::Cyan),
        ]);
    for lang in SUPPORTED_LANGUAGES {
        table.add_row(vec![Cell::new(lang.code), Cell::new(lang.name)]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}
