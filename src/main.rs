//! Web IRC client: terminal front end
//!
//! Architecture:
//! - Main thread: reads stdin and forwards actions
//! - Printer thread: renders backend events
//! - Backend thread: runs the tokio event loop and the WebSocket
//! - Communication via crossbeam channels

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::Context;
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{error, info};

use web_irc_client::backend::run_backend;
use web_irc_client::buffer::MessageKind;
use web_irc_client::config::{settings_path, Config};
use web_irc_client::logging;
use web_irc_client::notify::Permission;
use web_irc_client::protocol::{BackendAction, GuiEvent};

const META_HELP: &str = ":switch <window>, :close [window], :query <nick>, :up, :down, :tab <text>, :connect, :disconnect, :away, :back, :quit";

fn main() -> anyhow::Result<()> {
    logging::init();

    let path = match std::env::args_os().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => settings_path()?,
    };
    let config = match Config::load(&path) {
        Ok(config) => config,
        Err(e) => {
            error!(code = e.error_code(), path = %path.display(), error = %e, "Fatal configuration error");
            return Err(e)
                .with_context(|| format!("Failed to load configuration from {}", path.display()));
        }
    };
    info!(endpoint = %config.endpoint, channel = %config.channel, "Configuration loaded");

    let (action_tx, action_rx) = unbounded::<BackendAction>();
    let (event_tx, event_rx) = unbounded::<GuiEvent>();

    let backend = thread::Builder::new()
        .name("backend".into())
        .spawn(move || run_backend(config, action_rx, event_tx))
        .context("Failed to spawn backend thread")?;

    let active = Arc::new(Mutex::new(String::new()));
    let printer = {
        let active = Arc::clone(&active);
        let action_tx = action_tx.clone();
        thread::Builder::new()
            .name("printer".into())
            .spawn(move || print_events(event_rx, active, action_tx))
            .context("Failed to spawn printer thread")?
    };

    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let current = active.lock().map(|w| w.clone()).unwrap_or_default();
        match parse_input(&line, &current) {
            Input::Action(action) => {
                if action_tx.send(action).is_err() {
                    break;
                }
            }
            Input::Quit => break,
            Input::Help => println!("{}", META_HELP),
            Input::Nothing => {}
        }
    }

    let _ = action_tx.send(BackendAction::Shutdown);
    drop(action_tx);
    let _ = backend.join();
    let _ = printer.join();
    Ok(())
}

enum Input {
    Action(BackendAction),
    Quit,
    Help,
    Nothing,
}

/// Lines starting with `:` drive the front end; everything else is chat input.
fn parse_input(line: &str, active: &str) -> Input {
    let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
    if line.trim().is_empty() {
        return Input::Nothing;
    }
    let Some(meta) = line.strip_prefix(':') else {
        return Input::Action(BackendAction::SubmitText {
            window: active.to_string(),
            text: line.to_string(),
        });
    };

    if let Some(partial) = meta.strip_prefix("tab ") {
        return Input::Action(BackendAction::CompleteNick(partial.to_string()));
    }

    let mut parts = meta.split_whitespace();
    let keyword = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::to_string);
    match (keyword, arg) {
        ("switch", Some(window)) => Input::Action(BackendAction::SwitchWindow(window)),
        ("close", window) => Input::Action(BackendAction::CloseWindow(
            window.unwrap_or_else(|| active.to_string()),
        )),
        ("query", Some(nick)) => Input::Action(BackendAction::StartPrivate(nick)),
        ("up", _) => Input::Action(BackendAction::HistoryUp(String::new())),
        ("down", _) => Input::Action(BackendAction::HistoryDown),
        ("connect", _) => Input::Action(BackendAction::Connect),
        ("disconnect", _) => Input::Action(BackendAction::Disconnect),
        ("away", _) => Input::Action(BackendAction::SetFocus(false)),
        ("back", _) => Input::Action(BackendAction::SetFocus(true)),
        ("quit", _) => Input::Quit,
        _ => Input::Help,
    }
}

fn print_events(events: Receiver<GuiEvent>, active: Arc<Mutex<String>>, actions: Sender<BackendAction>) {
    let stdout = io::stdout();
    for event in events {
        let mut out = stdout.lock();
        let _ = match event {
            GuiEvent::Status(status) => writeln!(out, "== {}", status),
            GuiEvent::Display(intent) => {
                let msg = &intent.message;
                let time = msg.time_label();
                match msg.kind {
                    MessageKind::System => writeln!(out, "{} [{}] -- {}", time, intent.window, msg.body),
                    MessageKind::Action => {
                        writeln!(out, "{} [{}] * {} {}", time, intent.window, msg.sender, msg.body)
                    }
                    _ => writeln!(out, "{} [{}] <{}> {}", time, intent.window, msg.sender, msg.body),
                }
            }
            GuiEvent::Windows { active: now_active, windows } => {
                if let Ok(mut current) = active.lock() {
                    *current = now_active.clone();
                }
                let tabs: Vec<String> = windows
                    .iter()
                    .map(|w| {
                        let marker = if w.id == now_active { "*" } else { "" };
                        match &w.badge {
                            Some(badge) => format!("{}{}({})", marker, w.id, badge),
                            None => format!("{}{}", marker, w.id),
                        }
                    })
                    .collect();
                writeln!(out, "== windows: {}", tabs.join(" "))
            }
            GuiEvent::Roster(users) => writeln!(out, "== {} users: {}", users.len(), users.join(" ")),
            GuiEvent::Nickname(nick) => writeln!(out, "== you are {}", nick),
            GuiEvent::InputText(text) => writeln!(out, "== input: {}", text),
            GuiEvent::Notify(n) => writeln!(out, "\x07!! {}: {}", n.title, n.body),
            GuiEvent::DismissNotification(_) => Ok(()),
            GuiEvent::RequestFocus => writeln!(out, "== notification opened"),
            GuiEvent::RequestNotificationPermission => {
                // A terminal can always ring the bell
                let _ = actions.send(BackendAction::NotificationPermission(Permission::Granted));
                Ok(())
            }
        };
    }
}
