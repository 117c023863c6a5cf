use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use widget_core::{HistorySession, MessageId, WidgetConfig};
use widget_engine::{SendOutcome, Surface, Widget, WidgetEvent, WidgetHost};
use widget_state::{HistoryStatus, NoticeKind};

#[derive(Parser)]
#[command(name = "widget-cli")]
#[command(about = "Terminal front end for the chat widget")]
#[command(version)]
struct Cli {
    /// Backend base URL (overrides config and WIDGET_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Tenant client id (overrides config and WIDGET_CLIENT_ID)
    #[arg(long)]
    client_id: Option<String>,

    /// Where the credential pair is persisted
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat (signs in first if needed)
    Chat,
    /// List past sessions
    History {
        /// Show the turns of one session (1-based)
        #[arg(long)]
        open: Option<usize>,
    },
    /// Forget the stored credential
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(
            fmt::layer()
                .with_target(true)
                .with_line_number(true)
                .with_writer(io::stderr),
        )
        .init();

    let mut config = WidgetConfig::load();
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(client_id) = cli.client_id {
        config.client_id = client_id;
    }
    if let Some(storage_dir) = cli.storage_dir {
        config.storage_dir = Some(storage_dir);
    }

    let host = WidgetHost::new();
    let widget = host.init(config).await?;
    tracing::debug!(session_id = %widget.session_id(), "widget mounted");

    let result = match cli.command {
        Commands::Chat => run_interactive_chat(&host, &widget).await,
        Commands::History { open } => show_history(&widget, open).await,
        Commands::Logout => {
            widget.logout().await;
            println!("{}", "Signed out".cyan());
            Ok(())
        }
    };

    host.unmount();
    result
}

/// Labels offered by the latest answer, in display order.
type Shortcuts = Arc<Mutex<Vec<String>>>;

/// Prints widget events as they arrive. Reveals are printed as deltas of
/// the visible prefix.
async fn render_events(mut events: UnboundedReceiver<WidgetEvent>, shortcuts: Shortcuts) {
    let mut revealed: HashMap<MessageId, usize> = HashMap::new();

    while let Some(event) = events.recv().await {
        match event {
            WidgetEvent::MessageAppended(message) if message.is_user() => {}
            WidgetEvent::MessageAppended(message) if message.revealing => {
                shortcuts.lock().clear();
                revealed.insert(message.id, 0);
                print!("{} ", "Bot:".green().bold());
            }
            WidgetEvent::MessageAppended(message) => {
                let labels: Vec<String> = message.shortcuts().map(str::to_string).collect();
                if labels.is_empty() {
                    println!("{} {}", "Bot:".green().bold(), message.text);
                } else {
                    println!("{}", message.text.dimmed());
                    let mut shortcuts = shortcuts.lock();
                    for label in labels {
                        shortcuts.push(label);
                        println!(
                            "  {} {}",
                            format!("[{}]", shortcuts.len()).yellow(),
                            shortcuts[shortcuts.len() - 1]
                        );
                    }
                }
            }
            WidgetEvent::RevealProgress { id, visible } => {
                let printed = revealed.entry(id).or_insert(0);
                if let Some(delta) = visible.get(*printed..) {
                    print!("{}", delta);
                    *printed = visible.len();
                }
            }
            WidgetEvent::RevealCompleted { id } => {
                revealed.remove(&id);
                println!();
            }
            WidgetEvent::TypingIndicator { visible: true } => {
                println!("{}", "Bot is typing...".dimmed());
            }
            WidgetEvent::AuthChanged {
                notice: Some(notice),
                ..
            } => match notice.kind {
                NoticeKind::Error => println!("{}", notice.text.red()),
                NoticeKind::Info => println!("{}", notice.text.yellow()),
            },
            WidgetEvent::SurfaceChanged(Surface::Auth) => {
                println!("{}", "Sign in required".yellow());
            }
            WidgetEvent::HistoryUpdated(status) => print_history_status(&status),
            WidgetEvent::SessionOpened(session) => print_session(&session),
            _ => {}
        }
        let _ = io::stdout().flush();
    }
}

fn print_history_status(status: &HistoryStatus) {
    match status {
        HistoryStatus::Loaded(sessions) => {
            println!("{}", "Chat History".cyan().bold());
            for (index, session) in sessions.iter().enumerate() {
                println!(
                    "  {} {}",
                    format!("[{}]", index + 1).yellow(),
                    session.summary_label()
                );
            }
        }
        HistoryStatus::Failed(_) => {
            if let Some(text) = status.message() {
                println!("{}", text.red());
            }
        }
        other => {
            if let Some(text) = other.message() {
                println!("{}", text.dimmed());
            }
        }
    }
}

fn print_session(session: &HistorySession) {
    println!("{}", session.title().cyan().bold());
    for turn in &session.messages {
        if !turn.query.is_empty() {
            println!("{} {}", "You:".cyan().bold(), turn.query);
        }
        println!("{} {}", "Bot:".green().bold(), turn.response);
        println!("  {}", turn.caption().dimmed());
    }
}

fn prompt(label: &str) -> anyhow::Result<Option<String>> {
    print!("{} ", label.cyan().bold());
    io::stdout().flush()?;
    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

/// Walk the email and code steps until signed in. `false` when stdin
/// closes first.
async fn sign_in(widget: &Widget) -> anyhow::Result<bool> {
    while !widget.auth_state().is_authenticated() {
        if widget.auth_state().shows_otp_step() {
            let Some(code) = prompt("Code (or /resend):")? else {
                return Ok(false);
            };
            if code == "/resend" {
                widget.resend_otp().await;
            } else {
                widget.verify_otp(&code).await;
            }
        } else {
            let Some(email) = prompt("Email:")? else {
                return Ok(false);
            };
            widget.submit_email(&email).await;
        }
    }
    Ok(true)
}

async fn wait_for(outcome: SendOutcome) {
    match outcome {
        SendOutcome::Sent(delivery) => {
            delivery.settled().await;
        }
        SendOutcome::EmptyInput => {}
        SendOutcome::NotAuthenticated => println!("{}", "Sign in first".yellow()),
        SendOutcome::Busy => println!("{}", "Still waiting for the previous reply".yellow()),
        SendOutcome::TornDown => println!("{}", "Widget closed".red()),
    }
}

async fn run_interactive_chat(host: &WidgetHost, widget: &Widget) -> anyhow::Result<()> {
    let shortcuts: Shortcuts = Arc::default();
    let renderer = tokio::spawn(render_events(widget.subscribe(), Arc::clone(&shortcuts)));

    println!("{}", "Chat Widget".cyan().bold());
    println!("{}", format!("Session ID: {}", widget.session_id()).dimmed());
    println!(
        "{}",
        "Commands: /history /open N /back /chat /follow N /logout /quit".dimmed()
    );
    println!();

    widget.open();
    if let Some(welcome) = widget.transcript().first() {
        println!("{} {}", "Bot:".green().bold(), welcome.text);
    }

    loop {
        if !widget.auth_state().is_authenticated() && !sign_in(widget).await? {
            break;
        }
        widget.open();

        let Some(input) = prompt("You:")? else {
            break;
        };
        let (command, argument) = match input.split_once(' ') {
            Some((command, argument)) => (command, argument.trim()),
            None => (input.as_str(), ""),
        };

        match command {
            "/quit" | "/exit" => {
                println!("{}", "Goodbye!".cyan());
                break;
            }
            "/history" => {
                if let Err(e) = widget.show_history().await {
                    println!("{}", format!("Error: {}", e).red());
                }
            }
            "/open" => match argument.parse::<usize>() {
                Ok(n) if n > 0 => {
                    if let Err(e) = widget.select_session(n - 1) {
                        println!("{}", format!("Error: {}", e).red());
                    }
                }
                _ => println!("{}", "Usage: /open N".yellow()),
            },
            "/back" => {
                if let Err(e) = widget.back_to_history().await {
                    println!("{}", format!("Error: {}", e).red());
                }
            }
            "/chat" => {
                if let Err(e) = widget.show_chat() {
                    println!("{}", format!("Error: {}", e).red());
                }
            }
            "/follow" => {
                let label = argument
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|index| shortcuts.lock().get(index).cloned());
                match label {
                    Some(label) => {
                        println!("{} {}", "You:".cyan().bold(), label);
                        if let Some(outcome) = host.send_follow_up(&label).await {
                            wait_for(outcome).await;
                        }
                    }
                    None => println!("{}", "Usage: /follow N".yellow()),
                }
            }
            "/logout" => {
                widget.logout().await;
                println!("{}", "Signed out".cyan());
                break;
            }
            _ => wait_for(widget.send(&input).await).await,
        }
        println!();
    }

    widget.teardown();
    renderer.abort();
    Ok(())
}

async fn show_history(widget: &Widget, open: Option<usize>) -> anyhow::Result<()> {
    if !widget.auth_state().is_authenticated() {
        println!("{}", "Not signed in. Run `widget-cli chat` to sign in.".yellow());
        return Ok(());
    }

    let status = widget.show_history().await?;
    print_history_status(&status);

    if let Some(n) = open {
        let session = widget.select_session(n.saturating_sub(1))?;
        println!();
        print_session(&session);
    }
    Ok(())
}
