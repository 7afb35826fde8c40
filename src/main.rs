use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use tripchat::app::App;
use tripchat::config::{Config, Overrides, Settings};
use tripchat::tui::{self, EventHandler, Tui};
use tripchat::{handler, logging, ui, ChatClient, ChatWidget, InputBuffer};

#[derive(Parser)]
#[command(name = "tripchat", version)]
#[command(about = "Chat with a travel and weather assistant from the terminal")]
struct Cli {
    /// Base URL of the assistant service
    #[arg(long, env = "TRIPCHAT_BACKEND_BASE", global = true)]
    backend_base: Option<String>,

    /// Config file (defaults to <config dir>/tripchat/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Give up on a request after this many seconds
    #[arg(long, env = "TRIPCHAT_TIMEOUT_SECS", global = true)]
    timeout_secs: Option<u64>,

    /// Where the interactive client writes its log
    #[arg(long, env = "TRIPCHAT_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and print the reply
    Ask {
        /// Your message
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Check that the assistant service is up
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let settings = config.resolve(Overrides {
        backend_base: cli.backend_base,
        timeout_secs: cli.timeout_secs,
        log_file: cli.log_file,
    })?;

    match cli.command {
        None => run_interactive(settings).await,
        Some(Commands::Ask { message }) => {
            logging::init_stderr()?;
            ask(&settings, &message.join(" ")).await
        }
        Some(Commands::Health) => {
            logging::init_stderr()?;
            health(&settings).await
        }
    }
}

fn build_client(settings: &Settings) -> Result<ChatClient> {
    Ok(match settings.timeout {
        Some(timeout) => ChatClient::with_timeout(&settings.backend_base, timeout)?,
        None => ChatClient::new(&settings.backend_base),
    })
}

async fn run_interactive(settings: Settings) -> Result<()> {
    let _guard = logging::init_file(&settings.log_file)?;
    info!(backend = %settings.backend_base, "starting interactive session");

    let client = build_client(&settings)?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(
        ChatWidget::new(settings.greeting.clone()),
        Arc::new(client),
        events.sender(),
        settings.backend_base.clone(),
    );

    let result = event_loop(&mut terminal, &mut app, &mut events).await;
    tui::restore()?;

    info!(messages = app.widget.messages().len(), "session ended");
    result
}

async fn event_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        if app.take_redraw() {
            terminal.draw(|frame| ui::render(app, frame))?;
        }

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}

/// Same submit path as the TUI, awaited inline. Failures are printed as the
/// `Error: ...` reply, not returned.
async fn ask(settings: &Settings, message: &str) -> Result<()> {
    let client = build_client(settings)?;
    let mut widget = ChatWidget::new(settings.greeting.clone());
    widget.input = InputBuffer::from(message);

    match widget.submit_with(&client).await {
        Some(reply) => {
            if let Some(tool) = &reply.tool {
                info!(tool = %tool, "reply produced by planning tool");
            }
            println!("{}", reply.text);
            Ok(())
        }
        None => bail!("nothing to send: the message is empty"),
    }
}

async fn health(settings: &Settings) -> Result<()> {
    let client = build_client(settings)?;
    let body = client
        .health()
        .await
        .map_err(|e| anyhow!("{} is not healthy: {}", settings.backend_base, e))?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
