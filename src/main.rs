use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal;
use slu_client::{list_input_devices, Config, ResponseSink, SessionConfig, SessionController};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "slu-client",
    about = "Stream microphone audio to a spoken language understanding service"
)]
struct Args {
    /// Config file (without extension)
    #[arg(long, default_value = "config/slu-client")]
    config: String,

    /// Server URL, overriding the config file
    #[arg(long)]
    server: Option<String>,

    /// Application id, overriding the config file
    #[arg(long)]
    app_id: Option<String>,

    /// Recognition language, e.g. en-US
    #[arg(long)]
    language: Option<String>,

    /// Input device name; the host default when unset
    #[arg(long)]
    device: Option<String>,

    /// List input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Verbose lifecycle logging
    #[arg(long)]
    debug: bool,
}

enum Command {
    Toggle,
    Quit,
}

/// Prints every response as one line of JSON, untouched.
struct StdoutSink;

#[async_trait]
impl ResponseSink for StdoutSink {
    async fn on_response(&self, message: serde_json::Value) {
        // Raw mode is active while the key loop runs, so end lines explicitly.
        print!("{}\r\n", message);
        std::io::Write::flush(&mut std::io::stdout()).ok();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug {
        "slu_client=debug,info"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if args.list_devices {
        for name in list_input_devices()? {
            println!("{}", name);
        }
        return Ok(());
    }

    let file = Config::load(&args.config)
        .with_context(|| format!("failed to load config '{}'", args.config))?;
    info!("{} starting", file.service.name);

    let session_config = SessionConfig {
        server_url: args.server.unwrap_or(file.stream.server_url),
        app_id: args.app_id.unwrap_or(file.stream.app_id),
        language_code: args.language.or(file.stream.language_code),
        input_device: args.device.or(file.audio.input_device),
        sample_rate: file.audio.sample_rate,
        channels: file.audio.channels,
        require_tls: file.stream.require_tls,
        ..SessionConfig::default()
    };
    anyhow::ensure!(
        !session_config.app_id.is_empty(),
        "an app id is required (--app-id or the config file)"
    );

    let controller = SessionController::connect(session_config, Arc::new(StdoutSink))
        .await
        .context("failed to connect")?;

    println!("Press 'space' to toggle recording, 'q' to quit");

    let (command_tx, mut command_rx) = mpsc::channel(8);
    let key_task = tokio::task::spawn_blocking(move || run_key_loop(command_tx));

    while let Some(command) = command_rx.recv().await {
        match command {
            Command::Toggle => {
                if let Err(e) = controller.toggle().await {
                    error!("toggle failed: {}", e);
                    break;
                }
            }
            Command::Quit => break,
        }
    }
    drop(command_rx);

    let stats = controller.stats();
    controller.shutdown().await?;

    match key_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("key loop error: {}", e),
        Err(e) => warn!("key loop panicked: {}", e),
    }

    println!(
        "session summary: {} frames sent across {} segments in {:.1}s",
        stats.frames_sent, stats.segments_completed, stats.duration_secs
    );
    Ok(())
}

fn run_key_loop(commands: mpsc::Sender<Command>) -> Result<()> {
    terminal::enable_raw_mode()?;
    let result = read_keys(&commands);
    terminal::disable_raw_mode()?;
    result
}

fn read_keys(commands: &mpsc::Sender<Command>) -> Result<()> {
    loop {
        if commands.is_closed() {
            return Ok(());
        }
        if !event::poll(Duration::from_millis(200))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char(' ') => {
                    if commands.blocking_send(Command::Toggle).is_err() {
                        return Ok(());
                    }
                }
                KeyCode::Char('q') => {
                    let _ = commands.blocking_send(Command::Quit);
                    return Ok(());
                }
                _ => {}
            }
        }
    }
}
