/// Playmark - run one listening session against a streaming service
use anyhow::Context;
use clap::{Parser, Subcommand};
use playmark::config::PlaymarkConfig;
use playmark::console::{render_signal, render_status, ConsoleCommand, HELP};
use playmark_core::{Clock, SystemClock, TelemetrySink};
use playmark_policy::{RandomizationPolicy, SessionRandomizer};
use playmark_session::{
    SessionDeps, SessionDriver, SessionError, SessionHandle, SessionSignal, SessionStateMachine,
    SignalSink, TokioClock,
};
use playmark_web_api::{
    find_device, http_client, HttpTelemetrySink, LogTelemetrySink, PlayerPoller, TokenStore,
    WebApiClient, WebApiDevice,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long `start` waits for the poller to report the device
const DEVICE_READY_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Parser)]
#[command(name = "playmark")]
#[command(about = "Randomized listening sessions on a streaming service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one session
    Run {
        /// Configuration file path
        #[arg(short, long, env = "PLAYMARK_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Draw session parameters and print them as JSON
    Draw {
        /// Configuration file path
        #[arg(short, long, env = "PLAYMARK_CONFIG")]
        config: Option<PathBuf>,
        /// Fixed RNG seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Load and validate the configuration
    CheckConfig {
        /// Configuration file path
        #[arg(short, long, env = "PLAYMARK_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr, session output to stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "playmark=info,playmark_session=info,playmark_web_api=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => run(load_config(config)?).await,
        Commands::Draw { config, seed } => draw(&load_config(config)?, seed),
        Commands::CheckConfig { config } => {
            let config = load_config(config)?;
            println!("{}", config.to_toml()?);
            println!("# Configuration OK");
            Ok(())
        }
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<PlaymarkConfig> {
    let config = PlaymarkConfig::load(path.as_deref())?;
    config.validate()?;
    Ok(config)
}

fn draw(config: &PlaymarkConfig, seed: Option<u64>) -> anyhow::Result<()> {
    let mut policy = match seed {
        Some(seed) => RandomizationPolicy::seeded(config.policy.clone(), seed)?,
        None => RandomizationPolicy::from_entropy(config.policy.clone())?,
    };
    let session = policy.session_config(&config.catalog())?;
    println!("{}", serde_json::to_string_pretty(&session)?);
    Ok(())
}

async fn run(config: PlaymarkConfig) -> anyhow::Result<()> {
    tracing::info!(device = %config.device.name, "Starting Playmark");

    let api_config = config.api_config();
    let http = http_client(&api_config)?;
    let tokens = Arc::new(TokenStore::new(http.clone(), &config.auth_config())?);
    let client = Arc::new(WebApiClient::with_http(http.clone(), &api_config, tokens)?);

    let device = find_device(&client, &config.device.name)
        .await?
        .with_context(|| {
            format!(
                "Playback device '{}' not found; open it and try again",
                config.device.name
            )
        })?;
    tracing::info!(device_id = %device.id, "Using playback device");

    let telemetry: Arc<dyn TelemetrySink> = match &config.telemetry.endpoint {
        Some(endpoint) => Arc::new(HttpTelemetrySink::new(http, endpoint)?),
        None => Arc::new(LogTelemetrySink),
    };

    let (signals, mut signal_rx) = SignalSink::channel();
    let deps = SessionDeps {
        api: client.clone(),
        device: Arc::new(WebApiDevice::new(client.clone(), device.id)),
        telemetry,
        clock: Arc::new(TokioClock::starting_at(SystemClock.now_ms())),
    };
    let randomizer = RandomizationPolicy::from_entropy(config.policy.clone())?;
    let machine =
        SessionStateMachine::new(config.catalog(), Box::new(randomizer), deps, signals);

    let (notify_tx, notify_rx) = mpsc::channel(64);
    let (driver, handle) = SessionDriver::new(machine, notify_rx, config.timing());
    let driver_task = driver.spawn();

    let shutdown = CancellationToken::new();
    let poller_task = PlayerPoller::new(
        client,
        config.device.name.clone(),
        config.poll_interval(),
        shutdown.child_token(),
    )
    .spawn(notify_tx);

    let result = match start_when_ready(&handle).await {
        Ok(()) => console_loop(&handle, &mut signal_rx).await,
        Err(e) => {
            // Show whatever the session reported before giving up
            print_pending(&mut signal_rx);
            Err(e)
        }
    };

    shutdown.cancel();
    handle.shutdown().await;
    let _ = tokio::join!(driver_task, poller_task);
    tracing::info!("Playmark stopped");

    result
}

async fn start_when_ready(handle: &SessionHandle) -> anyhow::Result<()> {
    let deadline = tokio::time::Instant::now() + DEVICE_READY_TIMEOUT;
    loop {
        match handle.start().await {
            Ok(_) => return Ok(()),
            Err(SessionError::DeviceNotReady) if tokio::time::Instant::now() < deadline => {
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
            Err(e) => return Err(e).context("Could not start the session"),
        }
    }
}

fn print_pending(signal_rx: &mut mpsc::UnboundedReceiver<SessionSignal>) {
    while let Ok(signal) = signal_rx.try_recv() {
        if let Some(line) = render_signal(&signal) {
            println!("{line}");
        }
    }
}

async fn console_loop(
    handle: &SessionHandle,
    signal_rx: &mut mpsc::UnboundedReceiver<SessionSignal>,
) -> anyhow::Result<()> {
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            signal = signal_rx.recv() => {
                let Some(signal) = signal else { break };
                if let Some(line) = render_signal(&signal) {
                    println!("{line}");
                }
                if let SessionSignal::ReauthRequired { message } = signal {
                    anyhow::bail!("Session ended: {message}");
                }
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    stdin_open = false;
                    continue;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<ConsoleCommand>() {
                    Ok(ConsoleCommand::Quit) => break,
                    Ok(command) => execute(handle, command).await,
                    Err(msg) => println!("{msg}"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

async fn execute(handle: &SessionHandle, command: ConsoleCommand) {
    match command {
        ConsoleCommand::Finish => {
            if let Err(e) = handle.finish_early().await {
                println!("Cannot finish yet: {e}");
            }
        }
        ConsoleCommand::Save => {
            if let Err(e) = handle.save_playlist().await {
                println!("Cannot save: {e}");
            }
        }
        ConsoleCommand::Status => match handle.status().await {
            Ok(status) => println!("{}", render_status(&status)),
            Err(e) => println!("{e}"),
        },
        ConsoleCommand::Help | ConsoleCommand::Quit => println!("{HELP}"),
    }
}
