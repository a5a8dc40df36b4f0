//! AquaLogic command-line shell.
//!
//! Connects to the controller, prints every change it reports, and toggles
//! equipment by name.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ Cli::parse() + load_config() -- flags, config file, or defaults
//!  └─ build transport           -- tcp | serial | file
//!  └─ tokio::spawn(process)     -- reader loop, logs each ChangeSet
//!  └─ stdin loop
//!       ├─ <STATE NAME>          -> set_state(state, !get_state(state))
//!       ├─ key <KEY NAME>        -> send_key(key)
//!       ├─ status                -> print states and readings
//!       └─ quit                  -> close() and wait for the reader
//! ```
//!
//! Command-line flags override the matching config file entries.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use aqualogic_client::application::engine::{AquaLogic, AquaLogicHandle, EngineConfig};
use aqualogic_client::infrastructure::storage::config::{load_config, AppConfig, TransportKind};
use aqualogic_client::infrastructure::transport::{ByteStream, FileStream, TcpByteStream};
use aqualogic_core::{Key, State};

/// Interactive shell for AquaLogic pool and spa controllers.
#[derive(Debug, Parser)]
#[command(name = "aqualogic", version)]
struct Cli {
    /// Path to the TOML config file (defaults to the platform config dir).
    #[arg(long, env = "AQUALOGIC_CONFIG")]
    config: Option<PathBuf>,

    /// Host of the serial-to-TCP bridge.
    #[arg(long, env = "AQUALOGIC_HOST")]
    host: Option<String>,

    #[arg(long, env = "AQUALOGIC_PORT")]
    port: Option<u16>,

    /// Replay a capture file instead of connecting.
    #[arg(long, conflicts_with_all = ["host", "port"])]
    replay: Option<PathBuf>,
}

impl Cli {
    fn apply(self, config: &mut AppConfig) {
        if let Some(host) = self.host {
            config.connection.host = host;
        }
        if let Some(port) = self.port {
            config.connection.port = port;
        }
        if let Some(path) = self.replay {
            config.connection.transport = TransportKind::File;
            config.connection.replay_file = Some(path);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref()).context("loading configuration")?;
    cli.apply(&mut config);

    // RUST_LOG wins over the configured level.
    let level = config.logging.level.clone();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    info!("AquaLogic shell starting");

    let engine_config = EngineConfig::from(&config.engine);
    match config.connection.transport {
        TransportKind::Tcp => {
            let transport = TcpByteStream::new(&config.connection.host, config.connection.port);
            run(transport, engine_config).await
        }
        TransportKind::File => {
            let Some(path) = config.connection.replay_file.clone() else {
                bail!("transport \"file\" needs connection.replay_file");
            };
            run(FileStream::new(path), engine_config).await
        }
        TransportKind::Serial => run_serial(&config, engine_config).await,
    }
}

#[cfg(feature = "serial")]
async fn run_serial(config: &AppConfig, engine_config: EngineConfig) -> anyhow::Result<()> {
    use aqualogic_client::infrastructure::transport::SerialByteStream;

    let transport = SerialByteStream::new(config.connection.serial_port.clone());
    run(transport, engine_config).await
}

#[cfg(not(feature = "serial"))]
async fn run_serial(config: &AppConfig, _engine_config: EngineConfig) -> anyhow::Result<()> {
    bail!(
        "cannot open {}: built without the `serial` feature",
        config.connection.serial_port
    )
}

async fn run<T>(transport: T, config: EngineConfig) -> anyhow::Result<()>
where
    T: ByteStream + 'static,
{
    let mut engine = AquaLogic::connect_with(transport, config)
        .await
        .context("connecting to controller")?;
    let handle = engine.handle();

    let mut reader = tokio::spawn(async move {
        engine
            .process(|changes| {
                for change in changes {
                    info!("{:?}: {} -> {}", change.field, change.old, change.new);
                }
            })
            .await
    });

    println!("Type a state name to toggle it (e.g. LIGHTS), `key <NAME>`, `status`, or `quit`.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                if !handle_command(&handle, line.trim()) {
                    break;
                }
            }
            finished = &mut reader => {
                // The reader stopped on its own: end of stream, timeout, or error.
                finished.context("reader task panicked")??;
                info!("controller stream ended");
                return Ok(());
            }
        }
    }

    handle.close();
    match reader.await.context("reader task panicked")? {
        Ok(()) => info!("disconnected"),
        Err(e) => error!("reader stopped with error: {e}"),
    }
    Ok(())
}

/// Runs one shell command.  Returns `false` when the shell should exit.
fn handle_command(handle: &AquaLogicHandle, line: &str) -> bool {
    match line.split_whitespace().collect::<Vec<_>>().as_slice() {
        [] => {}
        ["quit" | "exit"] => return false,
        ["status"] => print_status(handle),
        ["key", name] => match name.parse::<Key>() {
            Ok(key) => {
                let id = handle.send_key(key);
                println!("queued {key} ({id})");
            }
            Err(e) => println!("{e}"),
        },
        [name] => match name.parse::<State>() {
            Ok(state) => {
                let target = !handle.get_state(state);
                if handle.set_state(state, target) {
                    println!("{state} -> {}", if target { "on" } else { "off" });
                } else {
                    println!("{state} cannot be set from the remote");
                }
            }
            Err(e) => println!("{e}"),
        },
        _ => println!("unrecognised command: {line}"),
    }
    true
}

fn print_status(handle: &AquaLogicHandle) {
    let snapshot = handle.snapshot();
    let states: Vec<&str> = handle.get_states().into_iter().map(State::name).collect();

    println!("Status:      {}", handle.status());
    println!("States:      [{}]", states.join(", "));
    println!("Air temp:    {:?}", snapshot.air_temp);
    println!("Pool temp:   {:?}", snapshot.pool_temp);
    println!("Spa temp:    {:?}", snapshot.spa_temp);
    println!("Salt level:  {:?}", snapshot.salt_level);
    println!("Pump speed:  {:?}", snapshot.pump_speed);
    println!("Pump power:  {:?}", snapshot.pump_power);
    println!("Pending:     {}", handle.is_attempting_request());
}
