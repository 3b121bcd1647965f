//! fchat command-line client
//!
//! Connects to a chat server, prints every received message on its own line
//! and runs the input (stdin or `--input`) as a message script:
//!
//! ```text
//! hello everyone        posted as a message
//! cmd:sleep 500         pause for 500 ms
//! cmd:wait-for done     wait until someone says "done"
//! cmd:exit 0            leave with exit code 0
//! ```
//!
//! Once the input is exhausted the client keeps receiving until Ctrl-C.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufRead, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fchat::commands;
use fchat::{MessageWriter, ScriptFlow, ScriptRunner};
use fchat_client::ChatClient;
use fchat_core::config::{self, ClientConfig};

#[derive(Parser)]
#[command(name = "fchat")]
#[command(author, version, about = "Line-oriented chat client with scripted input")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "FCHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all logging except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(flatten)]
    chat: ChatArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Default)]
struct ChatArgs {
    /// Display name announced to the server
    #[arg(short, long, env = "FCHAT_NAME")]
    name: Option<String>,

    /// Server hostname or IP address
    #[arg(long, env = "FCHAT_HOST")]
    host: Option<String>,

    /// Port of the inbound message stream
    #[arg(long, alias = "serverPort")]
    server_port: Option<u16>,

    /// Port of the HTTP endpoint messages are posted to
    #[arg(long, alias = "httpPort")]
    http_port: Option<u16>,

    /// Read the script from this file instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Write received messages to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Get a specific config value (e.g. reconnect.initial)
    Get { key: String },
    /// Write the effective configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity; stdout is reserved for messages
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Some(Commands::Config { action }) => match action {
            ConfigAction::Path => {
                println!("{}", commands::config_path(cli.config.as_deref()).display());
            }
            ConfigAction::Show => {
                let effective = load_effective_config(cli.config.as_deref(), &cli.chat)?;
                print!("{}", commands::config_show(&effective)?);
            }
            ConfigAction::Get { key } => {
                let effective = load_effective_config(cli.config.as_deref(), &cli.chat)?;
                println!("{}", commands::config_get(&effective, &key)?);
            }
            ConfigAction::Init { force } => {
                // The file being created need not exist yet
                let source = cli.config.as_deref().filter(|path| path.exists());
                let effective = load_effective_config(source, &cli.chat)?;
                let path = commands::config_init(cli.config.as_deref(), &effective, force)?;
                eprintln!("Created configuration file: {}", path.display());
            }
        },
        None => {
            let effective = load_effective_config(cli.config.as_deref(), &cli.chat)?;
            let code = run_chat(effective, &cli.chat).await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
    }

    Ok(())
}

/// Config file (explicit path must exist, default path is optional)
/// overlaid with command-line values
fn load_effective_config(config_path: Option<&Path>, args: &ChatArgs) -> Result<ClientConfig> {
    let mut config = match config_path {
        Some(path) => config::load_config::<ClientConfig>(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let default_path = config::default_config_path();
            if default_path.exists() {
                config::load_config(&default_path).unwrap_or_else(|e| {
                    tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
                    ClientConfig::default()
                })
            } else {
                ClientConfig::default()
            }
        }
    };

    if let Some(name) = &args.name {
        config.name = name.clone();
    }
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.server_port {
        config.stream_port = port;
    }
    if let Some(port) = args.http_port {
        config.request_port = port;
    }

    Ok(config)
}

async fn open_input(path: Option<&Path>) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Input file does not exist: {}", path.display());
            }
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Input file is not readable: {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
    }
}

/// Run the script, then keep receiving until interrupted.
///
/// Returns the exit code requested by the script (0 otherwise).
async fn run_chat(config: ClientConfig, args: &ChatArgs) -> Result<i32> {
    let input = open_input(args.input.as_deref()).await?;
    let writer = Arc::new(MessageWriter::open(args.output.as_deref())?);

    tracing::info!(
        "Connecting as '{}' to {} (messages via {})",
        config.name,
        config.stream_address(),
        config.request_url()
    );
    let client = ChatClient::new(config).context("Failed to start chat client")?;
    {
        let writer = Arc::clone(&writer);
        client.set_message_listener(move |msg: &str| writer.write_message(msg));
    }

    let runner = ScriptRunner::new(&client);
    let flow = tokio::select! {
        flow = runner.run(input) => flow,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
            Ok(ScriptFlow::Exit(0))
        }
    };

    let code = match flow {
        Ok(ScriptFlow::Exit(code)) => code,
        Ok(ScriptFlow::Continue) => {
            tracing::info!("Script finished, receiving until interrupted");
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            0
        }
        Err(e) => {
            shutdown(&client, &writer).await;
            return Err(e);
        }
    };

    shutdown(&client, &writer).await;
    Ok(code)
}

async fn shutdown(client: &ChatClient, writer: &MessageWriter) {
    client.close();
    client.join().await;
    if let Err(e) = writer.flush() {
        tracing::warn!("Failed to flush output: {}", e);
    }
}
