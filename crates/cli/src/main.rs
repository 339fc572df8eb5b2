use anyhow::Context;
use clap::{Parser, Subcommand};
use dfbridge::config::{self, FileSettings};
use dfbridge::dialogflow::{
    parse_request, Action, Capabilities, Dialogflow, DialogflowRequest, RestConnector,
};
use dfbridge::routing::new_session_id;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "dfbridge")]
#[command(about = "Dialogflow CX bridge CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a template config.json.
    Init {
        /// Config file path (default: DFBRIDGE_CONFIG_PATH or ~/.dfbridge/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Send one utterance to the agent and print the parsed reply as JSON.
    Send {
        /// Config file path (default: DFBRIDGE_CONFIG_PATH or ~/.dfbridge/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Session id (default: a new random id).
        #[arg(long, value_name = "ID")]
        session: Option<String>,

        /// What the user says.
        text: String,
    },

    /// Send a named event to the agent and print the parsed reply as JSON.
    Event {
        /// Config file path (default: DFBRIDGE_CONFIG_PATH or ~/.dfbridge/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Session id (default: a new random id).
        #[arg(long, value_name = "ID")]
        session: Option<String>,

        /// Event name as defined in the agent.
        name: String,
    },

    /// Normalize a saved detectIntent response (file or stdin) and print the parsed reply.
    Parse {
        /// Response JSON file; reads stdin when omitted.
        file: Option<PathBuf>,

        /// Session id to echo back.
        #[arg(long, value_name = "ID", default_value = "")]
        session: String,

        /// Use the base capability set (no cards, no session echo).
        #[arg(long)]
        base: bool,
    },

    /// Chat with the agent interactively.
    Chat {
        /// Config file path (default: DFBRIDGE_CONFIG_PATH or ~/.dfbridge/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Existing session id to continue.
        #[arg(long, value_name = "ID")]
        session: Option<String>,
    },

    /// Run the Telegram bridge (long-poll) until Ctrl+C.
    Telegram {
        /// Config file path (default: DFBRIDGE_CONFIG_PATH or ~/.dfbridge/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Version) => {
            println!("dfbridge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Commands::Init { config }) => run_init(config),
        Some(Commands::Send {
            config,
            session,
            text,
        }) => run_once(config, session, DialogflowRequest::message(text)).await,
        Some(Commands::Event {
            config,
            session,
            name,
        }) => run_once(config, session, DialogflowRequest::event(name)).await,
        Some(Commands::Parse {
            file,
            session,
            base,
        }) => run_parse(file, &session, base),
        Some(Commands::Chat { config, session }) => run_chat(config, session).await,
        Some(Commands::Telegram { config }) => run_telegram(config).await,
        None => {
            println!("Run with --help for usage");
            Ok(())
        }
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(config::default_config_path);
    let dir = dfbridge::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

/// Dispatcher reading settings from the config file on every call.
fn dialogflow_for(config_path: Option<PathBuf>) -> anyhow::Result<Dialogflow> {
    let (config, path) = config::load_config(config_path)?;
    Ok(Dialogflow::new(
        Arc::new(FileSettings::new(Some(path))),
        Arc::new(RestConnector::new()),
        config.dialogflow.capabilities,
    ))
}

async fn run_once(
    config_path: Option<PathBuf>,
    session: Option<String>,
    request: DialogflowRequest,
) -> anyhow::Result<()> {
    let dialogflow = dialogflow_for(config_path)?;
    let session = session.unwrap_or_else(new_session_id);
    let parsed = dialogflow.send_request(&session, &request).await?;
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}

fn run_parse(file: Option<PathBuf>, session: &str, base: bool) -> anyhow::Result<()> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut s = String::new();
            std::io::stdin().read_to_string(&mut s)?;
            s
        }
    };
    let reply: serde_json::Value =
        serde_json::from_str(&raw).context("parsing detectIntent response JSON")?;
    let capabilities = if base {
        Capabilities::base()
    } else {
        Capabilities::extended()
    };
    let parsed = parse_request(&reply, session, capabilities);
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}

async fn run_chat(config_path: Option<PathBuf>, session: Option<String>) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let dialogflow = dialogflow_for(config_path)?;
    let mut current_session = session.unwrap_or_else(new_session_id);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }
        let request = match input.strip_prefix("/event ") {
            Some(name) => DialogflowRequest::event(name.trim()),
            None => DialogflowRequest::message(input),
        };

        match dialogflow.send_request(&current_session, &request).await {
            Ok(parsed) => {
                for item in parsed.messages() {
                    println!("< {}", dfbridge::channels::render_plain(item).trim());
                }
                match parsed.action {
                    Some(Action::LivechatTransfer) => println!("[agent requested a live agent]"),
                    Some(Action::CloseChat) => {
                        println!("[conversation closed; starting a new session]");
                        current_session = new_session_id();
                    }
                    None => {}
                }
            }
            Err(e) => {
                eprintln!("chat error: {}", e);
            }
        }
    }

    Ok(())
}

async fn run_telegram(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (config, path) = config::load_config(config_path)?;
    log::info!("starting telegram bridge with config {}", path.display());
    dfbridge::bridge::run_bridge(config, path).await
}
