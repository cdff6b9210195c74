//! Radium CLI Client
//!
//! Command-line interface for commanding a Radium server.

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use radium::protocol::{EntryExpired, MessageType};
use radium::{Action, Config, Connection, ProtocolRevision, Response, WatchMode};
use tracing_subscriber::{fmt, EnvFilter};

/// Radium CLI
#[derive(Parser, Debug)]
#[command(name = "radium-cli")]
#[command(about = "CLI for the Radium watcher/notifier service")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, default_value = radium::config::DEFAULT_HOST)]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = radium::config::DEFAULT_PORT)]
    port: u16,

    /// Protocol revision spoken by the server
    #[arg(short, long, value_enum, default_value_t = Revision::V2)]
    revision: Revision,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ping the server
    Ping,

    /// Set the watch mode and print pushed notifications until the server closes
    Watch {
        /// The watch mode to set
        #[arg(value_enum)]
        mode: Mode,

        /// Tag to watch (tagged mode, rev. 2)
        #[arg(short, long)]
        tag: Option<u64>,
    },

    /// Add an entry that expires at the given timestamp (rev. 2/3)
    Add {
        /// Expiration timestamp (seconds)
        timestamp: i64,

        /// Entry payload
        data: String,
    },

    /// Remove a previously added entry (rev. 2/3)
    Remove {
        /// Timestamp the entry was added with
        timestamp: i64,

        /// Entry id returned when it was added
        id: u16,
    },

    /// Connect and ask the server to close the connection
    Close,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Revision {
    V1,
    V2,
    V3,
}

impl From<Revision> for ProtocolRevision {
    fn from(revision: Revision) -> Self {
        match revision {
            Revision::V1 => ProtocolRevision::V1,
            Revision::V2 => ProtocolRevision::V2,
            Revision::V3 => ProtocolRevision::V3,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    None,
    All,
    Tagged,
    Watching,
}

impl From<Mode> for WatchMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::None => WatchMode::None,
            Mode::All => WatchMode::All,
            Mode::Tagged => WatchMode::Tagged,
            Mode::Watching => WatchMode::Watching,
        }
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,radium=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> radium::Result<()> {
    let config = Config::builder()
        .host(&args.host)
        .port(args.port)
        .revision(args.revision.into())
        .build();

    tracing::info!("Radium CLI v{}", radium::VERSION);

    let conn = Connection::open(config)?;
    tracing::info!("Connected to {}", conn.config().addr());

    match args.command {
        Commands::Ping => {
            let response = conn.request(Action::Ping)?;
            println!("Received {}", response);
            conn.close()?;
        }
        Commands::Watch { mode, tag } => {
            let pushes = conn.subscribe();
            let action = Action::SetWatchMode {
                mode: mode.into(),
                tag,
            };
            let response = conn.request(action)?;
            println!("Watch mode set: {}", response);

            // The acknowledgement chunk also reached the subscription. A push
            // sent right behind it may share that chunk.
            let _ = pushes.recv();
            let trailing = response.trailing();
            if !trailing.is_empty() {
                print_push(&trailing);
            }

            for chunk in pushes.iter() {
                print_push(&chunk);
            }
            tracing::info!("Server closed the connection");
        }
        Commands::Add { timestamp, data } => {
            let response = conn.request(Action::add_entry(timestamp, data.into_bytes()))?;
            match response.entry_added() {
                Ok(added) => println!("Entry {} added at {}", added.id, added.timestamp),
                Err(_) => print_refusal(&response),
            }
            conn.close()?;
        }
        Commands::Remove { timestamp, id } => {
            let response = conn.request(Action::remove_entry(timestamp, id))?;
            match response.message_type() {
                Ok(MessageType::EntryRemoved) => println!("Entry {} removed", id),
                _ => print_refusal(&response),
            }
            conn.close()?;
        }
        Commands::Close => {
            conn.close()?;
            println!("Closed");
        }
    }

    Ok(())
}

fn print_push(chunk: &[u8]) {
    match EntryExpired::parse(chunk) {
        Ok(entry) => println!(
            "Entry {} expired at {} (tag {}, {} bytes)",
            entry.id,
            entry.timestamp,
            entry.tag,
            entry.data.len()
        ),
        Err(_) => println!("Pushed {:02x?}", chunk),
    }
}

fn print_refusal(response: &Response) {
    match response.error_message() {
        Ok(error) => println!("Server error: {:?}", error.code),
        Err(_) => println!("Unexpected response {}", response),
    }
}
