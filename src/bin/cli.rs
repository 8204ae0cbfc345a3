//! Mycelium CLI
//!
//! Encode, decode and watch protocol messages from the command line.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use mycelium::{Client, ClientEvent, Config, Decoder, Encoder, OutboundMessage, SchemaRegistry, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// Mycelium CLI
#[derive(Parser, Debug)]
#[command(name = "mycelium-cli")]
#[command(about = "CLI for the Mycelium binary message protocol")]
#[command(version)]
struct Args {
    /// Directory holding schemaMap.json and the event schemas
    #[arg(short = 'd', long, default_value = "./schema")]
    schema_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encode a JSON payload and print the envelope as hex
    Encode {
        /// Event name
        #[arg(short, long)]
        event: Option<String>,

        /// Numeric message id
        #[arg(short, long)]
        id: Option<u16>,

        /// Payload as JSON
        #[arg(short, long, default_value = "{}")]
        payload: String,
    },

    /// Decode one hex envelope and print it as JSON
    Decode {
        /// Envelope bytes in hex
        hex: String,
    },

    /// Connect to a server and print every decoded message
    Listen {
        /// Server address (host:port)
        #[arg(short, long, default_value = "127.0.0.1:7777")]
        server: String,

        /// Event to send once connected
        #[arg(short, long)]
        event: Option<String>,

        /// Payload for the initial event, as JSON
        #[arg(short, long, default_value = "{}")]
        payload: String,

        /// Stop after this many messages
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,mycelium=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> mycelium::Result<()> {
    let config = Config::builder().schema_dir(&args.schema_dir).build();
    let registry = Arc::new(SchemaRegistry::load_dir(&config.schema_dir)?);

    match args.command {
        Commands::Encode { event, id, payload } => {
            let message = OutboundMessage {
                event,
                id,
                payload: parse_payload(&payload)?,
            };
            let bytes = Encoder::with_chunk_size(registry, config.chunk_size).encode(&message)?;
            println!("{}", hex::encode(&bytes));
        }

        Commands::Decode { hex: text } => {
            let raw = hex::decode(text.trim())
                .map_err(|e| mycelium::MyceliumError::MalformedMessage(format!("invalid hex: {}", e)))?;
            let message = Decoder::new(registry).decode_message(&raw)?;
            println!("{}", serde_json::to_string_pretty(&message)?);
        }

        Commands::Listen { server, event, payload, count } => {
            let config = Config { server_addr: server, ..config };
            let client = Client::connect(&config, registry)?;

            if let Some(event) = event {
                client.send(&OutboundMessage::event(event, parse_payload(&payload)?))?;
            }

            let mut received = 0;
            for event in client.events().iter() {
                match event {
                    ClientEvent::Message(message) => {
                        println!("{}", serde_json::to_string(&message)?);
                        received += 1;
                        if count.map_or(false, |limit| received >= limit) {
                            break;
                        }
                    }
                    ClientEvent::DecodeFailed(e) => tracing::warn!("Undecodable message: {}", e),
                    ClientEvent::Closed { reason } => {
                        tracing::info!("Connection closed: {}", reason);
                        break;
                    }
                }
            }

            client.shutdown()?;
        }
    }

    Ok(())
}

fn parse_payload(text: &str) -> mycelium::Result<Value> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    Ok(Value::from(json))
}
