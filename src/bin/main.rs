//! zone-edit binary entry point.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, error};
use zone_edit::{telemetry, Config, HelperGateway, ModSet, ZoneEngine};

/// Edit authoritative BIND zones through the privileged zone helper.
#[derive(Parser, Debug)]
#[command(name = "zone-edit")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML). Missing file means defaults.
    #[arg(short, long, default_value = "zone-edit.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the zone.
    Show {
        /// Zone identifier.
        zone: String,
        /// Print the parsed zone as JSON instead of the raw text.
        #[arg(long)]
        json: bool,
    },
    /// Add a record unless it already exists.
    Add {
        /// Zone identifier.
        zone: String,
        /// Owner name.
        domain: String,
        /// Record type (A, AAAA, NS, CNAME, MX, PTR, TXT, SRV, SPF, CAA).
        rtype: String,
        /// Record data, e.g. `10 mail.example.com.` for MX.
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Delete a record if it exists.
    Del {
        /// Zone identifier.
        zone: String,
        /// Owner name.
        domain: String,
        /// Record type.
        rtype: String,
        /// Record data.
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Apply a JSON batch (one object or an array) from a file or stdin.
    Set {
        /// Zone identifier.
        zone: String,
        /// Batch file; reads stdin when omitted.
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Reload the zone without changing it.
    Resync {
        /// Zone identifier.
        zone: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let config: Config = config::Config::builder()
        .add_source(config::File::from(args.config.clone()).required(false))
        .add_source(
            config::Environment::with_prefix("ZONE_EDIT")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    // Initialize telemetry
    telemetry::init(&config.telemetry).map_err(|e| e as Box<dyn std::error::Error>)?;

    debug!(
        config_file = %args.config.display(),
        lock_name = %config.engine.lock_name,
        working_file = %config.gateway.working_file.display(),
        "Starting zone-edit"
    );

    let gateway = Arc::new(HelperGateway::new(&config.gateway)?);
    let engine = ZoneEngine::new(config.engine, gateway);

    let result = run(&engine, args.command).await;
    if let Err(e) = &result {
        error!("zone-edit failed: {}", e);
    }
    result
}

async fn run(engine: &ZoneEngine, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Show { zone, json } => {
            let snapshot = engine.show(&zone).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print!("{}", snapshot.raw);
            }
        }
        Command::Add {
            zone,
            domain,
            rtype,
            value,
        } => {
            let outcome = engine.add(&zone, &domain, &rtype, &value.join(" ")).await?;
            println!("{}", outcome);
        }
        Command::Del {
            zone,
            domain,
            rtype,
            value,
        } => {
            let outcome = engine
                .delete(&zone, &domain, &rtype, &value.join(" "))
                .await?;
            println!("{}", outcome);
        }
        Command::Set { zone, file } => {
            let input = match file {
                Some(path) => tokio::fs::read_to_string(path).await?,
                None => {
                    let mut buf = String::new();
                    tokio::io::stdin().read_to_string(&mut buf).await?;
                    buf
                }
            };
            let mods: ModSet = serde_json::from_str(&input)?;
            let outcome = engine.apply_set(&zone, mods).await?;
            println!("{}", outcome);
        }
        Command::Resync { zone } => {
            engine.resync(&zone).await?;
            println!("Done");
        }
    }
    Ok(())
}
