//! zone-edit - Serialized mutation of authoritative BIND zones.
//!
//! This crate reads a zone through a privileged helper, applies idempotent
//! add/delete operations to its records, bumps the SOA serial once per
//! transaction that changed something, and writes the zone back. Every
//! transaction holds one process-wide named lock from fetch to store, so
//! concurrent callers never interleave their reads and writes.
//!
//! ## Features
//!
//! - A, AAAA, NS, CNAME, MX, PTR, TXT, SRV, SPF and CAA records
//! - Idempotent add/delete (structural record equality)
//! - Batches with one fetch, one serial bump and one store
//! - Configurable timeouts for lock acquisition and helper invocation
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           zone-edit                              │
//! │                                                                  │
//! │  caller ──▶ ┌──────────────┐   acquire "named"  ┌─────────────┐  │
//! │             │  ZoneEngine  │───────────────────▶│ NamedLocks  │  │
//! │             └──────┬───────┘                    └─────────────┘  │
//! │                    │ fetch / store / resync                      │
//! │                    ▼                                             │
//! │             ┌──────────────┐  parse / generate  ┌─────────────┐  │
//! │             │ ZoneGateway  │◀──────────────────▶│  ZoneCodec  │  │
//! │             └──────┬───────┘                    └─────────────┘  │
//! │                    │ sudo helper NAMED_GET|NAMED_SET|NAMED_SYNC  │
//! └────────────────────┼─────────────────────────────────────────────┘
//!                      ▼
//!               authoritative zone
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use zone_edit::{Config, HelperGateway, ZoneEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let gateway = Arc::new(HelperGateway::new(&config.gateway)?);
//!     let engine = ZoneEngine::new(config.engine, gateway);
//!
//!     let outcome = engine.add("example.com", "www", "A", "10.0.0.5").await?;
//!     println!("{}", outcome); // "Done updated"
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod lock;
pub mod metrics;
pub mod record;
pub mod telemetry;
pub mod zonefile;

// Re-export main types
pub use config::{Config, EngineConfig, GatewayConfig, TelemetryConfig};
pub use engine::{
    Action, BatchOutcome, ChangeOutcome, ModSet, MutationRequest, ZoneEngine, ZoneSnapshot,
};
pub use error::ZoneError;
pub use gateway::{GatewayError, HelperGateway, MemoryGateway, ZoneGateway};
pub use lock::NamedLocks;
pub use record::{Record, RecordType};
pub use zonefile::{BindZoneCodec, Soa, ZoneCodec, ZoneFile};
