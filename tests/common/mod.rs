//! Shared test infrastructure for engine integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use zone_edit::config::{EngineConfig, GatewayConfig};
use zone_edit::{BindZoneCodec, MemoryGateway, NamedLocks, ZoneCodec, ZoneEngine, ZoneFile};

// --- Constants ---

pub const ZONE: &str = "example.com";
pub const BASE_SERIAL: u32 = 10;

// --- Zone text ---

/// A small zone with one NS record and the given serial.
pub fn zone_text(serial: u32) -> String {
    format!(
        "$ORIGIN example.com.\n\
         $TTL 3600\n\
         @ IN SOA ns1.example.com. hostmaster.example.com. (\n\
         \t{} ; serial\n\
         \t3600 600 604800 60 )\n\
         @ IN NS ns1.example.com.\n",
        serial
    )
}

/// Parse the zone currently held by the gateway.
pub fn stored_zone(gateway: &MemoryGateway) -> ZoneFile {
    let text = gateway.zone_text(ZONE).expect("zone missing from gateway");
    BindZoneCodec.parse(&text).expect("stored zone does not parse")
}

// --- Engine builders ---

/// Engine over an in-memory gateway seeded with [`zone_text`], using its own
/// lock registry so tests do not contend with each other.
pub struct TestEngine {
    pub engine: ZoneEngine,
    pub gateway: Arc<MemoryGateway>,
    pub locks: NamedLocks,
}

impl TestEngine {
    pub fn new() -> Self {
        Self::with_gateway(MemoryGateway::new(), EngineConfig::default())
    }

    /// Widen the fetch-to-store window so unserialized transactions would race.
    pub fn with_fetch_delay(delay: Duration) -> Self {
        Self::with_gateway(
            MemoryGateway::new().with_fetch_delay(delay),
            EngineConfig::default(),
        )
    }

    pub fn with_gateway(gateway: MemoryGateway, config: EngineConfig) -> Self {
        gateway.put_zone(ZONE, zone_text(BASE_SERIAL));
        let gateway = Arc::new(gateway);
        let locks = NamedLocks::new();
        let engine = ZoneEngine::with_parts(
            config,
            gateway.clone(),
            Arc::new(BindZoneCodec),
            locks.clone(),
        );
        Self {
            engine,
            gateway,
            locks,
        }
    }

    pub fn stored(&self) -> ZoneFile {
        stored_zone(&self.gateway)
    }
}

// --- Helper script ---

/// Directory layout for a fake privileged helper: zones live in `store/`,
/// the engine stages through `work/named`, and every call is appended to
/// `calls.log`.
pub struct FakeHelper {
    pub dir: tempfile::TempDir,
}

impl FakeHelper {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        std::fs::create_dir_all(dir.path().join("store")).unwrap();
        std::fs::create_dir_all(dir.path().join("work")).unwrap();

        let root = dir.path().display().to_string();
        let script = format!(
            r#"root={root}
echo "$1 $2" >> "$root/calls.log"
case "$1" in
  NAMED_GET)  [ -f "$root/store/$2" ] || {{ echo "zone $2 not found" >&2; exit 2; }}
              cp "$root/store/$2" "$root/work/named" ;;
  NAMED_SET)  cp "$root/work/named" "$root/store/$2" ;;
  NAMED_SYNC) [ -f "$root/store/$2" ] || {{ echo "zone $2 not found" >&2; exit 2; }} ;;
  *) echo "unknown verb $1" >&2; exit 64 ;;
esac
"#
        );
        std::fs::write(dir.path().join("helper.sh"), script).unwrap();

        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            helper: vec![
                "sh".to_string(),
                self.root().join("helper.sh").display().to_string(),
            ],
            working_file: self.root().join("work").join("named"),
            helper_timeout_secs: 10,
        }
    }

    pub fn zone_path(&self, zone: &str) -> PathBuf {
        self.root().join("store").join(zone)
    }

    pub fn put_zone(&self, zone: &str, text: &str) {
        std::fs::write(self.zone_path(zone), text).unwrap();
    }

    pub fn zone_text(&self, zone: &str) -> String {
        std::fs::read_to_string(self.zone_path(zone)).unwrap()
    }

    /// Helper invocations so far, one `"VERB zone"` per entry.
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.root().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }
}
