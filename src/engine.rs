//! Zone mutation engine.
//!
//! Every operation is one transaction under the engine's named lock:
//!
//! ```text
//! acquire lock -> fetch -> parse -> apply -> (changed?) -> bump serial -> generate -> store -> release
//!                                              |
//!                                              +-- no --> release, "Done unchanged"
//! ```
//!
//! The serial advances by exactly one per transaction that changes at least
//! one record, however many records changed. Transactions run on their own
//! task so that dropping the caller's future never abandons a half-finished
//! fetch/store sequence.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{Result, ZoneError};
use crate::gateway::ZoneGateway;
use crate::lock::{NamedLockGuard, NamedLocks};
use crate::metrics::{self, Operation, Timer, TransactionResult};
use crate::record::{Record, RecordType};
use crate::zonefile::{BindZoneCodec, ZoneCodec, ZoneFile};

/// Mutation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Insert if absent.
    Add,
    /// Remove first match if present.
    Del,
}

impl Action {
    /// Parse an action token, ignoring case.
    pub fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("add") {
            Some(Action::Add)
        } else if token.eq_ignore_ascii_case("del") {
            Some(Action::Del)
        } else {
            None
        }
    }

    fn apply(self, zone: &mut ZoneFile, record: Record) -> bool {
        match self {
            Action::Add => zone.insert(record),
            Action::Del => zone.remove(&record),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Add => f.write_str("add"),
            Action::Del => f.write_str("del"),
        }
    }
}

/// One requested change, as supplied by a caller.
///
/// Fields are optional so that incomplete requests can be reported as an
/// invalid batch rather than failing to deserialize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRequest {
    /// `add` or `del`, any case.
    #[serde(default)]
    pub action: Option<String>,
    /// Owner name; lowercased before use.
    #[serde(default)]
    pub domain: Option<String>,
    /// Record type tag, any case.
    #[serde(default, rename = "type")]
    pub rtype: Option<String>,
    /// Whitespace separated record data.
    #[serde(default)]
    pub value: Option<String>,
}

impl MutationRequest {
    /// Build a complete request.
    pub fn new(action: &str, domain: &str, rtype: &str, value: &str) -> Self {
        Self {
            action: Some(action.to_string()),
            domain: Some(domain.to_string()),
            rtype: Some(rtype.to_string()),
            value: Some(value.to_string()),
        }
    }

    /// Build an `add` request.
    pub fn add(domain: &str, rtype: &str, value: &str) -> Self {
        Self::new("add", domain, rtype, value)
    }

    /// Build a `del` request.
    pub fn del(domain: &str, rtype: &str, value: &str) -> Self {
        Self::new("del", domain, rtype, value)
    }

    /// Check presence of every field and normalize case.
    fn validate(&self) -> Option<ValidRequest> {
        fn present(field: &Option<String>) -> Option<&str> {
            field.as_deref().filter(|v| !v.is_empty())
        }

        Some(ValidRequest {
            action: Action::from_token(present(&self.action)?)?,
            domain: present(&self.domain)?.to_lowercase(),
            rtype: present(&self.rtype)?.to_ascii_uppercase(),
            value: present(&self.value)?.to_string(),
        })
    }
}

#[derive(Debug)]
struct ValidRequest {
    action: Action,
    domain: String,
    rtype: String,
    value: String,
}

impl ValidRequest {
    fn into_change(self) -> Result<(Action, Record)> {
        let rtype = RecordType::from_tag(&self.rtype)?;
        let record = Record::parse_value(rtype, &self.domain, &self.value)?;
        Ok((self.action, record))
    }
}

/// One request or an ordered batch of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModSet {
    /// Requests applied in order.
    Many(Vec<MutationRequest>),
    /// A bare request, treated as a one-element batch.
    One(MutationRequest),
}

impl ModSet {
    /// Requests in application order.
    pub fn into_vec(self) -> Vec<MutationRequest> {
        match self {
            ModSet::One(request) => vec![request],
            ModSet::Many(requests) => requests,
        }
    }
}

impl From<MutationRequest> for ModSet {
    fn from(request: MutationRequest) -> Self {
        ModSet::One(request)
    }
}

impl From<Vec<MutationRequest>> for ModSet {
    fn from(requests: Vec<MutationRequest>) -> Self {
        ModSet::Many(requests)
    }
}

/// Result of a single add or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Record already present (add) or absent (delete); nothing stored.
    Unchanged,
    /// Zone stored with the new serial.
    Updated {
        /// Serial after the change.
        serial: u32,
    },
}

impl fmt::Display for ChangeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeOutcome::Unchanged => f.write_str("Done unchanged"),
            ChangeOutcome::Updated { .. } => f.write_str("Done updated"),
        }
    }
}

/// Result of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// An entry was incomplete or had an unknown action; nothing applied.
    InvalidConfig,
    /// No entry changed the zone; nothing stored.
    Unchanged,
    /// Zone stored with the new serial.
    Updated {
        /// Number of entries that changed the zone.
        changes: usize,
        /// Serial after the batch.
        serial: u32,
        /// Regenerated zone text as stored.
        text: String,
    },
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchOutcome::InvalidConfig => f.write_str("Invalid config"),
            BatchOutcome::Unchanged => f.write_str("Done unchanged"),
            BatchOutcome::Updated { changes, text, .. } => {
                write!(f, "Done updating {} records\n{}", changes, text)
            }
        }
    }
}

/// Zone contents as returned by [`ZoneEngine::show`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneSnapshot {
    /// Parsed zone.
    #[serde(flatten)]
    pub zone: ZoneFile,
    /// Text as fetched.
    pub raw: String,
}

trait TransactionOutcome {
    fn result(&self) -> TransactionResult;
}

impl TransactionOutcome for () {
    fn result(&self) -> TransactionResult {
        TransactionResult::Ok
    }
}

impl TransactionOutcome for ZoneSnapshot {
    fn result(&self) -> TransactionResult {
        TransactionResult::Ok
    }
}

impl TransactionOutcome for ChangeOutcome {
    fn result(&self) -> TransactionResult {
        match self {
            ChangeOutcome::Unchanged => TransactionResult::Unchanged,
            ChangeOutcome::Updated { .. } => TransactionResult::Updated,
        }
    }
}

impl TransactionOutcome for BatchOutcome {
    fn result(&self) -> TransactionResult {
        match self {
            BatchOutcome::InvalidConfig => TransactionResult::InvalidConfig,
            BatchOutcome::Unchanged => TransactionResult::Unchanged,
            BatchOutcome::Updated { .. } => TransactionResult::Updated,
        }
    }
}

/// Serialized read-modify-write access to zones behind a [`ZoneGateway`].
///
/// Cheap to clone; clones share the gateway, codec and lock registry.
#[derive(Clone)]
pub struct ZoneEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    gateway: Arc<dyn ZoneGateway>,
    codec: Arc<dyn ZoneCodec>,
    locks: NamedLocks,
    config: EngineConfig,
}

impl fmt::Debug for ZoneEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoneEngine")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl ZoneEngine {
    /// Create an engine using the BIND codec and the process-wide lock registry.
    pub fn new(config: EngineConfig, gateway: Arc<dyn ZoneGateway>) -> Self {
        Self::with_parts(
            config,
            gateway,
            Arc::new(BindZoneCodec),
            NamedLocks::global().clone(),
        )
    }

    /// Create an engine from explicit parts.
    pub fn with_parts(
        config: EngineConfig,
        gateway: Arc<dyn ZoneGateway>,
        codec: Arc<dyn ZoneCodec>,
        locks: NamedLocks,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                gateway,
                codec,
                locks,
                config,
            }),
        }
    }

    /// Ask the store to reload `zone` without changing it.
    pub async fn resync(&self, zone: &str) -> Result<()> {
        let this = self.clone();
        let zone = zone.to_string();
        self.transaction(Operation::Resync, async move {
            let _guard = this.lock().await?;
            this.inner.gateway.resync(&zone).await?;
            info!(zone = %zone, "zone resynced");
            Ok(())
        })
        .await
    }

    /// Fetch and parse `zone`.
    pub async fn show(&self, zone: &str) -> Result<ZoneSnapshot> {
        let this = self.clone();
        let zone = zone.to_string();
        self.transaction(Operation::Show, async move {
            let _guard = this.lock().await?;
            let (file, raw) = this.fetch(&zone).await?;
            Ok(ZoneSnapshot { zone: file, raw })
        })
        .await
    }

    /// Add one record unless an identical one exists.
    ///
    /// `rtype` may be any case. `domain` is used as given.
    pub async fn add(
        &self,
        zone: &str,
        domain: &str,
        rtype: &str,
        value: &str,
    ) -> Result<ChangeOutcome> {
        self.change(Operation::Add, Action::Add, zone, domain, rtype, value)
            .await
    }

    /// Delete the first record identical to the one described.
    ///
    /// `rtype` may be any case. `domain` is used as given.
    pub async fn delete(
        &self,
        zone: &str,
        domain: &str,
        rtype: &str,
        value: &str,
    ) -> Result<ChangeOutcome> {
        self.change(Operation::Delete, Action::Del, zone, domain, rtype, value)
            .await
    }

    /// Apply a batch of requests with one fetch, at most one serial bump and
    /// at most one store.
    ///
    /// The whole batch is validated before anything is applied: an incomplete
    /// entry or unknown action yields [`BatchOutcome::InvalidConfig`], and a
    /// malformed record value fails the call, in both cases without touching
    /// the zone. An unknown action is rejected rather than skipped, so a typo
    /// in one entry cannot commit the rest of the batch.
    pub async fn apply_set(&self, zone: &str, mods: impl Into<ModSet>) -> Result<BatchOutcome> {
        let requests = mods.into().into_vec();
        let this = self.clone();
        let zone = zone.to_string();

        self.transaction(Operation::ApplySet, async move {
            let mut valid = Vec::with_capacity(requests.len());
            for (index, request) in requests.iter().enumerate() {
                match request.validate() {
                    Some(request) => valid.push(request),
                    None => {
                        warn!(zone = %zone, index, ?request, "rejecting batch with invalid entry");
                        return Ok(BatchOutcome::InvalidConfig);
                    }
                }
            }
            let changes = valid
                .into_iter()
                .map(ValidRequest::into_change)
                .collect::<Result<Vec<_>>>()?;

            let _guard = this.lock().await?;
            let (mut file, _) = this.fetch(&zone).await?;

            let mut changed = 0;
            for (action, record) in changes {
                if action.apply(&mut file, record) {
                    changed += 1;
                }
            }

            if changed == 0 {
                debug!(zone = %zone, "batch produced no changes");
                return Ok(BatchOutcome::Unchanged);
            }

            let (serial, text) = this.commit(&zone, &mut file, changed).await?;
            Ok(BatchOutcome::Updated {
                changes: changed,
                serial,
                text,
            })
        })
        .await
    }

    async fn change(
        &self,
        operation: Operation,
        action: Action,
        zone: &str,
        domain: &str,
        rtype: &str,
        value: &str,
    ) -> Result<ChangeOutcome> {
        let rtype = RecordType::from_tag(&rtype.to_ascii_uppercase())?;
        let record = Record::parse_value(rtype, domain, value)?;
        let this = self.clone();
        let zone = zone.to_string();

        self.transaction(operation, async move {
            let _guard = this.lock().await?;
            let (mut file, _) = this.fetch(&zone).await?;

            let rtype = record.record_type();
            if !action.apply(&mut file, record) {
                debug!(zone = %zone, %action, %rtype, "record change was a no-op");
                return Ok(ChangeOutcome::Unchanged);
            }

            let (serial, _) = this.commit(&zone, &mut file, 1).await?;
            Ok(ChangeOutcome::Updated { serial })
        })
        .await
    }

    /// Run a transaction to completion on its own task and record its outcome.
    async fn transaction<T, F>(&self, operation: Operation, work: F) -> Result<T>
    where
        T: TransactionOutcome + Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let timer = Timer::start();
        let result = match tokio::spawn(work).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(ZoneError::Aborted),
        };

        let outcome = match &result {
            Ok(value) => value.result(),
            Err(_) => TransactionResult::Error,
        };
        metrics::record_transaction(operation, outcome, timer.elapsed());
        result
    }

    async fn lock(&self) -> Result<NamedLockGuard> {
        self.inner
            .locks
            .acquire(&self.inner.config.lock_name, self.inner.config.lock_timeout())
            .await
    }

    async fn fetch(&self, zone: &str) -> Result<(ZoneFile, String)> {
        let raw = self.inner.gateway.fetch(zone).await?;
        let file = self.inner.codec.parse(&raw)?;
        debug!(zone, serial = file.soa.serial, records = file.record_count(), "zone fetched");
        Ok((file, raw))
    }

    /// Bump the serial, regenerate and store. Returns the new serial and text.
    async fn commit(&self, zone: &str, file: &mut ZoneFile, changes: usize) -> Result<(u32, String)> {
        let serial = file.bump_serial();
        let text = self.inner.codec.generate(file);
        self.inner.gateway.store(zone, &text).await?;

        metrics::record_serial(zone, serial);
        metrics::record_records_changed(changes);
        info!(zone, serial, changes, "zone updated");
        Ok((serial, text))
    }
}
