//! In-memory fakes of every port, for tests.
//!
//! Available to this crate's unit tests and to other crates through the
//! `test-utils` feature.

use std::collections::BTreeMap;
use std::future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{
    SecretMetadata, SecretRecord, SecretValue, ServerCategory, ServerDescriptor,
    ServerToggleState,
};
use crate::events::AppEvent;
use crate::ports::{
    AppEventEmitter, CipherError, ConnectivityProbe, GatewayStatus, GatewaySupervisor,
    ProbeCredentials, ProbeOutcome, ReloadError, ReloadReport, RemovalSummary, Repos,
    RepositoryError, SecretCipher, SecretRepository, ServerRepository, ToggleStateRepository,
};

#[derive(Default)]
struct State {
    servers: Vec<ServerDescriptor>,
    secrets: BTreeMap<(String, String), SecretRecord>,
    toggles: BTreeMap<String, ServerToggleState>,
    toggle_writes: usize,
    secret_writes: usize,
    fail_secret_writes_after: Option<usize>,
}

/// One shared in-memory store implementing all three repository ports.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `Repos` backed by this store.
    pub fn repos(self: &Arc<Self>) -> Repos {
        Repos::new(self.clone(), self.clone(), self.clone())
    }

    /// The stored ciphertext for a key.
    pub fn raw_secret(&self, server_id: &str, key: &str) -> Option<Vec<u8>> {
        self.state()
            .secrets
            .get(&(server_id.to_string(), key.to_string()))
            .map(|r| r.encrypted_value.clone())
    }

    /// Store a row without going through the cipher.
    pub fn upsert_secret_raw(&self, server_id: &str, key: &str, value: &[u8]) {
        let now = Utc::now();
        self.state().secrets.insert(
            (server_id.to_string(), key.to_string()),
            SecretRecord {
                server_id: server_id.to_string(),
                key: key.to_string(),
                encrypted_value: value.to_vec(),
                created_at: now,
                updated_at: now,
            },
        );
    }

    /// Number of toggle upserts performed.
    pub fn toggle_writes(&self) -> usize {
        self.state().toggle_writes
    }

    /// Number of successful secret upserts performed.
    pub fn secret_writes(&self) -> usize {
        self.state().secret_writes
    }

    /// Make every secret upsert after the next `n` fail with a storage error.
    pub fn fail_secret_writes_after(&self, n: usize) {
        let mut state = self.state();
        state.fail_secret_writes_after = Some(state.secret_writes + n);
    }

    pub fn heal(&self) {
        self.state().fail_secret_writes_after = None;
    }
}

#[async_trait]
impl ServerRepository for InMemoryStore {
    async fn insert(&self, descriptor: &ServerDescriptor) -> Result<(), RepositoryError> {
        let mut state = self.state();
        if state.servers.iter().any(|s| s.id == descriptor.id) {
            return Err(RepositoryError::AlreadyExists(descriptor.id.clone()));
        }
        state.servers.push(descriptor.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ServerDescriptor>, RepositoryError> {
        Ok(self.state().servers.iter().find(|s| s.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<ServerDescriptor>, RepositoryError> {
        Ok(self.state().servers.clone())
    }

    async fn update_metadata(
        &self,
        id: &str,
        description: &str,
        category: ServerCategory,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state();
        let server = state
            .servers
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        server.description = description.to_string();
        server.category = category;
        Ok(())
    }

    async fn remove_cascade(&self, id: &str) -> Result<RemovalSummary, RepositoryError> {
        let mut state = self.state();
        let before = state.servers.len();
        state.servers.retain(|s| s.id != id);
        if state.servers.len() == before {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        let secrets_before = state.secrets.len();
        state.secrets.retain(|(server_id, _), _| server_id != id);
        let secrets_deleted = (secrets_before - state.secrets.len()) as u64;
        let toggle_deleted = state.toggles.remove(id).is_some();
        Ok(RemovalSummary {
            secrets_deleted,
            toggle_deleted,
        })
    }
}

#[async_trait]
impl SecretRepository for InMemoryStore {
    async fn upsert(
        &self,
        server_id: &str,
        key: &str,
        encrypted_value: Vec<u8>,
    ) -> Result<SecretRecord, RepositoryError> {
        let mut state = self.state();
        if state
            .fail_secret_writes_after
            .is_some_and(|limit| state.secret_writes >= limit)
        {
            return Err(RepositoryError::Storage("database is locked".to_string()));
        }

        let now = Utc::now();
        let created_at = state
            .secrets
            .get(&(server_id.to_string(), key.to_string()))
            .map_or(now, |r| r.created_at);
        let record = SecretRecord {
            server_id: server_id.to_string(),
            key: key.to_string(),
            encrypted_value,
            created_at,
            updated_at: now,
        };
        state
            .secrets
            .insert((server_id.to_string(), key.to_string()), record.clone());
        state.secret_writes += 1;
        Ok(record)
    }

    async fn get(
        &self,
        server_id: &str,
        key: &str,
    ) -> Result<Option<SecretRecord>, RepositoryError> {
        Ok(self
            .state()
            .secrets
            .get(&(server_id.to_string(), key.to_string()))
            .cloned())
    }

    async fn list_for_server(
        &self,
        server_id: &str,
    ) -> Result<Vec<SecretMetadata>, RepositoryError> {
        Ok(self
            .state()
            .secrets
            .values()
            .filter(|r| r.server_id == server_id)
            .map(SecretMetadata::from)
            .collect())
    }

    async fn delete(&self, server_id: &str, key: &str) -> Result<bool, RepositoryError> {
        Ok(self
            .state()
            .secrets
            .remove(&(server_id.to_string(), key.to_string()))
            .is_some())
    }

    async fn delete_for_server(&self, server_id: &str) -> Result<u64, RepositoryError> {
        let mut state = self.state();
        let before = state.secrets.len();
        state.secrets.retain(|(id, _), _| id != server_id);
        Ok((before - state.secrets.len()) as u64)
    }

    async fn server_ids(&self) -> Result<Vec<String>, RepositoryError> {
        let mut ids: Vec<String> = self
            .state()
            .secrets
            .keys()
            .map(|(id, _)| id.clone())
            .collect();
        ids.dedup();
        Ok(ids)
    }
}

#[async_trait]
impl ToggleStateRepository for InMemoryStore {
    async fn get(&self, server_id: &str) -> Result<Option<ServerToggleState>, RepositoryError> {
        Ok(self.state().toggles.get(server_id).cloned())
    }

    async fn list(&self) -> Result<Vec<ServerToggleState>, RepositoryError> {
        Ok(self.state().toggles.values().cloned().collect())
    }

    async fn upsert(
        &self,
        server_id: &str,
        enabled: bool,
    ) -> Result<ServerToggleState, RepositoryError> {
        let mut state = self.state();
        let toggle = ServerToggleState::new(server_id, enabled);
        state.toggles.insert(server_id.to_string(), toggle.clone());
        state.toggle_writes += 1;
        Ok(toggle)
    }

    async fn delete(&self, server_id: &str) -> Result<bool, RepositoryError> {
        Ok(self.state().toggles.remove(server_id).is_some())
    }
}

/// Reversible, clearly-not-secure cipher that tags values with a prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextCipher;

const PLAINTEXT_TAG: &[u8] = b"plain:";

impl SecretCipher for PlaintextCipher {
    fn encrypt(&self, plaintext: &str) -> Result<Vec<u8>, CipherError> {
        let mut out = PLAINTEXT_TAG.to_vec();
        out.extend_from_slice(plaintext.as_bytes());
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<SecretValue, CipherError> {
        let body = ciphertext
            .strip_prefix(PLAINTEXT_TAG)
            .ok_or_else(|| CipherError::Decrypt("missing tag".to_string()))?;
        String::from_utf8(body.to_vec())
            .map(SecretValue::new)
            .map_err(|e| CipherError::Decrypt(e.to_string()))
    }
}

/// Probe returning a fixed outcome and recording what it was asked.
#[derive(Clone)]
pub struct StaticProbe {
    outcome: ProbeOutcome,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<(String, BTreeMap<String, String>)>>>,
}

impl StaticProbe {
    pub fn passing() -> Self {
        Self::returning(ProbeOutcome::ok("Connected"))
    }

    pub fn failing(message: &str) -> Self {
        Self::returning(ProbeOutcome::failed(message))
    }

    /// A probe that never answers within any sane timeout.
    pub fn hanging() -> Self {
        Self {
            delay: Some(Duration::from_secs(3600)),
            ..Self::passing()
        }
    }

    pub fn returning(outcome: ProbeOutcome) -> Self {
        Self {
            outcome,
            delay: None,
            calls: Arc::default(),
        }
    }

    /// Every call as `(server_id, credentials)`.
    pub fn calls(&self) -> Vec<(String, BTreeMap<String, String>)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ConnectivityProbe for StaticProbe {
    async fn probe(&self, server_id: &str, credentials: &ProbeCredentials) -> ProbeOutcome {
        let seen = credentials
            .keys()
            .map(|k| (k.to_string(), credentials.get(k).unwrap_or_default().to_string()))
            .collect();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((server_id.to_string(), seen));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}

/// Supervisor with a scripted reload result.
pub struct ScriptedSupervisor {
    result: Option<Result<ReloadReport, ReloadError>>,
    status: GatewayStatus,
    calls: AtomicUsize,
}

impl ScriptedSupervisor {
    pub fn succeeding(detail: &str) -> Self {
        Self {
            result: Some(Ok(ReloadReport {
                detail: detail.to_string(),
            })),
            status: GatewayStatus::Running,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: ReloadError) -> Self {
        Self {
            result: Some(Err(error)),
            status: GatewayStatus::Stopped,
            calls: AtomicUsize::new(0),
        }
    }

    /// A reload that never completes.
    pub fn hanging() -> Self {
        Self {
            result: None,
            status: GatewayStatus::Unknown,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GatewaySupervisor for ScriptedSupervisor {
    async fn reload(&self) -> Result<ReloadReport, ReloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Some(result) => result.clone(),
            None => future::pending().await,
        }
    }

    async fn status(&self) -> GatewayStatus {
        self.status
    }
}

/// Emitter that keeps every event for later inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingEmitter {
    events: Arc<Mutex<Vec<AppEvent>>>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AppEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AppEventEmitter for RecordingEmitter {
    fn emit(&self, event: AppEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn clone_box(&self) -> Box<dyn AppEventEmitter> {
        Box::new(self.clone())
    }
}
