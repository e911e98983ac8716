//! The ledger gateway: the only component that talks to the remote ledger.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use stamplink_canonical::{phone, MemberId, RequestKey};
use stamplink_core::{now_millis, CheckpointConfig, Member, StampEvent};
use tracing::{debug, info, warn};

use crate::cache::{Lookup, SingleFlightCache};
use crate::envelope::{to_value, Envelope, Rejection};
use crate::error::LedgerError;
use crate::traits::{LedgerRequest, LedgerTransport, UpdatePublisher};

/// How long a fetched checkpoint configuration is served without revalidating.
pub const DEFAULT_CONFIG_TTL: Duration = Duration::from_secs(30 * 60);

/// Tuning for [`LedgerGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOptions {
    /// Extra attempts for a stamp unit rejected as busy.
    pub busy_retries: u32,
    /// Fixed wait between busy retries.
    pub busy_backoff: Duration,
    /// Freshness window for the checkpoint configuration.
    pub config_ttl: Duration,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            busy_retries: 2,
            busy_backoff: Duration::from_millis(250),
            config_ttl: DEFAULT_CONFIG_TTL,
        }
    }
}

/// Result of a multi-unit increment.
#[derive(Debug, Clone, PartialEq)]
pub struct IncrementOutcome {
    /// Authoritative member record after the last applied unit.
    pub member: Member,
    /// Units requested.
    pub requested: u32,
    /// Units the ledger accepted.
    pub applied: u32,
    /// Why the loop stopped early, if it did.
    pub stopped_by: Option<LedgerError>,
}

impl IncrementOutcome {
    /// Returns true if fewer units were applied than requested.
    pub fn is_partial(&self) -> bool {
        self.applied < self.requested
    }
}

/// Registration details for a new member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Phone number as typed.
    pub phone: String,
    /// Postal address.
    pub address: String,
    /// Birth date, `YYYY-MM-DD`. Doubles as the login secret.
    pub birth_date: String,
}

/// Typed facade over a [`LedgerTransport`].
///
/// Identical concurrent reads share one request. Stamp increments are
/// issued one unit at a time so the ledger's cap check applies to each.
pub struct LedgerGateway {
    transport: Arc<dyn LedgerTransport>,
    reads: SingleFlightCache<RequestKey, Envelope, LedgerError>,
    config: SingleFlightCache<RequestKey, CheckpointConfig, LedgerError>,
    publisher: Option<Arc<dyn UpdatePublisher>>,
    options: GatewayOptions,
}

impl LedgerGateway {
    /// Creates a gateway over `transport`.
    pub fn new(transport: Arc<dyn LedgerTransport>, options: GatewayOptions) -> Self {
        Self {
            transport,
            reads: SingleFlightCache::new(),
            config: SingleFlightCache::new(),
            publisher: None,
            options,
        }
    }

    /// Sets the publisher told about every committed mutation.
    pub fn with_publisher(mut self, publisher: Arc<dyn UpdatePublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Options in effect.
    pub fn options(&self) -> &GatewayOptions {
        &self.options
    }

    /// Number of ledger reads actually issued (after de-duplication).
    pub fn read_count(&self) -> usize {
        self.reads.fetch_count() + self.config.fetch_count()
    }

    async fn read(
        &self,
        request: LedgerRequest,
        fallback: Rejection,
    ) -> Result<Envelope, LedgerError> {
        let key = request.key()?;
        let transport = Arc::clone(&self.transport);
        self.reads
            .share(key, move || async move {
                let envelope = transport.call(request).await?;
                envelope.check(fallback)
            })
            .await
    }

    async fn write(
        &self,
        request: LedgerRequest,
        fallback: Rejection,
    ) -> Result<Envelope, LedgerError> {
        self.transport.call(request).await?.check(fallback)
    }

    /// Fetches one member.
    pub async fn get_member(&self, id: &MemberId) -> Result<Member, LedgerError> {
        let request = LedgerRequest::read("getUser").param("id", id.as_str());
        self.read(request, Rejection::NotFound).await?.member()
    }

    /// Fetches every member. An empty ledger is an empty list.
    pub async fn get_all(&self) -> Result<Vec<Member>, LedgerError> {
        let key = LedgerRequest::read("getAll").key()?;
        let transport = Arc::clone(&self.transport);
        let envelope = self
            .reads
            .share(key, move || async move {
                let envelope = transport.call(LedgerRequest::read("getAll")).await?;
                // `getAll` answers with a bare `users` list and no `success` flag.
                if envelope.fatal || envelope.error.is_some() {
                    envelope.check(Rejection::Rejected)
                } else {
                    Ok(envelope)
                }
            })
            .await?;
        envelope.members()
    }

    /// Fetches the event history of one member.
    pub async fn get_history(&self, id: &MemberId) -> Result<Vec<StampEvent>, LedgerError> {
        let request = LedgerRequest::read("getHistory").param("userId", id.as_str());
        self.read(request, Rejection::NotFound).await?.history()
    }

    async fn add_one(&self, id: &MemberId) -> Result<Member, LedgerError> {
        let request = LedgerRequest::write("addStamp", json!({ "userId": id.as_str() }));
        self.write(request, Rejection::CapReached).await?.member()
    }

    /// Adds `count` stamps, one ledger mutation per unit.
    ///
    /// A unit rejected as busy is retried up to `busy_retries` times. Any
    /// other failure stops the loop; units already applied stay applied and
    /// no further units are attempted. If no unit was applied the failure is
    /// returned as the error.
    pub async fn increment_stamps(
        &self,
        id: &MemberId,
        count: u32,
    ) -> Result<IncrementOutcome, LedgerError> {
        if count == 0 {
            return Err(LedgerError::InvalidRequest(
                "stamp count must be at least 1".to_string(),
            ));
        }

        let mut applied = 0;
        let mut last: Option<Member> = None;
        let mut stopped_by = None;

        'units: for unit in 0..count {
            let mut attempt = 0;
            loop {
                match self.add_one(id).await {
                    Ok(member) => {
                        applied += 1;
                        self.after_mutation(id);
                        last = Some(member);
                        break;
                    }
                    Err(err) if err.is_retryable() && attempt < self.options.busy_retries => {
                        attempt += 1;
                        warn!(member = %id, unit, attempt, "ledger busy, retrying stamp");
                        tokio::time::sleep(self.options.busy_backoff).await;
                    }
                    Err(err) => {
                        debug!(member = %id, unit, error = %err, "stamp loop stopped");
                        stopped_by = Some(err);
                        break 'units;
                    }
                }
            }
        }

        match last {
            Some(member) => {
                info!(member = %id, requested = count, applied, "stamps committed");
                Ok(IncrementOutcome {
                    member,
                    requested: count,
                    applied,
                    stopped_by,
                })
            }
            None => Err(stopped_by.unwrap_or_else(|| {
                LedgerError::Rejected("no stamp was applied".to_string())
            })),
        }
    }

    fn after_mutation(&self, id: &MemberId) {
        for request in [
            LedgerRequest::read("getUser").param("id", id.as_str()),
            LedgerRequest::read("getHistory").param("userId", id.as_str()),
            LedgerRequest::read("getAll"),
        ] {
            if let Ok(key) = request.key() {
                self.reads.invalidate(&key);
            }
        }
        if let Some(publisher) = &self.publisher {
            publisher.ledger_updated(id);
        }
    }

    fn config_fetcher(
        &self,
    ) -> impl FnOnce() -> futures::future::BoxFuture<'static, Result<CheckpointConfig, LedgerError>>
    {
        use futures::FutureExt;

        let transport = Arc::clone(&self.transport);
        move || {
            async move {
                let envelope = transport
                    .call(LedgerRequest::read("getCheckpointConfig"))
                    .await?
                    .check(Rejection::Rejected)?;
                let config = envelope.checkpoint_config()?;
                config.validate()?;
                Ok(config.normalized())
            }
            .boxed()
        }
    }

    fn config_key() -> Result<RequestKey, LedgerError> {
        Ok(RequestKey::action_only("getCheckpointConfig")?)
    }

    /// Returns the checkpoint configuration without waiting on the ledger.
    ///
    /// Serves the cached value (or the built-in default on a cold cache) and
    /// refreshes it in the background once it is older than `config_ttl`.
    pub fn get_config(&self) -> Result<Lookup<CheckpointConfig>, LedgerError> {
        Ok(self.config.get(
            Self::config_key()?,
            self.options.config_ttl,
            CheckpointConfig::default(),
            self.config_fetcher(),
        ))
    }

    /// Fetches the checkpoint configuration from the ledger and caches it.
    pub async fn fetch_config(&self) -> Result<CheckpointConfig, LedgerError> {
        self.config
            .fetch(Self::config_key()?, self.config_fetcher())
            .await
    }

    /// Validates and stores a checkpoint configuration.
    ///
    /// An invalid configuration never reaches the ledger.
    pub async fn save_config(&self, config: &CheckpointConfig) -> Result<(), LedgerError> {
        config.validate()?;
        let config = config.normalized();
        let request = LedgerRequest::write("saveCheckpointConfig", to_value(&config)?);
        self.write(request, Rejection::Rejected).await?;
        self.config.prime(Self::config_key()?, config);
        info!("checkpoint configuration saved");
        Ok(())
    }

    /// Registers a new member.
    pub async fn register(&self, registration: &Registration) -> Result<Member, LedgerError> {
        let phone = phone::standardize_registration(&registration.phone)
            .map_err(|e| LedgerError::InvalidRequest(e.to_string()))?;
        let id = MemberId::new(format!("user-{}", now_millis()));
        let body = json!({
            "id": id.as_str(),
            "name": registration.name,
            "email": registration.email,
            "phone": phone,
            "address": registration.address,
            "birthDate": registration.birth_date,
        });
        let member = self
            .write(LedgerRequest::write("register", body), Rejection::Rejected)
            .await?
            .member()?;
        if let Ok(key) = LedgerRequest::read("getAll").key() {
            self.reads.invalidate(&key);
        }
        Ok(member)
    }

    /// Looks a member up by phone number and birth date.
    pub async fn login(&self, phone: &str, birth_date: &str) -> Result<Member, LedgerError> {
        let username = phone::normalize_login(phone)
            .map_err(|e| LedgerError::InvalidRequest(e.to_string()))?;
        let body = json!({ "username": username, "password": birth_date });
        self.write(LedgerRequest::write("login", body), Rejection::Rejected)
            .await?
            .member()
    }
}
