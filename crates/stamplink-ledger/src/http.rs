//! HTTP transport for the remote ledger.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use stamplink_core::now_millis;
use tracing::debug;

use crate::envelope::Envelope;
use crate::error::LedgerError;
use crate::traits::{LedgerRequest, LedgerTransport};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Ledger transport over HTTP.
///
/// Every call hits the single ledger endpoint with `?action=<name>`. Reads are
/// `GET` with their parameters in the query string; writes are `POST` with a
/// JSON body. No `Content-Type` header is set on writes: the hosted ledger
/// rejects preflighted requests.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base: Url,
    client: Client,
}

impl HttpTransport {
    /// Creates a transport for the ledger at `base`.
    pub fn new(base: &str, timeout: Duration) -> Result<Self, LedgerError> {
        let base = Url::parse(base)
            .map_err(|e| LedgerError::InvalidRequest(format!("ledger url {base:?}: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Network(format!("http client: {e}")))?;
        Ok(Self { base, client })
    }

    /// Base URL of the ledger.
    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url_for(&self, request: &LedgerRequest) -> Url {
        let mut url = self.base.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("action", &request.action);
            if !request.cacheable {
                query.append_pair("_t", &now_millis().to_string());
            }
            for (name, value) in &request.params {
                query.append_pair(name, value);
            }
        }
        url
    }
}

#[async_trait]
impl LedgerTransport for HttpTransport {
    async fn call(&self, request: LedgerRequest) -> Result<Envelope, LedgerError> {
        let url = self.url_for(&request);
        debug!(action = %request.action, write = request.is_write(), "ledger call");

        let sent = match &request.body {
            Some(body) => {
                let payload = serde_json::to_string(body)
                    .map_err(|e| LedgerError::InvalidRequest(e.to_string()))?;
                self.client.post(url).body(payload).send().await
            }
            None => self.client.get(url).send().await,
        };
        let response =
            sent.map_err(|e| LedgerError::Network(format!("{}: {e}", request.action)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LedgerError::Network(format!("{}: {e}", request.action)))?;

        match serde_json::from_str::<Envelope>(&text) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(LedgerError::Network(format!(
                "{}: HTTP {status}",
                request.action
            ))),
            Err(e) => Err(LedgerError::Malformed(format!(
                "{}: response is not a JSON envelope: {e}",
                request.action
            ))),
        }
    }
}
