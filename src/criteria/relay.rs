//! Outbound hooks a switcher can consult (validation) or inform
//! (notification) once its strategies have agreed.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::criteria::errors::CriteriaError;
use crate::criteria::types::Entry;
use crate::model::{RelayKind, RelayMethod};

/// Everything a relay endpoint receives about one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayCall {
    #[serde(skip)]
    pub kind: RelayKind,
    #[serde(skip)]
    pub method: RelayMethod,
    #[serde(skip)]
    pub endpoint: String,
    pub key: String,
    pub domain: String,
    pub environment: String,
    pub entries: Vec<Entry>,
}

#[async_trait]
pub trait RelayHook: Send + Sync {
    /// Verdict of the relay. Notification relays' verdicts are ignored.
    async fn call(&self, call: &RelayCall) -> Result<bool, CriteriaError>;
}

/// Agrees with everything without leaving the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRelay;

#[async_trait]
impl RelayHook for NoopRelay {
    async fn call(&self, call: &RelayCall) -> Result<bool, CriteriaError> {
        tracing::debug!(key = %call.key, endpoint = %call.endpoint, "relay disabled, agreeing");
        Ok(true)
    }
}

#[derive(Debug, Deserialize)]
struct RelayVerdict {
    result: bool,
}

/// Calls relay endpoints over HTTP. POST sends the call as JSON; GET sends
/// `key` and `environment` as query parameters plus one `<TYPE>=<input>`
/// pair per entry. Both expect `{"result": bool}` back.
#[derive(Debug, Clone)]
pub struct HttpRelay {
    client: reqwest::Client,
}

impl HttpRelay {
    pub fn new(timeout: Duration) -> Result<Self, CriteriaError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CriteriaError::Relay(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RelayHook for HttpRelay {
    async fn call(&self, call: &RelayCall) -> Result<bool, CriteriaError> {
        let request = match call.method {
            RelayMethod::Post => self.client.post(&call.endpoint).json(call),
            RelayMethod::Get => {
                let mut query = vec![
                    ("key".to_string(), call.key.clone()),
                    ("environment".to_string(), call.environment.clone()),
                ];
                query.extend(
                    call.entries
                        .iter()
                        .map(|e| (e.strategy.to_string(), e.input.clone())),
                );
                self.client.get(&call.endpoint).query(&query)
            }
        };

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| CriteriaError::Relay(format!("{}: {e}", call.endpoint)))?;
        let verdict: RelayVerdict = response
            .json()
            .await
            .map_err(|e| CriteriaError::Relay(format!("{}: {e}", call.endpoint)))?;
        Ok(verdict.result)
    }
}
