//! Switcher evaluation: hierarchy activation, then a fail-fast conjunction of
//! the strategies active in the requested environment, then the relay.

use std::sync::Arc;

use crate::criteria::errors::CriteriaError;
use crate::criteria::matcher::PatternMatcher;
use crate::criteria::processor::process_operation;
use crate::criteria::relay::{NoopRelay, RelayCall, RelayHook};
use crate::criteria::types::{CriteriaRequest, CriteriaResponse, StrategySummary};
use crate::model::{Config, RelayKind, Strategy};
use crate::store::CriteriaStore;

pub const REASON_SUCCESS: &str = "Success";
pub const REASON_CONFIG_DISABLED: &str = "Config disabled";
pub const REASON_GROUP_DISABLED: &str = "Group disabled";
pub const REASON_DOMAIN_DISABLED: &str = "Domain disabled";
pub const REASON_RELAY_DISAGREES: &str = "Relay does not agree";

pub struct CriteriaEvaluator<S> {
    store: Arc<S>,
    matcher: PatternMatcher,
    relay: Arc<dyn RelayHook>,
}

impl<S: CriteriaStore> CriteriaEvaluator<S> {
    pub fn new(store: Arc<S>, matcher: PatternMatcher) -> Self {
        Self {
            store,
            matcher,
            relay: Arc::new(NoopRelay),
        }
    }

    pub fn with_relay(mut self, relay: Arc<dyn RelayHook>) -> Self {
        self.relay = relay;
        self
    }

    pub async fn evaluate(
        &self,
        key: &str,
        request: &CriteriaRequest,
    ) -> Result<CriteriaResponse, CriteriaError> {
        let env = request.environment.as_str();

        let config = self
            .store
            .find_config_by_key(&request.domain, key)
            .await?
            .ok_or_else(|| CriteriaError::not_found("config", key))?;
        let group = self
            .store
            .find_group_by_id(&config.group)
            .await?
            .ok_or_else(|| CriteriaError::not_found("group", config.group.as_str()))?;
        let domain = self
            .store
            .find_domain_by_id(&config.domain)
            .await?
            .ok_or_else(|| CriteriaError::not_found("domain", config.domain.as_str()))?;

        // reported precedence: config, group, domain
        let disabled = if !config.activated.is_active(env) {
            Some(REASON_CONFIG_DISABLED)
        } else if !group.activated.is_active(env) {
            Some(REASON_GROUP_DISABLED)
        } else if !domain.activated.is_active(env) {
            Some(REASON_DOMAIN_DISABLED)
        } else {
            None
        };
        if let Some(reason) = disabled {
            tracing::debug!(key, env, reason, "criteria short-circuited");
            return Ok(CriteriaResponse::deny(reason));
        }

        let strategies: Vec<Strategy> = self
            .store
            .find_strategies_by_config(&config.id)
            .await?
            .into_iter()
            .filter(|s| s.activated.is_activated_exactly(env))
            .collect();

        let mut response = self.check_strategies(&strategies, request).await;
        if response.result && !request.bypass_relay {
            response = self.check_relay(&config, request).await;
        }
        if request.show_strategies {
            response.strategies = strategies.iter().map(StrategySummary::from).collect();
        }

        tracing::debug!(key, env, result = response.result, reason = %response.reason, "criteria evaluated");
        Ok(response)
    }

    async fn check_strategies(
        &self,
        strategies: &[Strategy],
        request: &CriteriaRequest,
    ) -> CriteriaResponse {
        for strategy in strategies {
            let Some(input) = request.input_for(strategy.strategy) else {
                return CriteriaResponse::deny(format!(
                    "Strategy '{}' did not receive any input",
                    strategy.strategy
                ));
            };
            let agrees = process_operation(
                &self.matcher,
                strategy.strategy,
                strategy.operation,
                input,
                &strategy.values,
            )
            .await;
            if !agrees {
                return CriteriaResponse::deny(format!(
                    "Strategy '{}' does not agree",
                    strategy.strategy
                ));
            }
        }
        CriteriaResponse::allow(REASON_SUCCESS)
    }

    async fn check_relay(&self, config: &Config, request: &CriteriaRequest) -> CriteriaResponse {
        let Some(relay) = &config.relay else {
            return CriteriaResponse::allow(REASON_SUCCESS);
        };
        let Some(endpoint) = relay.endpoint_for(&request.environment) else {
            return CriteriaResponse::allow(REASON_SUCCESS);
        };

        let call = RelayCall {
            kind: relay.kind,
            method: relay.method,
            endpoint: endpoint.to_string(),
            key: config.key.clone(),
            domain: config.domain.clone(),
            environment: request.environment.clone(),
            entries: request.entries.clone(),
        };

        match relay.kind {
            RelayKind::Notification => {
                let hook = self.relay.clone();
                tokio::spawn(async move {
                    if let Err(e) = hook.call(&call).await {
                        tracing::warn!(key = %call.key, error = %e, "notification relay failed");
                    }
                });
                CriteriaResponse::allow(REASON_SUCCESS)
            }
            RelayKind::Validation => match self.relay.call(&call).await {
                Ok(true) => CriteriaResponse::allow(REASON_SUCCESS),
                Ok(false) => CriteriaResponse::deny(REASON_RELAY_DISAGREES),
                Err(e) => {
                    tracing::warn!(key = %call.key, error = %e, "validation relay failed");
                    CriteriaResponse::deny(REASON_RELAY_DISAGREES)
                }
            },
        }
    }
}
