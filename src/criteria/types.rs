use serde::{Deserialize, Serialize};

use crate::criteria::registry::{Operation, StrategyType};
use crate::model::{Strategy, DEFAULT_ENVIRONMENT};

/// One piece of caller-supplied context, e.g. `VALUE_VALIDATION` → `"premium"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub strategy: StrategyType,
    pub input: String,
}

impl Entry {
    pub fn new(strategy: StrategyType, input: impl Into<String>) -> Self {
        Self {
            strategy,
            input: input.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaRequest {
    pub domain: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub entries: Vec<Entry>,
    /// Echo the strategies that took part in the decision.
    #[serde(default)]
    pub show_strategies: bool,
    /// Skip the config's relay even when it is active.
    #[serde(default)]
    pub bypass_relay: bool,
}

fn default_environment() -> String {
    DEFAULT_ENVIRONMENT.to_string()
}

impl CriteriaRequest {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            environment: default_environment(),
            entries: Vec::new(),
            show_strategies: false,
            bypass_relay: false,
        }
    }

    pub fn environment(mut self, environment: &str) -> Self {
        self.environment = environment.to_string();
        self
    }

    pub fn entry(mut self, strategy: StrategyType, input: impl Into<String>) -> Self {
        self.entries.push(Entry::new(strategy, input));
        self
    }

    pub fn show_strategies(mut self, show: bool) -> Self {
        self.show_strategies = show;
        self
    }

    pub fn bypass_relay(mut self, bypass: bool) -> Self {
        self.bypass_relay = bypass;
        self
    }

    /// First entry supplied for `strategy`.
    pub fn input_for(&self, strategy: StrategyType) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.strategy == strategy)
            .map(|e| e.input.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategySummary {
    pub strategy: StrategyType,
    pub operation: Operation,
    pub values: Vec<String>,
}

impl From<&Strategy> for StrategySummary {
    fn from(s: &Strategy) -> Self {
        Self {
            strategy: s.strategy,
            operation: s.operation,
            values: s.values.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaResponse {
    pub result: bool,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strategies: Vec<StrategySummary>,
}

impl CriteriaResponse {
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            result: true,
            reason: reason.into(),
            strategies: Vec::new(),
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            result: false,
            reason: reason.into(),
            strategies: Vec::new(),
        }
    }
}
