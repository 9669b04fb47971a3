//! Switcher hierarchy entities: Domain → GroupConfig → Config → Strategy.
//!
//! The core reads these from its data collaborators; it never persists them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::criteria::errors::ValidationError;
use crate::criteria::registry::{Operation, StrategyType};

pub const DEFAULT_ENVIRONMENT: &str = "default";

/// Per-environment activation flags (`environment -> active`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivationMap(BTreeMap<String, bool>);

impl ActivationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, environment: &str, active: bool) -> Self {
        self.set(environment, active);
        self
    }

    pub fn set(&mut self, environment: &str, active: bool) {
        self.0.insert(environment.to_string(), active);
    }

    pub fn remove(&mut self, environment: &str) -> Option<bool> {
        self.0.remove(environment)
    }

    pub fn get(&self, environment: &str) -> Option<bool> {
        self.0.get(environment).copied()
    }

    /// Flag for `environment`, falling back to the `default` environment when
    /// the map has no entry for it.
    pub fn is_active(&self, environment: &str) -> bool {
        self.get(environment)
            .or_else(|| self.get(DEFAULT_ENVIRONMENT))
            .unwrap_or(false)
    }

    /// Flag for `environment` without any fallback.
    pub fn is_activated_exactly(&self, environment: &str) -> bool {
        self.get(environment).unwrap_or(false)
    }

    pub fn environments(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn validate_keys(&self, domain: &Domain, entity: &str) -> Result<(), ValidationError> {
        for environment in self.environments() {
            if !domain.has_environment(environment) {
                return Err(ValidationError::UndeclaredEnvironment {
                    domain: domain.id.clone(),
                    environment: environment.to_string(),
                    entity: entity.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl FromIterator<(String, bool)> for ActivationMap {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    pub domain: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub description: Option<String>,
    /// Declared environment names; always contains `default`.
    pub environments: Vec<String>,
    pub activated: ActivationMap,
}

impl Domain {
    pub fn new(id: &str, name: &str, owner: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            owner: owner.to_string(),
            description: None,
            environments: vec![DEFAULT_ENVIRONMENT.to_string()],
            activated: ActivationMap::new().with(DEFAULT_ENVIRONMENT, true),
        }
    }

    pub fn has_environment(&self, name: &str) -> bool {
        self.environments.iter().any(|e| e == name)
    }

    pub fn environment(&self, name: &str) -> Option<Environment> {
        self.has_environment(name).then(|| Environment {
            name: name.to_string(),
            domain: self.id.clone(),
        })
    }

    pub fn add_environment(&mut self, name: &str) {
        if !self.has_environment(name) {
            self.environments.push(name.to_string());
        }
    }

    pub fn remove_environment(&mut self, name: &str) -> Result<(), ValidationError> {
        if name == DEFAULT_ENVIRONMENT {
            return Err(ValidationError::DefaultEnvironment);
        }
        self.environments.retain(|e| e != name);
        self.activated.remove(name);
        Ok(())
    }

    /// Checks the domain's own invariants: `default` declared and activation
    /// keys limited to declared environments.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.has_environment(DEFAULT_ENVIRONMENT) {
            return Err(ValidationError::DefaultEnvironment);
        }
        self.activated.validate_keys(self, "domain")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub id: String,
    pub name: String,
    pub domain: String,
    pub description: Option<String>,
    pub activated: ActivationMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelayKind {
    Validation,
    Notification,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelayMethod {
    Get,
    #[default]
    Post,
}

/// External validation/notification hook attached to a switcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relay {
    pub kind: RelayKind,
    #[serde(default)]
    pub method: RelayMethod,
    /// environment -> endpoint URL
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,
    #[serde(default)]
    pub activated: ActivationMap,
}

impl Relay {
    /// Endpoint to call for `environment`, if the relay is switched on there.
    pub fn endpoint_for(&self, environment: &str) -> Option<&str> {
        if !self.activated.is_activated_exactly(environment) {
            return None;
        }
        self.endpoints.get(environment).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub id: String,
    pub key: String,
    pub group: String,
    pub domain: String,
    pub description: Option<String>,
    pub activated: ActivationMap,
    pub relay: Option<Relay>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: String,
    pub config: String,
    pub strategy: StrategyType,
    pub operation: Operation,
    pub values: Vec<String>,
    pub description: Option<String>,
    pub activated: ActivationMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admin {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub teams: Vec<String>,
}
