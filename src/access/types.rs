use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Admin, Config, Domain, Environment, GroupConfig, Strategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    All,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "CREATE",
            Action::Read => "READ",
            Action::Update => "UPDATE",
            Action::Delete => "DELETE",
            Action::All => "ALL",
        }
    }

    /// `ALL` on either side matches anything.
    pub fn intersects(&self, other: Action) -> bool {
        *self == other || *self == Action::All || other == Action::All
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Action::Create,
            Action::Read,
            Action::Update,
            Action::Delete,
            Action::All,
        ]
        .into_iter()
        .find(|a| a.as_str() == s)
        .ok_or_else(|| format!("unknown action `{s}`"))
    }
}

/// Category of element a permission governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Router {
    Domain,
    Group,
    Config,
    Strategy,
    Component,
    Environment,
    Admin,
    All,
}

impl Router {
    const NAMES: [Router; 8] = [
        Router::Domain,
        Router::Group,
        Router::Config,
        Router::Strategy,
        Router::Component,
        Router::Environment,
        Router::Admin,
        Router::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Router::Domain => "DOMAIN",
            Router::Group => "GROUP",
            Router::Config => "CONFIG",
            Router::Strategy => "STRATEGY",
            Router::Component => "COMPONENT",
            Router::Environment => "ENVIRONMENT",
            Router::Admin => "ADMIN",
            Router::All => "ALL",
        }
    }

    /// Routers a grant on `self` also authorizes when cascading
    /// (DOMAIN ⊇ GROUP ⊇ CONFIG ⊇ STRATEGY).
    pub fn covers(&self) -> &'static [Router] {
        match self {
            Router::Domain => &[Router::Group, Router::Config, Router::Strategy],
            Router::Group => &[Router::Config, Router::Strategy],
            Router::Config => &[Router::Strategy],
            _ => &[],
        }
    }

    /// Whether a permission on `self` applies to a `requested` router.
    pub fn grants(&self, requested: Router, cascade: bool) -> bool {
        *self == requested
            || *self == Router::All
            || (cascade && self.covers().contains(&requested))
    }

    pub fn intersects(&self, other: Router) -> bool {
        *self == other || *self == Router::All || other == Router::All
    }
}

impl fmt::Display for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Router {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Router::NAMES
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown router `{s}`"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: String,
    pub action: Action,
    pub router: Router,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Element field checked against `values`, e.g. `name` or `key`.
    #[serde(default)]
    pub identified_by: Option<String>,
    #[serde(default)]
    pub values: Vec<String>,
    /// Environments the permission is scoped to; empty means any.
    #[serde(default)]
    pub environments: Vec<String>,
}

impl Permission {
    pub fn new(id: &str, action: Action, router: Router) -> Self {
        Self {
            id: id.to_string(),
            action,
            router,
            active: true,
            identified_by: None,
            values: Vec::new(),
            environments: Vec::new(),
        }
    }

    pub fn allows_environment(&self, environment: Option<&str>) -> bool {
        if self.environments.is_empty() {
            return true;
        }
        environment.is_some_and(|env| self.environments.iter().any(|e| e == env))
    }

    pub fn allows_action(&self, actions: &[Action]) -> bool {
        self.action == Action::All || actions.contains(&self.action)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub domain: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub members: Vec<String>,
    /// Permission ids, in grant order.
    #[serde(default)]
    pub permissions: Vec<String>,
}

fn default_active() -> bool {
    true
}

/// Anything a permission can be checked against.
pub trait Element {
    /// Identity used to de-duplicate results.
    fn id(&self) -> String;

    /// Value of the field named by a permission's `identified_by`.
    fn field(&self, name: &str) -> Option<String>;
}

impl Element for Domain {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" | "_id" => Some(self.id.clone()),
            "name" => Some(self.name.clone()),
            "owner" => Some(self.owner.clone()),
            _ => None,
        }
    }
}

impl Element for GroupConfig {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" | "_id" => Some(self.id.clone()),
            "name" => Some(self.name.clone()),
            "domain" => Some(self.domain.clone()),
            _ => None,
        }
    }
}

impl Element for Config {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" | "_id" => Some(self.id.clone()),
            "key" => Some(self.key.clone()),
            "group" => Some(self.group.clone()),
            "domain" => Some(self.domain.clone()),
            _ => None,
        }
    }
}

impl Element for Strategy {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" | "_id" => Some(self.id.clone()),
            "strategy" => Some(self.strategy.to_string()),
            "operation" => Some(self.operation.to_string()),
            "config" => Some(self.config.clone()),
            _ => None,
        }
    }
}

impl Element for Environment {
    fn id(&self) -> String {
        format!("{}/{}", self.domain, self.name)
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "name" => Some(self.name.clone()),
            "domain" => Some(self.domain.clone()),
            _ => None,
        }
    }
}

impl Element for Team {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" | "_id" => Some(self.id.clone()),
            "name" => Some(self.name.clone()),
            _ => None,
        }
    }
}

impl Element for Admin {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" | "_id" => Some(self.id.clone()),
            "name" => Some(self.name.clone()),
            _ => None,
        }
    }
}

/// JSON elements as handed over by the HTTP layer. Identity is the `id` (or
/// `_id`) field, falling back to the serialized object.
impl Element for Value {
    fn id(&self) -> String {
        self.field("id")
            .or_else(|| self.field("_id"))
            .unwrap_or_else(|| self.to_string())
    }

    fn field(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Who wants to do what, where.
#[derive(Debug, Clone)]
pub struct AccessRequest<'a> {
    pub actor: &'a str,
    pub domain: &'a Domain,
    pub actions: Vec<Action>,
    pub router: Router,
    pub cascade: bool,
    pub environment: Option<&'a str>,
    /// Parent element id, only used to key and invalidate cached decisions.
    pub parent: Option<&'a str>,
}

impl<'a> AccessRequest<'a> {
    pub fn new(actor: &'a str, domain: &'a Domain, action: Action, router: Router) -> Self {
        Self {
            actor,
            domain,
            actions: vec![action],
            router,
            cascade: false,
            environment: None,
            parent: None,
        }
    }

    pub fn actions(mut self, actions: &[Action]) -> Self {
        self.actions = actions.to_vec();
        self
    }

    pub fn cascade(mut self, cascade: bool) -> Self {
        self.cascade = cascade;
        self
    }

    pub fn environment(mut self, environment: Option<&'a str>) -> Self {
        self.environment = environment;
        self
    }

    pub fn parent(mut self, parent: Option<&'a str>) -> Self {
        self.parent = parent;
        self
    }
}
