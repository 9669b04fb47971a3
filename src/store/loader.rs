//! KDL snapshot files seeding a [`MemoryStore`].
//!
//! ```kdl
//! domain "d1" name="Acme" owner="owner-1" {
//!     environments {
//!         - "QA"
//!     }
//!     group "g1" name="Release 1" {
//!         config "c1" key="FEATURE_X" {
//!             strategy "s1" type="VALUE" operation="EXIST" {
//!                 values {
//!                     - "premium"
//!                 }
//!             }
//!         }
//!     }
//! }
//!
//! permission "p1" action="READ" router="GROUP" identified-by="name" {
//!     values {
//!         - "Release 1"
//!     }
//! }
//!
//! team "t1" name="devs" domain="d1" {
//!     members {
//!         - "admin-1"
//!     }
//!     permissions {
//!         - "p1"
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use kdl::{KdlDocument, KdlNode};

use crate::access::types::{Action, Permission, Router, Team};
use crate::criteria::registry::{Operation, StrategyType};
use crate::model::{
    ActivationMap, Admin, Config, Domain, GroupConfig, Relay, RelayKind, RelayMethod, Strategy,
    DEFAULT_ENVIRONMENT,
};
use crate::store::errors::StoreError;
use crate::store::memory::{MemoryStore, StoreSummary};

/// Entities read from one or more snapshot documents, in document order.
#[derive(Debug, Default)]
pub struct ParsedSnapshot {
    pub domains: Vec<Domain>,
    pub groups: Vec<GroupConfig>,
    pub configs: Vec<Config>,
    pub strategies: Vec<Strategy>,
    pub permissions: Vec<Permission>,
    pub teams: Vec<Team>,
    pub admins: Vec<Admin>,
}

impl ParsedSnapshot {
    fn merge(&mut self, other: ParsedSnapshot) {
        self.domains.extend(other.domains);
        self.groups.extend(other.groups);
        self.configs.extend(other.configs);
        self.strategies.extend(other.strategies);
        self.permissions.extend(other.permissions);
        self.teams.extend(other.teams);
        self.admins.extend(other.admins);
    }
}

/// Load every `.kdl` file of `dir` (sorted by path) into `store`.
pub fn load_snapshot(dir: &Path, store: &MemoryStore) -> Result<StoreSummary, StoreError> {
    if !dir.is_dir() {
        return Err(StoreError::InvalidSnapshot(format!(
            "snapshot directory `{}` does not exist or is not a directory",
            dir.display()
        )));
    }

    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "kdl"))
        .collect();
    entries.sort();

    let mut snapshot = ParsedSnapshot::default();
    for path in &entries {
        let contents =
            std::fs::read_to_string(path).map_err(|source| StoreError::SnapshotLoad {
                path: path.display().to_string(),
                source,
            })?;
        snapshot.merge(parse_snapshot(&contents)?);
    }

    apply_snapshot(store, snapshot)?;
    let summary = store.summary();

    tracing::info!(
        files = entries.len(),
        domains = summary.domains,
        groups = summary.groups,
        configs = summary.configs,
        strategies = summary.strategies,
        teams = summary.teams,
        permissions = summary.permissions,
        "Loaded switcher snapshot"
    );

    Ok(summary)
}

/// Write parsed entities parents-first so every write-time check can see
/// what it depends on.
pub fn apply_snapshot(store: &MemoryStore, snapshot: ParsedSnapshot) -> Result<(), StoreError> {
    for domain in snapshot.domains {
        store.put_domain(domain)?;
    }
    for group in snapshot.groups {
        store.put_group(group)?;
    }
    for config in snapshot.configs {
        store.put_config(config)?;
    }
    for strategy in snapshot.strategies {
        store.put_strategy(strategy)?;
    }
    for permission in snapshot.permissions {
        store.put_permission(permission)?;
    }
    for team in snapshot.teams {
        store.put_team(team)?;
    }
    for admin in snapshot.admins {
        store.put_admin(admin)?;
    }
    Ok(())
}

/// Parse one KDL document.
pub fn parse_snapshot(source: &str) -> Result<ParsedSnapshot, StoreError> {
    let doc: KdlDocument = source
        .parse()
        .map_err(|e: kdl::KdlError| StoreError::KdlParse(e.to_string()))?;

    let mut snapshot = ParsedSnapshot::default();

    for node in doc.nodes() {
        match node.name().value() {
            "domain" => parse_domain(node, &mut snapshot)?,
            "permission" => snapshot.permissions.push(parse_permission(node)?),
            "team" => snapshot.teams.push(parse_team(node)?),
            "admin" => {
                let id = required_arg(node, "admin \"admin-1\" name=\"Ada\"")?;
                let name = string_prop(node, "name").unwrap_or_else(|| id.clone());
                let teams = child(node, "teams").map(dash_list).unwrap_or_default();
                snapshot.admins.push(Admin { id, name, teams });
            }
            other => {
                tracing::warn!("ignoring unknown top-level KDL node `{other}`");
            }
        }
    }

    Ok(snapshot)
}

fn parse_domain(node: &KdlNode, snapshot: &mut ParsedSnapshot) -> Result<(), StoreError> {
    let id = required_arg(node, "domain \"d1\" owner=\"admin-1\"")?;
    let owner = string_prop(node, "owner").ok_or_else(|| {
        StoreError::InvalidSnapshot(format!("domain `{id}` missing `owner` property"))
    })?;
    let name = string_prop(node, "name").unwrap_or_else(|| id.clone());

    let mut domain = Domain::new(&id, &name, &owner);
    domain.description = string_prop(node, "description");

    for child in children(node) {
        match child.name().value() {
            "environments" => {
                for env in dash_list(child) {
                    domain.add_environment(&env);
                }
            }
            "activated" => domain.activated = activation(child)?,
            "group" => parse_group(child, &id, snapshot)?,
            other => {
                return Err(StoreError::InvalidSnapshot(format!(
                    "unexpected child `{other}` in domain `{id}` (expected `environments`, `activated` or `group`)"
                )));
            }
        }
    }

    snapshot.domains.push(domain);
    Ok(())
}

fn parse_group(node: &KdlNode, domain: &str, snapshot: &mut ParsedSnapshot) -> Result<(), StoreError> {
    let id = required_arg(node, "group \"g1\" name=\"Release 1\"")?;
    let mut group = GroupConfig {
        name: string_prop(node, "name").unwrap_or_else(|| id.clone()),
        id,
        domain: domain.to_string(),
        description: string_prop(node, "description"),
        activated: default_activation(),
    };

    for child in children(node) {
        match child.name().value() {
            "activated" => group.activated = activation(child)?,
            "config" => parse_config(child, &group, snapshot)?,
            other => {
                return Err(StoreError::InvalidSnapshot(format!(
                    "unexpected child `{other}` in group `{}`",
                    group.id
                )));
            }
        }
    }

    snapshot.groups.push(group);
    Ok(())
}

fn parse_config(
    node: &KdlNode,
    group: &GroupConfig,
    snapshot: &mut ParsedSnapshot,
) -> Result<(), StoreError> {
    let id = required_arg(node, "config \"c1\" key=\"FEATURE_X\"")?;
    let key = string_prop(node, "key").ok_or_else(|| {
        StoreError::InvalidSnapshot(format!("config `{id}` missing `key` property"))
    })?;
    let mut config = Config {
        id,
        key,
        group: group.id.clone(),
        domain: group.domain.clone(),
        description: string_prop(node, "description"),
        activated: default_activation(),
        relay: None,
    };

    for child in children(node) {
        match child.name().value() {
            "activated" => config.activated = activation(child)?,
            "relay" => config.relay = Some(parse_relay(child, &config.id)?),
            "strategy" => snapshot.strategies.push(parse_strategy(child, &config.id)?),
            other => {
                return Err(StoreError::InvalidSnapshot(format!(
                    "unexpected child `{other}` in config `{}`",
                    config.id
                )));
            }
        }
    }

    snapshot.configs.push(config);
    Ok(())
}

fn parse_relay(node: &KdlNode, config: &str) -> Result<Relay, StoreError> {
    let kind = match string_prop(node, "type").as_deref() {
        Some("VALIDATION") => RelayKind::Validation,
        Some("NOTIFICATION") => RelayKind::Notification,
        other => {
            return Err(StoreError::InvalidSnapshot(format!(
                "relay of config `{config}` has type {other:?} (expected \"VALIDATION\" or \"NOTIFICATION\")"
            )));
        }
    };
    let method = match string_prop(node, "method").as_deref() {
        None | Some("POST") => RelayMethod::Post,
        Some("GET") => RelayMethod::Get,
        Some(other) => {
            return Err(StoreError::InvalidSnapshot(format!(
                "relay of config `{config}` has unsupported method `{other}`"
            )));
        }
    };

    let endpoints: BTreeMap<String, String> = child(node, "endpoint")
        .map(|n| {
            n.entries()
                .iter()
                .filter_map(|e| {
                    let env = e.name()?.value().to_string();
                    let url = e.value().as_string()?.to_string();
                    Some((env, url))
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Relay {
        kind,
        method,
        endpoints,
        activated: match child(node, "activated") {
            Some(n) => activation(n)?,
            None => default_activation(),
        },
    })
}

fn parse_strategy(node: &KdlNode, config: &str) -> Result<Strategy, StoreError> {
    let id = required_arg(node, "strategy \"s1\" type=\"VALUE\" operation=\"EXIST\"")?;
    let strategy: StrategyType = string_prop(node, "type")
        .ok_or_else(|| {
            StoreError::InvalidSnapshot(format!("strategy `{id}` missing `type` property"))
        })?
        .parse()?;
    let operation: Operation = string_prop(node, "operation")
        .ok_or_else(|| {
            StoreError::InvalidSnapshot(format!("strategy `{id}` missing `operation` property"))
        })?
        .parse()?;

    Ok(Strategy {
        config: config.to_string(),
        strategy,
        operation,
        values: child(node, "values").map(dash_list).unwrap_or_default(),
        description: string_prop(node, "description"),
        activated: match child(node, "activated") {
            Some(n) => activation(n)?,
            None => default_activation(),
        },
        id,
    })
}

fn parse_permission(node: &KdlNode) -> Result<Permission, StoreError> {
    let id = required_arg(node, "permission \"p1\" action=\"READ\" router=\"GROUP\"")?;
    let action: Action = string_prop(node, "action")
        .unwrap_or_else(|| "ALL".to_string())
        .parse()
        .map_err(|e: String| StoreError::InvalidSnapshot(format!("permission `{id}`: {e}")))?;
    let router: Router = string_prop(node, "router")
        .ok_or_else(|| {
            StoreError::InvalidSnapshot(format!("permission `{id}` missing `router` property"))
        })?
        .parse()
        .map_err(|e: String| StoreError::InvalidSnapshot(format!("permission `{id}`: {e}")))?;

    let mut permission = Permission::new(&id, action, router);
    permission.active = bool_prop(node, "active").unwrap_or(true);
    permission.identified_by = string_prop(node, "identified-by");
    permission.values = child(node, "values").map(dash_list).unwrap_or_default();
    permission.environments = child(node, "environments").map(dash_list).unwrap_or_default();
    Ok(permission)
}

fn parse_team(node: &KdlNode) -> Result<Team, StoreError> {
    let id = required_arg(node, "team \"t1\" domain=\"d1\"")?;
    let domain = string_prop(node, "domain").ok_or_else(|| {
        StoreError::InvalidSnapshot(format!("team `{id}` missing `domain` property"))
    })?;
    Ok(Team {
        name: string_prop(node, "name").unwrap_or_else(|| id.clone()),
        domain,
        active: bool_prop(node, "active").unwrap_or(true),
        members: child(node, "members").map(dash_list).unwrap_or_default(),
        permissions: child(node, "permissions").map(dash_list).unwrap_or_default(),
        id,
    })
}

/// Entities without an `activated` node are on in `default` only.
fn default_activation() -> ActivationMap {
    ActivationMap::new().with(DEFAULT_ENVIRONMENT, true)
}

/// `activated default=#true QA=#false`
fn activation(node: &KdlNode) -> Result<ActivationMap, StoreError> {
    let mut map = ActivationMap::new();
    for entry in node.entries() {
        let Some(env) = entry.name() else {
            continue;
        };
        let active = entry.value().as_bool().ok_or_else(|| {
            StoreError::InvalidSnapshot(format!(
                "activation flag for `{}` must be #true or #false",
                env.value()
            ))
        })?;
        map.set(env.value(), active);
    }
    Ok(map)
}

fn required_arg(node: &KdlNode, example: &str) -> Result<String, StoreError> {
    first_string_arg(node).ok_or_else(|| {
        StoreError::InvalidSnapshot(format!(
            "{} node requires a string argument (e.g. {example})",
            node.name().value()
        ))
    })
}

fn children(node: &KdlNode) -> impl Iterator<Item = &KdlNode> {
    node.children().into_iter().flat_map(|doc| doc.nodes().iter())
}

fn child<'a>(node: &'a KdlNode, name: &str) -> Option<&'a KdlNode> {
    children(node).find(|n| n.name().value() == name)
}

fn string_prop(node: &KdlNode, key: &str) -> Option<String> {
    node.get(key).and_then(|v| v.as_string()).map(str::to_string)
}

fn bool_prop(node: &KdlNode, key: &str) -> Option<bool> {
    node.get(key).and_then(|v| v.as_bool())
}

fn first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// Children named `-` whose first argument is a string.
fn dash_list(node: &KdlNode) -> Vec<String> {
    children(node)
        .filter(|n| n.name().value() == "-")
        .filter_map(first_string_arg)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AccessStore, CriteriaStore};

    const SNAPSHOT: &str = r#"
domain "d1" name="Acme" owner="owner-1" {
    environments {
        - "QA"
    }
    activated default=#true QA=#true
    group "g1" name="Release 1" {
        config "c1" key="FEATURE_X" {
            relay type="VALIDATION" method="GET" {
                endpoint default="http://relay.local/check"
                activated default=#false
            }
            strategy "s1" type="VALUE_VALIDATION" operation="EXIST" {
                values {
                    - "premium"
                    - "gold"
                }
                activated default=#true QA=#false
            }
        }
    }
}

permission "p1" action="READ" router="GROUP" identified-by="name" {
    values {
        - "Release 1"
    }
    environments {
        - "default"
    }
}

team "t1" name="devs" domain="d1" {
    members {
        - "admin-1"
    }
    permissions {
        - "p1"
    }
}

admin "admin-2" name="Grace" {
    teams {
        - "t1"
    }
}
"#;

    #[test]
    fn test_parse_hierarchy() {
        let snapshot = parse_snapshot(SNAPSHOT).unwrap();
        assert_eq!(snapshot.domains.len(), 1);
        let domain = &snapshot.domains[0];
        assert_eq!(domain.environments, vec!["default", "QA"]);
        assert!(domain.activated.is_activated_exactly("QA"));

        assert_eq!(snapshot.groups[0].domain, "d1");
        let config = &snapshot.configs[0];
        assert_eq!(config.group, "g1");
        assert!(config.activated.is_activated_exactly("default"));
        let relay = config.relay.as_ref().unwrap();
        assert_eq!(relay.method, RelayMethod::Get);
        assert_eq!(relay.endpoint_for("default"), None);

        let strategy = &snapshot.strategies[0];
        assert_eq!(strategy.strategy, StrategyType::Value);
        assert_eq!(strategy.operation, Operation::Exist);
        assert_eq!(strategy.values, vec!["premium", "gold"]);
        assert_eq!(strategy.activated.get("QA"), Some(false));
    }

    #[test]
    fn test_parse_access_nodes() {
        let snapshot = parse_snapshot(SNAPSHOT).unwrap();
        let permission = &snapshot.permissions[0];
        assert_eq!(permission.action, Action::Read);
        assert_eq!(permission.router, Router::Group);
        assert_eq!(permission.identified_by.as_deref(), Some("name"));
        assert_eq!(permission.environments, vec!["default"]);
        assert!(permission.active);

        assert_eq!(snapshot.teams[0].members, vec!["admin-1"]);
        assert_eq!(snapshot.admins[0].teams, vec!["t1"]);
    }

    #[test]
    fn test_invalid_documents() {
        assert!(matches!(
            parse_snapshot("domain \"d1\" {"),
            Err(StoreError::KdlParse(_))
        ));
        assert!(matches!(
            parse_snapshot("domain \"d1\" name=\"no owner\""),
            Err(StoreError::InvalidSnapshot(_))
        ));
        assert!(matches!(
            parse_snapshot("permission \"p1\" action=\"WRITE\" router=\"GROUP\""),
            Err(StoreError::InvalidSnapshot(_))
        ));
        let unknown = r#"
domain "d1" owner="o" {
    group "g1" {
        config "c1" key="K" {
            strategy "s1" type="COLOR" operation="EXIST"
        }
    }
}
"#;
        assert!(matches!(
            parse_snapshot(unknown),
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("10-acme.kdl"), SNAPSHOT).unwrap();
        std::fs::write(dir.path().join("README.md"), "not a snapshot").unwrap();

        let store = MemoryStore::new();
        let summary = load_snapshot(dir.path(), &store).unwrap();
        assert_eq!(summary.domains, 1);
        assert_eq!(summary.strategies, 1);
        assert_eq!(summary.admins, 1);

        let config = store.find_config_by_key("d1", "FEATURE_X").await.unwrap();
        assert!(config.is_some());
        let teams = store.find_teams_by_actor_and_domain("admin-2", "d1").await.unwrap();
        assert_eq!(teams.len(), 1);
    }

    #[test]
    fn test_load_rejects_invalid_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let bad = r#"
domain "d1" owner="o" {
    group "g1" {
        config "c1" key="K" {
            strategy "s1" type="NETWORK" operation="EXIST" {
                values {
                    - "10.0.0.0/99"
                }
            }
        }
    }
}
"#;
        std::fs::write(dir.path().join("bad.kdl"), bad).unwrap();
        let err = load_snapshot(dir.path(), &MemoryStore::new()).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_missing_directory() {
        let err = load_snapshot(Path::new("/nonexistent/snapshot"), &MemoryStore::new());
        assert!(matches!(err, Err(StoreError::InvalidSnapshot(_))));
    }
}
