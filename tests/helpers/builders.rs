use std::collections::BTreeMap;

use switcher_core::access::types::{Action, Permission, Router, Team};
use switcher_core::criteria::registry::{Operation, StrategyType};
use switcher_core::model::{
    ActivationMap, Config, Domain, GroupConfig, Relay, RelayKind, RelayMethod, Strategy,
};
use switcher_core::store::MemoryStore;

/// Builder for test domains
pub struct DomainBuilder {
    domain: Domain,
}

impl DomainBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            domain: Domain::new(id, id, "owner-1"),
        }
    }

    pub fn owner(mut self, owner: &str) -> Self {
        self.domain.owner = owner.to_string();
        self
    }

    /// Declare an environment and activate it.
    pub fn environment(mut self, name: &str) -> Self {
        self.domain.add_environment(name);
        self.domain.activated.set(name, true);
        self
    }

    pub fn activated(mut self, environment: &str, active: bool) -> Self {
        self.domain.activated.set(environment, active);
        self
    }

    pub fn build(self) -> Domain {
        self.domain
    }

    pub fn create(self, store: &MemoryStore) -> Domain {
        let domain = self.build();
        store
            .put_domain(domain.clone())
            .expect("Failed to create test domain");
        domain
    }
}

/// Builder for test groups, active in `default`
pub struct GroupBuilder {
    group: GroupConfig,
}

impl GroupBuilder {
    pub fn new(id: &str, domain: &str) -> Self {
        Self {
            group: GroupConfig {
                id: id.to_string(),
                name: id.to_string(),
                domain: domain.to_string(),
                description: None,
                activated: ActivationMap::new().with("default", true),
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.group.name = name.to_string();
        self
    }

    pub fn activated(mut self, environment: &str, active: bool) -> Self {
        self.group.activated.set(environment, active);
        self
    }

    pub fn create(self, store: &MemoryStore) -> GroupConfig {
        store
            .put_group(self.group.clone())
            .expect("Failed to create test group");
        self.group
    }
}

/// Builder for test switchers, active in `default`
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new(id: &str, key: &str, group: &str, domain: &str) -> Self {
        Self {
            config: Config {
                id: id.to_string(),
                key: key.to_string(),
                group: group.to_string(),
                domain: domain.to_string(),
                description: None,
                activated: ActivationMap::new().with("default", true),
                relay: None,
            },
        }
    }

    pub fn activated(mut self, environment: &str, active: bool) -> Self {
        self.config.activated.set(environment, active);
        self
    }

    pub fn relay(mut self, kind: RelayKind, endpoint: &str) -> Self {
        self.config.relay = Some(Relay {
            kind,
            method: RelayMethod::Post,
            endpoints: BTreeMap::from([("default".to_string(), endpoint.to_string())]),
            activated: ActivationMap::new().with("default", true),
        });
        self
    }

    pub fn create(self, store: &MemoryStore) -> Config {
        store
            .put_config(self.config.clone())
            .expect("Failed to create test config");
        self.config
    }
}

/// Builder for test strategies, active in `default`
pub struct StrategyBuilder {
    strategy: Strategy,
}

impl StrategyBuilder {
    pub fn new(id: &str, config: &str, strategy: StrategyType, operation: Operation) -> Self {
        Self {
            strategy: Strategy {
                id: id.to_string(),
                config: config.to_string(),
                strategy,
                operation,
                values: Vec::new(),
                description: None,
                activated: ActivationMap::new().with("default", true),
            },
        }
    }

    pub fn values(mut self, values: &[&str]) -> Self {
        self.strategy.values = values.iter().map(|v| v.to_string()).collect();
        self
    }

    /// Activate only in `environment`.
    pub fn only_in(mut self, environment: &str) -> Self {
        self.strategy.activated = ActivationMap::new().with(environment, true);
        self
    }

    pub fn build(self) -> Strategy {
        self.strategy
    }

    pub fn create(self, store: &MemoryStore) -> Strategy {
        let strategy = self.build();
        store
            .put_strategy(strategy.clone())
            .expect("Failed to create test strategy");
        strategy
    }
}

/// Builder for test permissions
pub struct PermissionBuilder {
    permission: Permission,
}

impl PermissionBuilder {
    pub fn new(id: &str, action: Action, router: Router) -> Self {
        Self {
            permission: Permission::new(id, action, router),
        }
    }

    pub fn identified_by(mut self, field: &str, values: &[&str]) -> Self {
        self.permission.identified_by = Some(field.to_string());
        self.permission.values = values.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn environments(mut self, environments: &[&str]) -> Self {
        self.permission.environments = environments.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.permission.active = false;
        self
    }

    pub fn create(self, store: &MemoryStore) -> Permission {
        store
            .put_permission(self.permission.clone())
            .expect("Failed to create test permission");
        self.permission
    }
}

/// Builder for test teams
pub struct TeamBuilder {
    team: Team,
}

impl TeamBuilder {
    pub fn new(id: &str, domain: &str) -> Self {
        Self {
            team: Team {
                id: id.to_string(),
                name: id.to_string(),
                domain: domain.to_string(),
                active: true,
                members: Vec::new(),
                permissions: Vec::new(),
            },
        }
    }

    pub fn member(mut self, actor: &str) -> Self {
        self.team.members.push(actor.to_string());
        self
    }

    pub fn permission(mut self, permission: &Permission) -> Self {
        self.team.permissions.push(permission.id.clone());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.team.active = false;
        self
    }

    pub fn create(self, store: &MemoryStore) -> Team {
        store
            .put_team(self.team.clone())
            .expect("Failed to create test team");
        self.team
    }
}
