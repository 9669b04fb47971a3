use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::access::cache::AccessCache;
use crate::access::types::{Action, Permission, Router, Team};
use crate::criteria::validator::{validate_strategy, validate_strategy_set};
use crate::model::{Admin, Config, Domain, GroupConfig, Strategy};
use crate::store::errors::StoreError;
use crate::store::{AccessStore, CriteriaStore};

#[derive(Debug, Default)]
struct Snapshot {
    domains: HashMap<String, Domain>,
    groups: HashMap<String, GroupConfig>,
    configs: HashMap<String, Config>,
    /// Kept in insertion order; evaluation walks them as stored.
    strategies: Vec<Strategy>,
    permissions: HashMap<String, Permission>,
    teams: Vec<Team>,
    admins: HashMap<String, Admin>,
}

/// Entity counts, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreSummary {
    pub domains: usize,
    pub groups: usize,
    pub configs: usize,
    pub strategies: usize,
    pub permissions: usize,
    pub teams: usize,
    pub admins: usize,
}

/// In-process store implementing both lookup traits. Every `put_*` runs the
/// write-time validations and invalidates affected cached decisions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Snapshot>,
    cache: Option<Arc<AccessCache>>,
}

fn write_action(existed: bool) -> Action {
    if existed {
        Action::Update
    } else {
        Action::Create
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report mutations to `cache` so stale decisions are dropped.
    pub fn with_invalidation(mut self, cache: Arc<AccessCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn summary(&self) -> StoreSummary {
        let snap = self.read();
        StoreSummary {
            domains: snap.domains.len(),
            groups: snap.groups.len(),
            configs: snap.configs.len(),
            strategies: snap.strategies.len(),
            permissions: snap.permissions.len(),
            teams: snap.teams.len(),
            admins: snap.admins.len(),
        }
    }

    pub fn admin(&self, id: &str) -> Option<Admin> {
        self.read().admins.get(id).cloned()
    }

    pub fn put_domain(&self, domain: Domain) -> Result<(), StoreError> {
        domain.validate()?;
        let mut snap = self.write();
        let previous = snap.domains.get(&domain.id).cloned();
        let owner_changed = previous.as_ref().is_some_and(|p| p.owner != domain.owner);
        let id = domain.id.clone();
        snap.domains.insert(id.clone(), domain);
        drop(snap);

        if owner_changed {
            self.invalidate(&id, Action::All, Router::All, None);
        } else {
            self.invalidate(&id, write_action(previous.is_some()), Router::Domain, None);
        }
        Ok(())
    }

    pub fn put_group(&self, group: GroupConfig) -> Result<(), StoreError> {
        let mut snap = self.write();
        let domain = snap
            .domains
            .get(&group.domain)
            .ok_or_else(|| StoreError::MissingParent {
                entity: "domain",
                id: group.domain.clone(),
            })?;
        group.activated.validate_keys(domain, "group")?;

        let existed = snap.groups.contains_key(&group.id);
        let domain_id = group.domain.clone();
        snap.groups.insert(group.id.clone(), group);
        drop(snap);

        self.invalidate(&domain_id, write_action(existed), Router::Group, Some(&domain_id));
        Ok(())
    }

    pub fn put_config(&self, config: Config) -> Result<(), StoreError> {
        let mut snap = self.write();
        let group = snap
            .groups
            .get(&config.group)
            .filter(|g| g.domain == config.domain)
            .ok_or_else(|| StoreError::MissingParent {
                entity: "group",
                id: config.group.clone(),
            })?;
        let domain = snap
            .domains
            .get(&group.domain)
            .ok_or_else(|| StoreError::MissingParent {
                entity: "domain",
                id: group.domain.clone(),
            })?;
        config.activated.validate_keys(domain, "config")?;
        if let Some(relay) = &config.relay {
            relay.activated.validate_keys(domain, "relay")?;
        }

        let existed = snap.configs.contains_key(&config.id);
        let (domain_id, group_id) = (config.domain.clone(), config.group.clone());
        snap.configs.insert(config.id.clone(), config);
        drop(snap);

        self.invalidate(&domain_id, write_action(existed), Router::Config, Some(&group_id));
        Ok(())
    }

    pub fn put_strategy(&self, strategy: Strategy) -> Result<(), StoreError> {
        validate_strategy(&strategy)?;

        let mut snap = self.write();
        let config = snap
            .configs
            .get(&strategy.config)
            .ok_or_else(|| StoreError::MissingParent {
                entity: "config",
                id: strategy.config.clone(),
            })?;
        let domain = snap
            .domains
            .get(&config.domain)
            .ok_or_else(|| StoreError::MissingParent {
                entity: "domain",
                id: config.domain.clone(),
            })?;
        strategy.activated.validate_keys(domain, "strategy")?;
        validate_strategy_set(&snap.strategies, &strategy)?;

        let domain_id = config.domain.clone();
        let config_id = strategy.config.clone();
        let existing = snap.strategies.iter().position(|s| s.id == strategy.id);
        match existing {
            Some(index) => snap.strategies[index] = strategy,
            None => snap.strategies.push(strategy),
        }
        drop(snap);

        self.invalidate(
            &domain_id,
            write_action(existing.is_some()),
            Router::Strategy,
            Some(&config_id),
        );
        Ok(())
    }

    pub fn remove_strategy(&self, id: &str) -> Option<Strategy> {
        let mut snap = self.write();
        let index = snap.strategies.iter().position(|s| s.id == id)?;
        let removed = snap.strategies.remove(index);
        let domain_id = snap.configs.get(&removed.config).map(|c| c.domain.clone());
        drop(snap);

        if let Some(domain_id) = domain_id {
            self.invalidate(&domain_id, Action::Delete, Router::Strategy, Some(&removed.config));
        }
        Some(removed)
    }

    pub fn put_permission(&self, permission: Permission) -> Result<(), StoreError> {
        let mut snap = self.write();
        let previous = snap.permissions.insert(permission.id.clone(), permission.clone());
        let domains: Vec<String> = snap
            .teams
            .iter()
            .filter(|t| t.permissions.contains(&permission.id))
            .map(|t| t.domain.clone())
            .collect();
        drop(snap);

        for domain in &domains {
            self.invalidate(domain, permission.action, permission.router, None);
            if let Some(previous) = &previous {
                self.invalidate(domain, previous.action, previous.router, None);
            }
        }
        Ok(())
    }

    pub fn put_team(&self, team: Team) -> Result<(), StoreError> {
        let mut snap = self.write();
        if !snap.domains.contains_key(&team.domain) {
            return Err(StoreError::MissingParent {
                entity: "domain",
                id: team.domain.clone(),
            });
        }
        if let Some(missing) = team
            .permissions
            .iter()
            .find(|id| !snap.permissions.contains_key(*id))
        {
            return Err(StoreError::MissingParent {
                entity: "permission",
                id: missing.clone(),
            });
        }

        let mut domains = vec![team.domain.clone()];
        match snap.teams.iter().position(|t| t.id == team.id) {
            Some(index) => {
                let previous = std::mem::replace(&mut snap.teams[index], team);
                if !domains.contains(&previous.domain) {
                    domains.push(previous.domain);
                }
            }
            None => snap.teams.push(team),
        }
        drop(snap);

        // membership and grants both feed every decision in the domain
        for domain in &domains {
            self.invalidate(domain, Action::All, Router::All, None);
        }
        Ok(())
    }

    pub fn put_admin(&self, admin: Admin) -> Result<(), StoreError> {
        let mut snap = self.write();
        if let Some(missing) = admin
            .teams
            .iter()
            .find(|id| !snap.teams.iter().any(|t| &t.id == *id))
        {
            return Err(StoreError::MissingParent {
                entity: "team",
                id: missing.clone(),
            });
        }
        // teams the admin leaves lose access as much as joined ones gain it
        let previous = snap
            .admins
            .get(&admin.id)
            .map(|a| a.teams.clone())
            .unwrap_or_default();
        let mut domains: Vec<String> = Vec::new();
        for team in snap
            .teams
            .iter()
            .filter(|t| admin.teams.contains(&t.id) || previous.contains(&t.id))
        {
            if !domains.contains(&team.domain) {
                domains.push(team.domain.clone());
            }
        }
        snap.admins.insert(admin.id.clone(), admin);
        drop(snap);

        for domain in &domains {
            self.invalidate(domain, Action::All, Router::All, None);
        }
        Ok(())
    }

    fn invalidate(&self, domain: &str, action: Action, router: Router, parent: Option<&str>) {
        if let Some(cache) = &self.cache {
            cache.invalidate(domain, action, router, parent);
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Snapshot> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CriteriaStore for MemoryStore {
    async fn find_config_by_key(
        &self,
        domain: &str,
        key: &str,
    ) -> Result<Option<Config>, StoreError> {
        Ok(self
            .read()
            .configs
            .values()
            .find(|c| c.domain == domain && c.key == key)
            .cloned())
    }

    async fn find_group_by_id(&self, id: &str) -> Result<Option<GroupConfig>, StoreError> {
        Ok(self.read().groups.get(id).cloned())
    }

    async fn find_domain_by_id(&self, id: &str) -> Result<Option<Domain>, StoreError> {
        Ok(self.read().domains.get(id).cloned())
    }

    async fn find_strategies_by_config(&self, config: &str) -> Result<Vec<Strategy>, StoreError> {
        Ok(self
            .read()
            .strategies
            .iter()
            .filter(|s| s.config == config)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AccessStore for MemoryStore {
    async fn find_teams_by_actor_and_domain(
        &self,
        actor: &str,
        domain: &str,
    ) -> Result<Vec<Team>, StoreError> {
        let snap = self.read();
        let admin_teams = snap.admins.get(actor).map(|a| a.teams.as_slice()).unwrap_or(&[]);
        Ok(snap
            .teams
            .iter()
            .filter(|t| t.domain == domain)
            .filter(|t| t.members.iter().any(|m| m == actor) || admin_teams.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn find_permissions_by_ids(&self, ids: &[String]) -> Result<Vec<Permission>, StoreError> {
        let snap = self.read();
        Ok(ids
            .iter()
            .filter_map(|id| snap.permissions.get(id))
            .cloned()
            .collect())
    }
}
