//! Memoized access decisions, invalidated by the write side.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::access::types::{Action, Permission, Router};

/// Cached decisions hold the permissions that apply to the request. Elements
/// are matched against them again on every call.
pub type AccessCache = DecisionCache<Vec<Permission>>;

/// Canonical key of one access decision. Actions are kept sorted and
/// de-duplicated so `[READ, UPDATE]` and `[UPDATE, READ]` collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub actor: String,
    pub domain: String,
    pub parent: Option<String>,
    pub actions: Vec<Action>,
    pub router: Router,
    pub environment: Option<String>,
}

impl CacheKey {
    pub fn new(
        actor: &str,
        domain: &str,
        parent: Option<&str>,
        actions: &[Action],
        router: Router,
        environment: Option<&str>,
    ) -> Self {
        let mut actions = actions.to_vec();
        actions.sort();
        actions.dedup();
        Self {
            actor: actor.to_string(),
            domain: domain.to_string(),
            parent: parent.map(str::to_string),
            actions,
            router,
            environment: environment.map(str::to_string),
        }
    }

    /// Stable string form, e.g. `d1|admin-1|g1|READ,UPDATE|CONFIG|default`.
    pub fn encode(&self) -> String {
        let actions: Vec<&str> = self.actions.iter().map(Action::as_str).collect();
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.domain,
            self.actor,
            self.parent.as_deref().unwrap_or("*"),
            actions.join(","),
            self.router,
            self.environment.as_deref().unwrap_or("*"),
        )
    }

    fn affected_by(
        &self,
        domain: &str,
        action: Action,
        router: Router,
        parent: Option<&str>,
    ) -> bool {
        self.domain == domain
            && self.actions.iter().any(|a| a.intersects(action))
            && self.router.intersects(router)
            && parent.map_or(true, |p| self.parent.as_deref() == Some(p))
    }
}

#[derive(Debug)]
pub struct DecisionCache<V> {
    enabled: AtomicBool,
    entries: Mutex<HashMap<CacheKey, V>>,
}

impl<V: Clone> Default for DecisionCache<V> {
    fn default() -> Self {
        Self::new(false)
    }
}

impl<V: Clone> DecisionCache<V> {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Switching the cache off drops everything it holds.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
        if !enabled {
            self.clear();
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<V> {
        if !self.is_enabled() {
            return None;
        }
        self.lock().get(key).cloned()
    }

    pub fn set(&self, key: CacheKey, value: V) {
        if !self.is_enabled() {
            return;
        }
        tracing::debug!(key = %key.encode(), "caching access decision");
        self.lock().insert(key, value);
    }

    pub fn has(&self, key: &CacheKey) -> bool {
        self.is_enabled() && self.lock().contains_key(key)
    }

    /// Drops every entry of `domain` whose actions and router intersect the
    /// mutated `(action, router)` pair, narrowed to `parent` when given.
    /// Returns how many entries were removed.
    pub fn invalidate(
        &self,
        domain: &str,
        action: Action,
        router: Router,
        parent: Option<&str>,
    ) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.affected_by(domain, action, router, parent));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(domain, %action, %router, removed, "invalidated access decisions");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, V>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
