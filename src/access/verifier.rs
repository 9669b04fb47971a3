//! Team/permission based access checks for switcher elements.

use std::collections::HashSet;
use std::sync::Arc;

use crate::access::cache::{AccessCache, CacheKey};
use crate::access::errors::AccessError;
use crate::access::types::{AccessRequest, Element, Permission};
use crate::store::AccessStore;

pub struct AccessVerifier<S> {
    store: Arc<S>,
    cache: Option<Arc<AccessCache>>,
}

impl<S: AccessStore> AccessVerifier<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store, cache: None }
    }

    pub fn with_cache(mut self, cache: Arc<AccessCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// A single element passes whole or the check fails.
    pub async fn verify_one<E: Element + Clone>(
        &self,
        req: &AccessRequest<'_>,
        element: E,
    ) -> Result<E, AccessError> {
        self.verify_many(req, vec![element])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| denied(req))
    }

    /// Elements the actor may act on, in input order and without duplicate
    /// ids. Fails when nothing is allowed.
    pub async fn verify_many<E: Element + Clone>(
        &self,
        req: &AccessRequest<'_>,
        elements: Vec<E>,
    ) -> Result<Vec<E>, AccessError> {
        if req.actor == req.domain.owner {
            return Ok(dedup_by_id(elements));
        }
        let permissions = self.applicable_permissions(req).await?;
        allowed_elements(req, &permissions, elements)
    }

    /// [`verify_many`](Self::verify_many) with the applicable permissions
    /// memoized on the request. Elements are always matched afresh.
    pub async fn verify_many_cached<E: Element + Clone>(
        &self,
        req: &AccessRequest<'_>,
        elements: Vec<E>,
    ) -> Result<Vec<E>, AccessError> {
        let Some(cache) = &self.cache else {
            return self.verify_many(req, elements).await;
        };
        if req.actor == req.domain.owner {
            return Ok(dedup_by_id(elements));
        }
        let key = CacheKey::new(
            req.actor,
            &req.domain.id,
            req.parent,
            &req.actions,
            req.router,
            req.environment,
        );

        let permissions = match cache.get(&key) {
            Some(permissions) => permissions,
            None => {
                let permissions = self.applicable_permissions(req).await?;
                cache.set(key, permissions.clone());
                permissions
            }
        };
        allowed_elements(req, &permissions, elements)
    }

    /// Active permissions of the actor's active teams that match the
    /// request's actions, router and environment. Fails when the actor has
    /// no active team in the domain.
    async fn applicable_permissions(
        &self,
        req: &AccessRequest<'_>,
    ) -> Result<Vec<Permission>, AccessError> {
        let teams: Vec<_> = self
            .store
            .find_teams_by_actor_and_domain(req.actor, &req.domain.id)
            .await?
            .into_iter()
            .filter(|t| t.active)
            .collect();
        if teams.is_empty() {
            tracing::debug!(actor = req.actor, domain = %req.domain.id, "actor has no active team");
            return Err(denied(req));
        }

        let mut applicable = Vec::new();
        for team in &teams {
            let permissions = self.store.find_permissions_by_ids(&team.permissions).await?;
            applicable.extend(permissions.into_iter().filter(|p| applies(p, req)));
        }
        Ok(applicable)
    }
}

fn allowed_elements<E: Element>(
    req: &AccessRequest<'_>,
    permissions: &[Permission],
    elements: Vec<E>,
) -> Result<Vec<E>, AccessError> {
    // an empty listing is fine as long as some permission matched
    if elements.is_empty() && !permissions.is_empty() {
        return Ok(elements);
    }
    let allowed: Vec<E> = elements
        .into_iter()
        .filter(|e| permissions.iter().any(|p| identifies(p, e)))
        .collect();
    let allowed = dedup_by_id(allowed);
    if allowed.is_empty() {
        return Err(denied(req));
    }
    Ok(allowed)
}

fn applies(permission: &Permission, req: &AccessRequest<'_>) -> bool {
    permission.active
        && permission.router.grants(req.router, req.cascade)
        && permission.allows_action(&req.actions)
        && permission.allows_environment(req.environment)
}

fn identifies<E: Element>(permission: &Permission, element: &E) -> bool {
    match &permission.identified_by {
        Some(field) => element
            .field(field)
            .is_some_and(|value| permission.values.contains(&value)),
        None => true,
    }
}

fn dedup_by_id<E: Element>(elements: Vec<E>) -> Vec<E> {
    let mut seen = HashSet::new();
    elements.into_iter().filter(|e| seen.insert(e.id())).collect()
}

fn denied(req: &AccessRequest<'_>) -> AccessError {
    let actions: Vec<&str> = req.actions.iter().map(|a| a.as_str()).collect();
    AccessError::PermissionDenied(format!(
        "`{}` cannot {} {} in domain `{}`",
        req.actor,
        actions.join("/"),
        req.router,
        req.domain.id
    ))
}
