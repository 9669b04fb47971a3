//! Data collaborators the core reads from. Persistence lives elsewhere; the
//! core only needs these lookups and treats a missing entity as terminal.

pub mod errors;
pub mod loader;
pub mod memory;

use async_trait::async_trait;

use crate::access::types::{Permission, Team};
use crate::model::{Config, Domain, GroupConfig, Strategy};
use errors::StoreError;

pub use memory::MemoryStore;

#[async_trait]
pub trait CriteriaStore: Send + Sync {
    async fn find_config_by_key(&self, domain: &str, key: &str)
        -> Result<Option<Config>, StoreError>;

    async fn find_group_by_id(&self, id: &str) -> Result<Option<GroupConfig>, StoreError>;

    async fn find_domain_by_id(&self, id: &str) -> Result<Option<Domain>, StoreError>;

    /// Strategies of a switcher, in stored order.
    async fn find_strategies_by_config(&self, config: &str) -> Result<Vec<Strategy>, StoreError>;
}

#[async_trait]
pub trait AccessStore: Send + Sync {
    async fn find_teams_by_actor_and_domain(
        &self,
        actor: &str,
        domain: &str,
    ) -> Result<Vec<Team>, StoreError>;

    /// Permissions with the given ids, in the order of `ids`; unknown ids are skipped.
    async fn find_permissions_by_ids(&self, ids: &[String]) -> Result<Vec<Permission>, StoreError>;
}
