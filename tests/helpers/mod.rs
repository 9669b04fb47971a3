#![allow(dead_code)]

pub mod builders;

use std::sync::Arc;

use switcher_core::access::types::{Action, Router};
use switcher_core::criteria::registry::{Operation, StrategyType};
use switcher_core::store::MemoryStore;

pub use builders::{
    ConfigBuilder, DomainBuilder, GroupBuilder, PermissionBuilder, StrategyBuilder, TeamBuilder,
};

pub const OWNER: &str = "owner-1";
pub const MEMBER: &str = "admin-1";

/// Domain `d1` (environments `default` and `QA`) with group `g1` "Release 1",
/// group `g2` "Release 2", switcher `FEATURE_X` in `g1` holding a
/// VALUE/EXIST strategy on `premium`, and team `t1` containing [`MEMBER`]
/// with no permissions.
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    seed(&store);
    store
}

pub fn seed(store: &MemoryStore) {
    DomainBuilder::new("d1")
        .owner(OWNER)
        .environment("QA")
        .create(store);
    GroupBuilder::new("g1", "d1").name("Release 1").create(store);
    GroupBuilder::new("g2", "d1").name("Release 2").create(store);
    ConfigBuilder::new("c1", "FEATURE_X", "g1", "d1").create(store);
    StrategyBuilder::new("s1", "c1", StrategyType::Value, Operation::Exist)
        .values(&["premium"])
        .create(store);
    TeamBuilder::new("t1", "d1").member(MEMBER).create(store);
}

/// Replace team `t1` with one granting `permissions`.
pub fn grant(store: &MemoryStore, permissions: Vec<PermissionBuilder>) {
    let mut team = TeamBuilder::new("t1", "d1").member(MEMBER);
    for permission in permissions {
        team = team.permission(&permission.create(store));
    }
    team.create(store);
}

pub fn permission(id: &str, action: Action, router: Router) -> PermissionBuilder {
    PermissionBuilder::new(id, action, router)
}

pub fn shared(store: MemoryStore) -> Arc<MemoryStore> {
    Arc::new(store)
}
