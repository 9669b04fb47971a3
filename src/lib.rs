//! Switcher core - feature switch evaluation and access policy verification.
//!
//! This library exposes the decision engine (criteria evaluation, bounded
//! pattern matching, access verification, decision caching) together with an
//! in-memory store and a thin HTTP surface.

pub mod access;
pub mod criteria;
pub mod errors;
pub mod model;
pub mod settings;
pub mod store;
pub mod web;
