pub mod cache;
pub mod errors;
pub mod types;
pub mod verifier;

pub use cache::{AccessCache, CacheKey, DecisionCache};
pub use verifier::AccessVerifier;
