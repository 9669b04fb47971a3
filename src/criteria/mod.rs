//! Switcher criteria: which strategies exist, how each one decides, and the
//! evaluator that folds them into one answer.

pub mod errors;
pub mod evaluator;
pub mod matcher;
pub mod payload;
pub mod processor;
pub mod registry;
pub mod relay;
pub mod types;
pub mod validator;

pub use evaluator::CriteriaEvaluator;
pub use matcher::PatternMatcher;
