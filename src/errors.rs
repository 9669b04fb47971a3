use miette::Diagnostic;
use thiserror::Error;

use crate::access::errors::AccessError;
use crate::criteria::errors::CriteriaError;
use crate::store::errors::StoreError;

#[derive(Debug, Error, Diagnostic)]
pub enum SwitcherError {
    #[error("I/O error: {0}")]
    #[diagnostic(code(switcher::io))]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    #[diagnostic(code(switcher::config))]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(switcher::serde))]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Criteria(#[from] CriteriaError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Access(#[from] AccessError),

    #[error("{0}")]
    #[diagnostic(code(switcher::other))]
    Other(String),
}
