use miette::Diagnostic;
use thiserror::Error;

use crate::criteria::errors::ValidationError;

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("Failed to load snapshot file `{path}`")]
    #[diagnostic(
        code(switcher::store::snapshot_load),
        help("Check that the file exists and contains valid KDL syntax")
    )]
    SnapshotLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid snapshot: {0}")]
    #[diagnostic(
        code(switcher::store::invalid_snapshot),
        help("Snapshot files hold `domain`, `permission`, `team` and `admin` KDL nodes")
    )]
    InvalidSnapshot(String),

    #[error("KDL parse error: {0}")]
    #[diagnostic(
        code(switcher::store::kdl_parse),
        help("Check your KDL file syntax (https://kdl.dev)")
    )]
    KdlParse(String),

    #[error("{entity} `{id}` does not exist")]
    #[diagnostic(code(switcher::store::missing_parent))]
    MissingParent { entity: &'static str, id: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error("Store unavailable: {0}")]
    #[diagnostic(code(switcher::store::unavailable))]
    Unavailable(String),

    #[error("I/O error: {0}")]
    #[diagnostic(code(switcher::store::io))]
    Io(#[from] std::io::Error),
}
