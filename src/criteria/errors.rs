use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

use crate::store::errors::StoreError;

/// Write-time violations: malformed operands, illegal operations, activation
/// maps naming undeclared environments.
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown strategy type `{0}`")]
    #[diagnostic(
        code(switcher::validation::unknown_strategy),
        help("Supported strategies: VALUE, NUMERIC, NETWORK, TIME, DATE, REGEX, PAYLOAD")
    )]
    UnknownStrategy(String),

    #[error("Unknown operation `{0}`")]
    #[diagnostic(
        code(switcher::validation::unknown_operation),
        help("Supported operations: EQUAL, NOT_EQUAL, EXIST, NOT_EXIST, GREATER, LOWER, BETWEEN, HAS_ONE, HAS_ALL")
    )]
    UnknownOperation(String),

    #[error("Operation `{operation}` is not available for strategy `{strategy}`")]
    #[diagnostic(code(switcher::validation::illegal_operation))]
    IllegalOperation { strategy: String, operation: String },

    #[error("Operation `{operation}` expects {expected} value(s), got {actual}")]
    #[diagnostic(code(switcher::validation::operand_count))]
    OperandCount {
        operation: String,
        expected: String,
        actual: usize,
    },

    #[error("Invalid value `{value}` for strategy `{strategy}` (expected {expected})")]
    #[diagnostic(code(switcher::validation::invalid_operand))]
    InvalidOperand {
        strategy: String,
        value: String,
        expected: String,
    },

    #[error("Strategy `{strategy}` already exists for environment `{environment}`")]
    #[diagnostic(
        code(switcher::validation::duplicate_strategy),
        help("A switcher holds at most one strategy of each type per environment")
    )]
    DuplicateStrategy {
        strategy: String,
        environment: String,
    },

    #[error("Environment `{environment}` is not declared by domain `{domain}` ({entity})")]
    #[diagnostic(code(switcher::validation::undeclared_environment))]
    UndeclaredEnvironment {
        domain: String,
        environment: String,
        entity: String,
    },

    #[error("The `default` environment cannot be removed")]
    #[diagnostic(code(switcher::validation::default_environment))]
    DefaultEnvironment,
}

#[derive(Debug, Error, Diagnostic)]
pub enum CriteriaError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity} `{id}` not found")]
    #[diagnostic(code(switcher::criteria::not_found))]
    NotFound { entity: &'static str, id: String },

    #[error("Relay call failed: {0}")]
    #[diagnostic(code(switcher::criteria::relay))]
    Relay(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

impl CriteriaError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CriteriaError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl IntoResponse for CriteriaError {
    fn into_response(self) -> Response {
        let status = match &self {
            CriteriaError::Validation(_) => StatusCode::BAD_REQUEST,
            CriteriaError::NotFound { .. } => StatusCode::NOT_FOUND,
            CriteriaError::Relay(_) => StatusCode::BAD_GATEWAY,
            CriteriaError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
