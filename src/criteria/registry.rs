//! Static table of strategy types, the operations each one accepts and how
//! many operands every operation takes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::criteria::errors::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyType {
    #[serde(alias = "VALUE_VALIDATION")]
    Value,
    #[serde(alias = "NUMERIC_VALIDATION")]
    Numeric,
    #[serde(alias = "NETWORK_VALIDATION")]
    Network,
    #[serde(alias = "TIME_VALIDATION")]
    Time,
    #[serde(alias = "DATE_VALIDATION")]
    Date,
    #[serde(alias = "REGEX_VALIDATION")]
    Regex,
    #[serde(alias = "PAYLOAD_VALIDATION")]
    Payload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Equal,
    NotEqual,
    Exist,
    NotExist,
    Greater,
    Lower,
    Between,
    HasOne,
    HasAll,
}

/// Inclusive operand count range; `max == None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandBounds {
    pub min: usize,
    pub max: Option<usize>,
}

impl OperandBounds {
    pub fn contains(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

impl fmt::Display for OperandBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "exactly {max}"),
            Some(max) => write!(f, "{}..={}", self.min, max),
            None => write!(f, "at least {}", self.min),
        }
    }
}

use Operation::*;

const VALUE_OPS: &[Operation] = &[Exist, NotExist, Equal, NotEqual];
const NUMERIC_OPS: &[Operation] = &[Exist, NotExist, Equal, NotEqual, Lower, Greater, Between];
const NETWORK_OPS: &[Operation] = &[Exist, NotExist];
const CHRONO_OPS: &[Operation] = &[Lower, Greater, Between];
const REGEX_OPS: &[Operation] = &[Exist, NotExist, Equal, NotEqual];
const PAYLOAD_OPS: &[Operation] = &[HasOne, HasAll];

impl StrategyType {
    pub const ALL: [StrategyType; 7] = [
        StrategyType::Value,
        StrategyType::Numeric,
        StrategyType::Network,
        StrategyType::Time,
        StrategyType::Date,
        StrategyType::Regex,
        StrategyType::Payload,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyType::Value => "VALUE",
            StrategyType::Numeric => "NUMERIC",
            StrategyType::Network => "NETWORK",
            StrategyType::Time => "TIME",
            StrategyType::Date => "DATE",
            StrategyType::Regex => "REGEX",
            StrategyType::Payload => "PAYLOAD",
        }
    }

    /// Operations accepted by this strategy, in declaration order.
    pub fn operations(&self) -> &'static [Operation] {
        match self {
            StrategyType::Value => VALUE_OPS,
            StrategyType::Numeric => NUMERIC_OPS,
            StrategyType::Network => NETWORK_OPS,
            StrategyType::Time | StrategyType::Date => CHRONO_OPS,
            StrategyType::Regex => REGEX_OPS,
            StrategyType::Payload => PAYLOAD_OPS,
        }
    }

    pub fn supports(&self, operation: Operation) -> bool {
        self.operations().contains(&operation)
    }

    /// Human readable description of the operand syntax, if the type has one.
    pub fn operand_format(&self) -> Option<&'static str> {
        match self {
            StrategyType::Network => Some("IPv4 address or CIDR block (e.g. 10.0.0.1 or 10.0.0.0/24)"),
            StrategyType::Time => Some("HH:mm (e.g. 08:30)"),
            StrategyType::Date => Some("YYYY-MM-DD or YYYY-MM-DDTHH:mm (e.g. 2024-05-01T10:00)"),
            StrategyType::Numeric => Some("decimal number (e.g. 42 or 3.5)"),
            StrategyType::Regex => Some("valid regular expression"),
            StrategyType::Value | StrategyType::Payload => None,
        }
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_suffix("_VALIDATION").unwrap_or(s);
        StrategyType::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| ValidationError::UnknownStrategy(s.to_string()))
    }
}

impl Operation {
    pub const ALL: [Operation; 9] = [
        Equal, NotEqual, Exist, NotExist, Greater, Lower, Between, HasOne, HasAll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Equal => "EQUAL",
            NotEqual => "NOT_EQUAL",
            Exist => "EXIST",
            NotExist => "NOT_EXIST",
            Greater => "GREATER",
            Lower => "LOWER",
            Between => "BETWEEN",
            HasOne => "HAS_ONE",
            HasAll => "HAS_ALL",
        }
    }

    pub fn bounds(&self) -> OperandBounds {
        match self {
            Equal | Greater | Lower => OperandBounds {
                min: 1,
                max: Some(1),
            },
            Between => OperandBounds {
                min: 2,
                max: Some(2),
            },
            NotEqual | Exist | NotExist | HasOne | HasAll => OperandBounds { min: 1, max: None },
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownOperation(s.to_string()))
    }
}

pub fn operations_for(strategy: StrategyType) -> &'static [Operation] {
    strategy.operations()
}

pub fn operand_bounds(operation: Operation) -> OperandBounds {
    operation.bounds()
}
