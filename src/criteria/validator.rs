//! Write-time checks for strategies. The evaluator trusts whatever passed
//! through here.

use std::net::Ipv4Addr;

use chrono::{NaiveDateTime, NaiveTime};

use crate::criteria::errors::ValidationError;
use crate::criteria::registry::StrategyType;
use crate::model::Strategy;

/// An IPv4 block; a bare address is a `/32` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ipv4Block {
    network: u32,
    prefix: u8,
}

impl Ipv4Block {
    pub(crate) fn parse(value: &str) -> Option<Self> {
        let (addr, prefix) = match value.split_once('/') {
            Some((addr, len)) => (addr, len.parse::<u8>().ok()?),
            None => (value, 32),
        };
        if prefix > 32 {
            return None;
        }
        let addr: Ipv4Addr = addr.parse().ok()?;
        Some(Self {
            network: u32::from(addr),
            prefix,
        })
    }

    fn mask(&self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(self.prefix))
        }
    }

    pub(crate) fn contains(&self, addr: Ipv4Addr) -> bool {
        let mask = self.mask();
        u32::from(addr) & mask == self.network & mask
    }
}

/// `HH:mm`, two digits each.
pub(crate) fn parse_time(value: &str) -> Option<NaiveTime> {
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return None;
    }
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

/// `YYYY-MM-DD` (midnight) or `YYYY-MM-DDTHH:mm`.
pub(crate) fn parse_date(value: &str) -> Option<NaiveDateTime> {
    match value.len() {
        10 => chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()?
            .and_hms_opt(0, 0, 0),
        16 => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").ok(),
        _ => None,
    }
}

pub(crate) fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// Checks a single operand against the syntax its strategy type requires.
pub fn validate_operand(strategy: StrategyType, value: &str) -> Result<(), ValidationError> {
    let valid = match strategy {
        StrategyType::Network => Ipv4Block::parse(value).is_some(),
        StrategyType::Time => parse_time(value).is_some(),
        StrategyType::Date => parse_date(value).is_some(),
        StrategyType::Numeric => parse_number(value).is_some(),
        StrategyType::Regex => fancy_regex::Regex::new(value).is_ok(),
        StrategyType::Value | StrategyType::Payload => true,
    };
    if valid {
        return Ok(());
    }
    Err(ValidationError::InvalidOperand {
        strategy: strategy.to_string(),
        value: value.to_string(),
        expected: strategy.operand_format().unwrap_or("any").to_string(),
    })
}

/// Operation legality, operand count and operand syntax.
pub fn validate_strategy(strategy: &Strategy) -> Result<(), ValidationError> {
    if !strategy.strategy.supports(strategy.operation) {
        return Err(ValidationError::IllegalOperation {
            strategy: strategy.strategy.to_string(),
            operation: strategy.operation.to_string(),
        });
    }

    let bounds = strategy.operation.bounds();
    if !bounds.contains(strategy.values.len()) {
        return Err(ValidationError::OperandCount {
            operation: strategy.operation.to_string(),
            expected: bounds.to_string(),
            actual: strategy.values.len(),
        });
    }

    for value in &strategy.values {
        validate_operand(strategy.strategy, value)?;
    }
    Ok(())
}

/// Rejects `candidate` when another strategy of the same type under the same
/// switcher is already scoped to one of its environments.
pub fn validate_strategy_set(
    existing: &[Strategy],
    candidate: &Strategy,
) -> Result<(), ValidationError> {
    let clash = existing
        .iter()
        .filter(|s| {
            s.id != candidate.id && s.config == candidate.config && s.strategy == candidate.strategy
        })
        .flat_map(|s| s.activated.environments())
        .find(|env| candidate.activated.get(env).is_some());

    match clash {
        Some(environment) => Err(ValidationError::DuplicateStrategy {
            strategy: candidate.strategy.to_string(),
            environment: environment.to_string(),
        }),
        None => Ok(()),
    }
}
