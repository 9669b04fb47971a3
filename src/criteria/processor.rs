//! One evaluator per strategy type. Operands were validated when the strategy
//! was written; runtime input was not, so unparsable input is a non-match.

use std::net::Ipv4Addr;

use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::criteria::matcher::PatternMatcher;
use crate::criteria::payload::process_payload;
use crate::criteria::registry::{Operation, StrategyType};
use crate::criteria::validator::{parse_date, parse_number, parse_time, Ipv4Block};

/// Decide a single strategy against one input value.
pub async fn process_operation(
    matcher: &PatternMatcher,
    strategy: StrategyType,
    operation: Operation,
    input: &str,
    values: &[String],
) -> bool {
    match strategy {
        StrategyType::Value => process_value(operation, input, values),
        StrategyType::Numeric => process_numeric(operation, input, values),
        StrategyType::Network => process_network(operation, input, values),
        StrategyType::Time => process_time(operation, input, values, Local::now().date_naive()),
        StrategyType::Date => process_date(operation, input, values),
        StrategyType::Regex => process_regex(matcher, operation, input, values).await,
        StrategyType::Payload => process_payload(operation, input, values),
    }
}

pub fn process_value(operation: Operation, input: &str, values: &[String]) -> bool {
    match operation {
        Operation::Exist => values.iter().any(|v| v == input),
        Operation::NotExist => !values.iter().any(|v| v == input),
        Operation::Equal => values.first().is_some_and(|v| v == input),
        Operation::NotEqual => !values.iter().any(|v| v == input),
        _ => false,
    }
}

pub fn process_numeric(operation: Operation, input: &str, values: &[String]) -> bool {
    let Some(input) = parse_number(input) else {
        return false;
    };
    let numbers: Vec<f64> = values.iter().filter_map(|v| parse_number(v)).collect();
    let first = numbers.first().copied();

    match operation {
        Operation::Exist => numbers.iter().any(|n| *n == input),
        Operation::NotExist => !numbers.iter().any(|n| *n == input),
        Operation::Equal => first.is_some_and(|n| input == n),
        Operation::NotEqual => first.is_some_and(|n| input != n),
        Operation::Greater => first.is_some_and(|n| input > n),
        Operation::Lower => first.is_some_and(|n| input < n),
        Operation::Between => match numbers.as_slice() {
            [low, high, ..] => *low <= input && input <= *high,
            _ => false,
        },
        _ => false,
    }
}

/// EXIST and NOT_EXIST share one containment test over every value, bare
/// addresses and CIDR blocks alike.
pub fn process_network(operation: Operation, input: &str, values: &[String]) -> bool {
    let Ok(addr) = input.trim().parse::<Ipv4Addr>() else {
        return false;
    };
    let contained = values
        .iter()
        .filter_map(|v| Ipv4Block::parse(v))
        .any(|block| block.contains(addr));

    match operation {
        Operation::Exist => contained,
        Operation::NotExist => !contained,
        _ => false,
    }
}

/// `HH:mm` operands placed on `today`; bounds are inclusive.
pub fn process_time(operation: Operation, input: &str, values: &[String], today: NaiveDate) -> bool {
    let on_today = |s: &str| parse_time(s).map(|t| today.and_time(t));
    let Some(input) = on_today(input) else {
        return false;
    };
    let bounds: Vec<NaiveDateTime> = values.iter().filter_map(|v| on_today(v)).collect();
    compare_chrono(operation, input, &bounds)
}

pub fn process_date(operation: Operation, input: &str, values: &[String]) -> bool {
    let Some(input) = parse_date(input) else {
        return false;
    };
    let bounds: Vec<NaiveDateTime> = values.iter().filter_map(|v| parse_date(v)).collect();
    compare_chrono(operation, input, &bounds)
}

fn compare_chrono(operation: Operation, input: NaiveDateTime, bounds: &[NaiveDateTime]) -> bool {
    match (operation, bounds) {
        (Operation::Lower, [limit, ..]) => input <= *limit,
        (Operation::Greater, [limit, ..]) => input >= *limit,
        (Operation::Between, [start, end, ..]) => *start <= input && input <= *end,
        _ => false,
    }
}

pub async fn process_regex(
    matcher: &PatternMatcher,
    operation: Operation,
    input: &str,
    values: &[String],
) -> bool {
    match operation {
        Operation::Exist => matcher.matches_any(values, input).await,
        Operation::NotExist => !matcher.matches_any(values, input).await,
        Operation::Equal => match values.first() {
            Some(pattern) => matcher.matches_full(pattern, input).await,
            None => false,
        },
        Operation::NotEqual => match values.first() {
            Some(pattern) => !matcher.matches_full(pattern, input).await,
            None => false,
        },
        _ => false,
    }
}
