// Integration tests for switcher criteria evaluation
//
// These tests cover:
// 1. VALUE strategies agreeing / disagreeing
// 2. Inactive hierarchy levels and their reported reason
// 3. Mandatory input for every active strategy
// 4. Catastrophic REGEX patterns bounded by the matcher deadline

mod helpers;

use std::time::{Duration, Instant};

use helpers::{seeded_store, shared, ConfigBuilder, GroupBuilder, StrategyBuilder};
use switcher_core::criteria::errors::CriteriaError;
use switcher_core::criteria::matcher::DEFAULT_BACKTRACK_LIMIT;
use switcher_core::criteria::registry::{Operation, StrategyType};
use switcher_core::criteria::types::CriteriaRequest;
use switcher_core::criteria::{CriteriaEvaluator, PatternMatcher};
use switcher_core::store::MemoryStore;

fn evaluator(store: MemoryStore) -> CriteriaEvaluator<MemoryStore> {
    CriteriaEvaluator::new(shared(store), PatternMatcher::default())
}

#[tokio::test]
async fn test_value_strategy_premium_vs_basic() {
    let eval = evaluator(seeded_store());

    let premium = CriteriaRequest::new("d1").entry(StrategyType::Value, "premium");
    let res = eval.evaluate("FEATURE_X", &premium).await.unwrap();
    assert!(res.result);
    assert_eq!(res.reason, "Success");

    let basic = CriteriaRequest::new("d1").entry(StrategyType::Value, "basic");
    let res = eval.evaluate("FEATURE_X", &basic).await.unwrap();
    assert!(!res.result);
    assert_eq!(res.reason, "Strategy 'VALUE' does not agree");
}

#[tokio::test]
async fn test_every_active_strategy_needs_input() {
    let store = seeded_store();
    StrategyBuilder::new("s2", "c1", StrategyType::Network, Operation::Exist)
        .values(&["10.0.0.0/24"])
        .create(&store);
    let eval = evaluator(store);

    let only_value = CriteriaRequest::new("d1").entry(StrategyType::Value, "premium");
    let res = eval.evaluate("FEATURE_X", &only_value).await.unwrap();
    assert!(!res.result);
    assert_eq!(res.reason, "Strategy 'NETWORK' did not receive any input");

    let both = only_value.clone().entry(StrategyType::Network, "10.0.0.42");
    assert!(eval.evaluate("FEATURE_X", &both).await.unwrap().result);

    let outside = only_value.entry(StrategyType::Network, "10.0.1.1");
    let res = eval.evaluate("FEATURE_X", &outside).await.unwrap();
    assert_eq!(res.reason, "Strategy 'NETWORK' does not agree");
}

#[tokio::test]
async fn test_inactive_levels() {
    let store = seeded_store();
    GroupBuilder::new("g9", "d1").activated("default", false).create(&store);
    ConfigBuilder::new("c9", "IN_OFF_GROUP", "g9", "d1").create(&store);
    ConfigBuilder::new("c8", "OFF", "g1", "d1")
        .activated("default", false)
        .create(&store);
    let eval = evaluator(store);
    let req = CriteriaRequest::new("d1");

    let res = eval.evaluate("IN_OFF_GROUP", &req).await.unwrap();
    assert!(!res.result);
    assert_eq!(res.reason, "Group disabled");

    let res = eval.evaluate("OFF", &req).await.unwrap();
    assert!(!res.result);
    assert_eq!(res.reason, "Config disabled");
}

#[tokio::test]
async fn test_environment_selects_strategies() {
    let store = seeded_store();
    StrategyBuilder::new("s-qa", "c1", StrategyType::Numeric, Operation::Greater)
        .values(&["10"])
        .only_in("QA")
        .create(&store);
    let eval = evaluator(store);

    // in QA only the NUMERIC strategy is active
    let qa = CriteriaRequest::new("d1")
        .environment("QA")
        .entry(StrategyType::Numeric, "11");
    assert!(eval.evaluate("FEATURE_X", &qa).await.unwrap().result);

    let qa_low = CriteriaRequest::new("d1")
        .environment("QA")
        .entry(StrategyType::Numeric, "3");
    assert!(!eval.evaluate("FEATURE_X", &qa_low).await.unwrap().result);
}

#[tokio::test]
async fn test_unknown_switcher() {
    let eval = evaluator(seeded_store());
    let err = eval
        .evaluate("MISSING", &CriteriaRequest::new("d1"))
        .await
        .unwrap_err();
    assert!(matches!(err, CriteriaError::NotFound { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_catastrophic_regex_is_bounded() {
    let store = seeded_store();
    ConfigBuilder::new("c-re", "REGEX_GATE", "g1", "d1").create(&store);
    StrategyBuilder::new("s-re", "c-re", StrategyType::Regex, Operation::Exist)
        .values(&["^(([a-z])+.)+[A-Z]([a-z])+$"])
        .create(&store);
    let eval = CriteriaEvaluator::new(
        shared(store),
        PatternMatcher::new(Duration::from_millis(500), 2, DEFAULT_BACKTRACK_LIMIT),
    );

    let req = CriteriaRequest::new("d1").entry(StrategyType::Regex, "a".repeat(48));
    let started = Instant::now();
    let res = eval.evaluate("REGEX_GATE", &req).await.unwrap();
    assert!(!res.result);
    assert_eq!(res.reason, "Strategy 'REGEX' does not agree");
    assert!(started.elapsed() < Duration::from_millis(1500));
}
