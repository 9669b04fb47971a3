//! Time-boxed regular expression matching.
//!
//! Patterns come from switcher owners and may backtrack catastrophically, so
//! every match runs on its own blocking worker and is raced against a
//! deadline. A worker that loses the race is told to stop and its result is
//! discarded; the caller sees `false` either way.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fancy_regex::RegexBuilder;
use tokio::sync::Semaphore;

use crate::settings::Matcher as MatcherCfg;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);
pub const DEFAULT_MAX_WORKERS: usize = 8;
pub const DEFAULT_BACKTRACK_LIMIT: usize = 1_000_000;

/// Stop signal shared between the caller and one worker.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Pattern may match anywhere in the input.
    Partial,
    /// Pattern must span the whole input.
    Full,
}

#[derive(Debug, Clone)]
pub struct PatternMatcher {
    timeout: Duration,
    backtrack_limit: usize,
    workers: Arc<Semaphore>,
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_MAX_WORKERS, DEFAULT_BACKTRACK_LIMIT)
    }
}

impl PatternMatcher {
    pub fn new(timeout: Duration, max_workers: usize, backtrack_limit: usize) -> Self {
        Self {
            timeout,
            backtrack_limit,
            workers: Arc::new(Semaphore::new(max_workers.max(1))),
        }
    }

    pub fn from_settings(cfg: &MatcherCfg) -> Self {
        Self::new(
            Duration::from_millis(cfg.timeout_ms),
            cfg.max_workers,
            cfg.backtrack_limit,
        )
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// True if any of `patterns` matches somewhere in `input`.
    pub async fn matches_any(&self, patterns: &[String], input: &str) -> bool {
        let patterns = patterns.to_vec();
        let input = input.to_string();
        let limit = self.backtrack_limit;
        self.run_bounded(move |cancel| {
            patterns
                .iter()
                .take_while(|_| !cancel.is_cancelled())
                .any(|p| is_match(p, &input, MatchMode::Partial, limit))
        })
        .await
    }

    /// True if `pattern` matches the whole of `input`.
    pub async fn matches_full(&self, pattern: &str, input: &str) -> bool {
        let pattern = pattern.to_string();
        let input = input.to_string();
        let limit = self.backtrack_limit;
        self.run_bounded(move |_| is_match(&pattern, &input, MatchMode::Full, limit))
            .await
    }

    /// Runs `work` on one pooled blocking worker and waits at most `timeout`
    /// (including the wait for a free worker). Timeouts, panics and a closed
    /// pool all come back as `false`.
    pub async fn run_bounded<F>(&self, work: F) -> bool
    where
        F: FnOnce(&CancelFlag) -> bool + Send + 'static,
    {
        let started = Instant::now();
        let timeout_ms = self.timeout.as_millis() as u64;

        let permit =
            match tokio::time::timeout(self.timeout, self.workers.clone().acquire_owned()).await {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => return false,
                Err(_) => {
                    tracing::warn!(timeout_ms, "no pattern worker became available in time");
                    return false;
                }
            };

        let cancel = CancelFlag::default();
        let worker_cancel = cancel.clone();
        let mut handle = tokio::task::spawn_blocking(move || {
            // the slot stays taken until the worker really finishes
            let _permit = permit;
            if worker_cancel.is_cancelled() {
                return false;
            }
            work(&worker_cancel)
        });

        let remaining = self.timeout.saturating_sub(started.elapsed());
        match tokio::time::timeout(remaining, &mut handle).await {
            Ok(Ok(matched)) => matched,
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "pattern worker failed");
                false
            }
            Err(_) => {
                cancel.cancel();
                handle.abort();
                tracing::warn!(timeout_ms, "pattern match exceeded its deadline");
                false
            }
        }
    }
}

fn is_match(pattern: &str, input: &str, mode: MatchMode, backtrack_limit: usize) -> bool {
    let source = match mode {
        MatchMode::Partial => pattern.to_string(),
        MatchMode::Full => format!("^(?:{pattern})$"),
    };
    let regex = match RegexBuilder::new(&source)
        .backtrack_limit(backtrack_limit)
        .build()
    {
        Ok(regex) => regex,
        Err(err) => {
            tracing::debug!(pattern, error = %err, "pattern does not compile");
            return false;
        }
    };
    match regex.is_match(input) {
        Ok(matched) => matched,
        Err(err) => {
            tracing::debug!(pattern, error = %err, "pattern evaluation aborted");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(|p| p.to_string()).collect()
    }

    #[tokio::test]
    async fn test_matches_any_is_unanchored() {
        let matcher = PatternMatcher::default();
        assert!(matcher.matches_any(&patterns(&["USER_[0-9]+"]), "id=USER_42;").await);
        assert!(
            matcher
                .matches_any(&patterns(&["^admin$", "guest"]), "the guest user")
                .await
        );
        assert!(!matcher.matches_any(&patterns(&["^admin$"]), "administrator").await);
        assert!(!matcher.matches_any(&[], "anything").await);
    }

    #[tokio::test]
    async fn test_matches_full_is_anchored() {
        let matcher = PatternMatcher::default();
        assert!(matcher.matches_full("USER_[0-9]+", "USER_42").await);
        assert!(!matcher.matches_full("USER_[0-9]+", "USER_42x").await);
        assert!(matcher.matches_full("a|b", "b").await);
    }

    #[tokio::test]
    async fn test_invalid_pattern_is_no_match() {
        let matcher = PatternMatcher::default();
        assert!(!matcher.matches_any(&patterns(&["(unclosed"]), "unclosed").await);
        assert!(!matcher.matches_full("[", "[").await);
    }

    #[tokio::test]
    async fn test_backtracking_pattern_is_bounded() {
        let matcher = PatternMatcher::default();
        let input = "a".repeat(48);
        let started = Instant::now();
        let matched = matcher
            .matches_any(&patterns(&["^(([a-z])+.)+[A-Z]([a-z])+$"]), &input)
            .await;
        assert!(!matched);
        assert!(started.elapsed() < DEFAULT_TIMEOUT + Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_slow_worker_times_out_as_false() {
        let matcher = PatternMatcher::new(Duration::from_millis(100), 2, DEFAULT_BACKTRACK_LIMIT);
        let started = Instant::now();
        let matched = matcher
            .run_bounded(|cancel| {
                // cooperates with the cancel flag like the real matcher does
                while !cancel.is_cancelled() {
                    std::thread::sleep(Duration::from_millis(5));
                }
                true
            })
            .await;
        assert!(!matched);
        assert!(started.elapsed() < Duration::from_millis(600));
    }

    #[tokio::test]
    async fn test_worker_slot_released_after_timeout() {
        let matcher = PatternMatcher::new(Duration::from_millis(50), 1, DEFAULT_BACKTRACK_LIMIT);
        let first = matcher
            .run_bounded(|cancel| {
                while !cancel.is_cancelled() {
                    std::thread::sleep(Duration::from_millis(2));
                }
                true
            })
            .await;
        assert!(!first);

        // the cancelled worker exits promptly, so the single slot frees up
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(matcher.run_bounded(|_| true).await);
    }
}
