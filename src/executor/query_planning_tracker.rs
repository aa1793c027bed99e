use std::{
    cell::RefCell,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Well-known phase names.
pub const PARSING: &str = "parsing";
pub const ANALYSIS: &str = "analysis";
pub const OPTIMIZATION: &str = "optimization";
pub const PLANNING: &str = "planning";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub start_time_ms: i64,
    pub end_time_ms: i64,
}

impl PhaseSummary {
    pub fn duration_ms(&self) -> i64 {
        self.end_time_ms - self.start_time_ms
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSummary {
    pub total_time_ns: u64,
    pub num_invocations: u64,
    pub num_effective_invocations: u64,
}

/// Point-in-time copy of everything a tracker has recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerSnapshot {
    pub phases: IndexMap<String, PhaseSummary>,
    pub rules: IndexMap<String, RuleSummary>,
}

/// Phase timings and per-rule statistics for one compilation.
///
/// Rule code reaches the tracker of the running compilation through
/// [`QueryPlanningTracker::current`], installed by [`QueryPlanningTracker::with_tracker`].
#[derive(Debug, Default)]
pub struct QueryPlanningTracker {
    phases: Mutex<IndexMap<String, PhaseSummary>>,
    rules: Mutex<IndexMap<String, RuleSummary>>,
}

thread_local! {
    static CURRENT: RefCell<Option<Arc<QueryPlanningTracker>>> = const { RefCell::new(None) };
}

/// Puts the previous tracker back when the scope ends, on unwind as well.
struct TrackerScope {
    previous: Option<Arc<QueryPlanningTracker>>,
}

impl Drop for TrackerScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let _ = CURRENT.try_with(|c| *c.borrow_mut() = previous);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl QueryPlanningTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Run `body` with `tracker` as the current tracker of this thread.
    pub fn with_tracker<R>(tracker: Arc<QueryPlanningTracker>, body: impl FnOnce() -> R) -> R {
        let previous = CURRENT.with(|c| c.borrow_mut().replace(tracker));
        let _scope = TrackerScope { previous };
        body()
    }

    pub fn current() -> Option<Arc<QueryPlanningTracker>> {
        CURRENT.with(|c| c.borrow().clone())
    }

    /// Time `f` as `phase`. A phase measured twice keeps its first start.
    pub fn measure_phase<R>(&self, phase: &str, f: impl FnOnce() -> R) -> R {
        let start_time_ms = Utc::now().timestamp_millis();
        let result = f();
        let end_time_ms = Utc::now().timestamp_millis();

        let mut phases = lock(&self.phases);
        phases
            .entry(phase.to_string())
            .and_modify(|p| p.end_time_ms = end_time_ms)
            .or_insert(PhaseSummary { start_time_ms, end_time_ms });
        result
    }

    pub fn record_rule_invocation(&self, rule: &str, elapsed: Duration, effective: bool) {
        let mut rules = lock(&self.rules);
        let summary = rules.entry(rule.to_string()).or_default();
        summary.total_time_ns = summary.total_time_ns.saturating_add(elapsed.as_nanos() as u64);
        summary.num_invocations += 1;
        if effective {
            summary.num_effective_invocations += 1;
        }
    }

    pub fn phases(&self) -> IndexMap<String, PhaseSummary> {
        lock(&self.phases).clone()
    }

    pub fn rules(&self) -> IndexMap<String, RuleSummary> {
        lock(&self.rules).clone()
    }

    /// The `k` rules with the largest total time, ties broken by name.
    pub fn top_rules_by_time(&self, k: usize) -> Vec<(String, RuleSummary)> {
        if k == 0 {
            return Vec::new();
        }
        let mut rules: Vec<(String, RuleSummary)> = self.rules().into_iter().collect();
        rules.sort_by(|(an, a), (bn, b)| b.total_time_ns.cmp(&a.total_time_ns).then_with(|| an.cmp(bn)));
        rules.truncate(k);
        rules
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot { phases: self.phases(), rules: self.rules() }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.snapshot())
    }
}
