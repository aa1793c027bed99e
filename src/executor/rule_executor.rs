use std::{fmt::Display, sync::Arc, time::Instant};

use tracing::{debug, trace, warn};

use crate::{
    analyzer::{AnalyzerError, AnalyzerResult},
    executor::{Batch, QueryPlanningTracker, Strategy},
};

/// Drives batches of rules over a tree.
///
/// Each rule invocation is timed and recorded into the current
/// [`QueryPlanningTracker`] of the thread, if one is installed.
pub trait RuleExecutor<T>
where
    T: Clone + PartialEq + Display,
{
    fn name(&self) -> &str;

    fn batches(&self) -> &[Batch<T>];

    /// Checked after every rule that changed the tree.
    fn is_plan_integral(&self, _previous: &T, _current: &T) -> bool {
        true
    }

    fn plan_change_logging(&self) -> bool {
        false
    }

    /// Re-run `Once` batches and fail if the second pass changes anything.
    fn check_once_idempotence(&self) -> bool {
        false
    }

    fn execute(&self, plan: T) -> AnalyzerResult<T> {
        let tracker = QueryPlanningTracker::current();
        let mut current = plan;

        for batch in self.batches() {
            let batch_start = current.clone();
            let max_iterations = batch.strategy.max_iterations();
            if max_iterations == 0 {
                trace!(batch = %batch.name, "batch allows no passes, skipped");
                continue;
            }
            let mut iteration = 1;

            loop {
                let pass_start = current.clone();
                for rule in &batch.rules {
                    let before = current.clone();
                    let started = Instant::now();
                    let after = rule.apply(current)?;
                    let elapsed = started.elapsed();
                    let effective = after != before;

                    if effective {
                        if self.plan_change_logging() {
                            debug!(rule = rule.name(), batch = %batch.name, before = %before, after = %after, "rule changed plan");
                        }
                        if !self.is_plan_integral(&before, &after) {
                            return Err(AnalyzerError::PlanIntegrity {
                                rule: rule.name().to_string(),
                                batch: batch.name.clone(),
                            });
                        }
                    }
                    if let Some(tracker) = &tracker {
                        tracker.record_rule_invocation(rule.name(), elapsed, effective);
                    }
                    current = after;
                }

                if batch.strategy == Strategy::Once && self.check_once_idempotence() {
                    self.check_batch_idempotence(batch, &current)?;
                }

                if current == pass_start {
                    trace!(batch = %batch.name, iterations = iteration, "fixed point reached");
                    break;
                }

                if iteration >= max_iterations {
                    if let Strategy::FixedPoint { error_on_exceed: true, .. } = batch.strategy {
                        return Err(AnalyzerError::MaxIterationsExceeded {
                            batch: batch.name.clone(),
                            iterations: max_iterations,
                        });
                    }
                    // single-pass batches are not expected to converge
                    if max_iterations > 1 {
                        warn!(executor = self.name(), batch = %batch.name, iterations = max_iterations, "max iterations reached");
                    }
                    break;
                }
                iteration += 1;
            }

            if self.plan_change_logging() {
                if current != batch_start {
                    debug!(batch = %batch.name, before = %batch_start, after = %current, "result of batch");
                } else {
                    trace!(batch = %batch.name, "batch has no effect");
                }
            }
        }

        Ok(current)
    }

    fn execute_and_track(&self, plan: T, tracker: Arc<QueryPlanningTracker>) -> AnalyzerResult<T> {
        QueryPlanningTracker::with_tracker(tracker, || self.execute(plan))
    }

    #[doc(hidden)]
    fn check_batch_idempotence(&self, batch: &Batch<T>, plan: &T) -> AnalyzerResult<()> {
        let mut rerun = plan.clone();
        for rule in &batch.rules {
            rerun = rule.apply(rerun)?;
        }
        if rerun != *plan {
            return Err(AnalyzerError::OnceBatchNotIdempotent { batch: batch.name.clone() });
        }
        Ok(())
    }
}
