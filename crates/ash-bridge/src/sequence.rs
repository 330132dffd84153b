//! Sequence pattern: run a list of actions one after another
//!
//! Each step goes through the dispatcher and is awaited before the next one
//! starts. Failing steps are recorded and the run continues.

use crate::dispatcher::CommandDispatcher;
use crate::error::{BridgeError, BridgeResult};
use crate::response::ResponseResult;
use crate::transport::ChannelTransport;
use ash_core::ToolStatus;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Action name recorded for steps that do not name one.
pub const UNKNOWN_ACTION: &str = "unknown";

/// Default pause between steps, in seconds.
pub const DEFAULT_DELAY_SECS: f64 = 1.0;

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// Zero-based position in the submitted sequence
    pub index: usize,
    pub action: String,
    pub result: ResponseResult,
}

/// Aggregate of a sequence run.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceSummary {
    pub status: ToolStatus,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<StepResult>,
}

impl SequenceSummary {
    fn from_results(results: Vec<StepResult>) -> Self {
        let total = results.len();
        let successful = results.iter().filter(|s| s.result.is_success()).count();
        let failed = total - successful;
        Self {
            status: if failed == 0 {
                ToolStatus::Success
            } else {
                ToolStatus::Partial
            },
            total,
            successful,
            failed,
            results,
        }
    }

    pub fn message(&self) -> String {
        let mut message = format!(
            "Sequence finished: {}/{} succeeded",
            self.successful, self.total
        );
        if self.failed > 0 {
            message.push_str(&format!(", {} failed", self.failed));
        }
        message
    }
}

/// Convert a caller-supplied delay in seconds.
///
/// Non-positive and non-finite values mean no delay.
pub fn delay_from_secs(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}

/// Runs action sequences through a dispatcher.
pub struct SequenceRunner<T: ChannelTransport> {
    dispatcher: CommandDispatcher<T>,
}

impl<T: ChannelTransport> SequenceRunner<T> {
    pub fn new(dispatcher: CommandDispatcher<T>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<T> {
        &self.dispatcher
    }

    /// Run `steps` in order, pausing `delay` between consecutive steps.
    ///
    /// Each step is an object `{"action": name, ...parameters}`.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Validation` for an empty sequence. Nothing is
    /// sent in that case. Every other failure is captured per step.
    pub async fn run(&self, steps: &[Value], delay: Duration) -> BridgeResult<SequenceSummary> {
        if steps.is_empty() {
            return Err(BridgeError::Validation("Sequence is empty".to_string()));
        }

        info!("Starting sequence with {} steps", steps.len());
        let mut results = Vec::with_capacity(steps.len());

        for (index, step) in steps.iter().enumerate() {
            let (action, result) = self.run_step(step).await;
            debug!(
                "Sequence step {}/{}: {} -> {}",
                index + 1,
                steps.len(),
                action,
                if result.is_success() { "ok" } else { "failed" }
            );
            results.push(StepResult {
                index,
                action,
                result,
            });

            if index + 1 < steps.len() && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        let summary = SequenceSummary::from_results(results);
        info!("{}", summary.message());
        Ok(summary)
    }

    async fn run_step(&self, step: &Value) -> (String, ResponseResult) {
        let Some(object) = step.as_object() else {
            return (
                UNKNOWN_ACTION.to_string(),
                ResponseResult::error(BridgeError::Validation(
                    "Sequence step must be an object".to_string(),
                )),
            );
        };
        let Some(action) = object.get("action").and_then(Value::as_str) else {
            return (
                UNKNOWN_ACTION.to_string(),
                ResponseResult::error(BridgeError::Validation(
                    "Sequence step has no action".to_string(),
                )),
            );
        };

        let parameters: Map<String, Value> = object
            .iter()
            .filter(|(key, _)| key.as_str() != "action")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let result = self.dispatcher.execute(action, &parameters).await;
        (action.to_string(), result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryChannel;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::time::Instant;

    fn runner(channel: MemoryChannel) -> SequenceRunner<MemoryChannel> {
        SequenceRunner::new(CommandDispatcher::with_defaults(Arc::new(channel)))
    }

    #[tokio::test(start_paused = true)]
    async fn empty_sequence_is_rejected_before_sending() {
        let runner = runner(MemoryChannel::echoing());
        let err = runner.run(&[], Duration::ZERO).await.unwrap_err();

        assert_eq!(err, BridgeError::Validation("Sequence is empty".into()));
        assert!(runner.dispatcher().transport().commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_step_makes_the_run_partial() {
        let runner = runner(MemoryChannel::echoing());
        let steps = vec![
            json!({"action": "adjust_height", "height": 100}),
            json!({"action": "fly"}),
            json!({"action": "reset"}),
        ];

        let summary = runner.run(&steps, Duration::ZERO).await.unwrap();

        assert_eq!(summary.status, ToolStatus::Partial);
        assert_eq!((summary.total, summary.successful, summary.failed), (3, 2, 1));
        let order: Vec<_> = summary
            .results
            .iter()
            .map(|s| (s.index, s.action.as_str()))
            .collect();
        assert_eq!(order, vec![(0, "adjust_height"), (1, "fly"), (2, "reset")]);
        assert!(!summary.results[1].result.is_success());
        assert_eq!(runner.dispatcher().transport().commands().len(), 2);
        assert_eq!(summary.message(), "Sequence finished: 2/3 succeeded, 1 failed");
    }

    #[tokio::test(start_paused = true)]
    async fn steps_without_action_are_recorded_as_unknown() {
        let runner = runner(MemoryChannel::echoing());
        let steps = vec![json!({"height": 90}), json!("stop"), json!({"action": "happy_dance"})];

        let summary = runner.run(&steps, Duration::ZERO).await.unwrap();

        assert_eq!(summary.results[0].action, UNKNOWN_ACTION);
        assert_eq!(summary.results[1].action, UNKNOWN_ACTION);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.status, ToolStatus::Partial);
    }

    #[tokio::test(start_paused = true)]
    async fn all_steps_ok_is_success_with_delays_between() {
        let runner = runner(MemoryChannel::echoing());
        let steps = vec![
            json!({"action": "kreis_drehen"}),
            json!({"action": "achten_fahren"}),
            json!({"action": "reset"}),
        ];

        let start = Instant::now();
        let summary = runner.run(&steps, Duration::from_secs(2)).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(summary.status, ToolStatus::Success);
        assert_eq!(summary.message(), "Sequence finished: 3/3 succeeded");
        // three polls of 1.5s each plus two pauses
        assert_eq!(elapsed, Duration::from_millis(3 * 1500 + 2 * 2000));
    }

    #[test]
    fn delay_conversion_ignores_nonsense() {
        assert_eq!(delay_from_secs(1.5), Duration::from_millis(1500));
        assert_eq!(delay_from_secs(0.0), Duration::ZERO);
        assert_eq!(delay_from_secs(-3.0), Duration::ZERO);
        assert_eq!(delay_from_secs(f64::NAN), Duration::ZERO);
        assert_eq!(delay_from_secs(f64::INFINITY), Duration::ZERO);
    }
}
