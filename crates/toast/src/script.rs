//! Scripted toast sequences.
//!
//! A script is a JSON list of steps (`publish`, `dismiss`, `wait`, `clear`)
//! replayed against a queue, either on virtual time or on tokio timers.
//! Publish steps may carry a `label` so later `dismiss` steps can refer to
//! the notice they created.

use std::collections::HashMap;
use std::path::Path;

use lumina_common::{LuminaError, LuminaResult};
use serde::{Deserialize, Serialize};

use crate::queue::ToastQueue;
use crate::scheduler::ManualScheduler;
use crate::toast::{Toast, ToastId, ToastOptions};

/// One script step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    Publish {
        #[serde(default)]
        label: Option<String>,
        #[serde(flatten)]
        options: ToastOptions,
    },
    Dismiss {
        label: String,
    },
    Wait {
        ms: u64,
    },
    Clear,
}

/// A parsed toast script (`toasts.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToastScript {
    pub steps: Vec<ScriptStep>,
}

/// Summary of a replay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayReport {
    pub published: usize,
    pub dismissals: usize,
    pub waited_ms: u64,
    pub remaining: Vec<Toast>,
}

impl ToastScript {
    pub fn load(path: &Path) -> LuminaResult<Self> {
        let content = LuminaError::read_file(path)?;
        let script: Self =
            serde_json::from_str(&content).map_err(|source| LuminaError::ParseAt {
                path: path.to_path_buf(),
                source,
            })?;
        script.validate()?;
        Ok(script)
    }

    /// Labels must be unique and defined before any dismiss that uses them.
    pub fn validate(&self) -> LuminaResult<()> {
        let mut seen: Vec<&str> = Vec::new();
        for (index, step) in self.steps.iter().enumerate() {
            match step {
                ScriptStep::Publish {
                    label: Some(label), ..
                } => {
                    if seen.contains(&label.as_str()) {
                        return Err(LuminaError::script(format!(
                            "step {index}: duplicate label '{label}'"
                        )));
                    }
                    seen.push(label.as_str());
                }
                ScriptStep::Dismiss { label } if !seen.contains(&label.as_str()) => {
                    return Err(LuminaError::script(format!(
                        "step {index}: dismiss of unknown label '{label}'"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Replay on virtual time, advancing `scheduler` for each wait step.
    pub fn replay_virtual(&self, queue: &ToastQueue, scheduler: &ManualScheduler) -> ReplayReport {
        let mut runner = Runner::default();
        for step in &self.steps {
            if let Some(ms) = runner.apply(step, queue) {
                scheduler.advance(ms);
            }
        }
        runner.finish(queue)
    }

    /// Replay on real time. The queue's timers must be driven meanwhile:
    /// a [`TokioScheduler`](crate::TokioScheduler) inside a `LocalSet`, or a
    /// [`DeadlineScheduler`](crate::DeadlineScheduler) whose `run` is spawned.
    pub async fn replay_realtime(&self, queue: &ToastQueue) -> ReplayReport {
        let mut runner = Runner::default();
        for step in &self.steps {
            if let Some(ms) = runner.apply(step, queue) {
                tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
            }
        }
        runner.finish(queue)
    }
}

#[derive(Default)]
struct Runner {
    labels: HashMap<String, ToastId>,
    report: ReplayReport,
}

impl Runner {
    /// Apply one step; returns the wait to perform, if any.
    fn apply(&mut self, step: &ScriptStep, queue: &ToastQueue) -> Option<u64> {
        match step {
            ScriptStep::Publish { label, options } => {
                let id = queue.publish_with(options.clone());
                if let Some(label) = label {
                    self.labels.insert(label.clone(), id);
                }
                self.report.published += 1;
                None
            }
            ScriptStep::Dismiss { label } => {
                match self.labels.get(label) {
                    Some(id) => queue.dismiss(*id),
                    None => tracing::warn!(%label, "dismiss step references an unknown label"),
                }
                self.report.dismissals += 1;
                None
            }
            ScriptStep::Wait { ms } => {
                self.report.waited_ms += ms;
                Some(*ms)
            }
            ScriptStep::Clear => {
                queue.clear();
                None
            }
        }
    }

    fn finish(mut self, queue: &ToastQueue) -> ReplayReport {
        self.report.remaining = queue.snapshot();
        self.report
    }
}
