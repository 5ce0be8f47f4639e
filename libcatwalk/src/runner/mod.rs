//! Per-host task fan-out. A run takes a set of named per-host payloads and
//! an async task function, executes the task across hosts through a bounded
//! worker pool, and collects every outcome into a [`RunReport`]. A failure
//! on one host never aborts the others; each worker exclusively owns its
//! host's payload and derived results.

use futures::stream::StreamExt;
use std::future::Future;

use crate::log::*;
use crate::tasks::TaskError;

/// One host's failure, kept for the end-of-run report.
#[derive(Debug)]
pub struct TaskFailure {
    pub host: String,
    pub error: TaskError,
}

/// Everything a run produced: per-host success values in completion order,
/// and per-host failures.
#[derive(Debug)]
pub struct RunReport<T> {
    completed: Vec<(String, T)>,
    failed: Vec<TaskFailure>,
}

impl<T> RunReport<T> {
    pub fn completed(&self) -> &[(String, T)] {
        &self.completed
    }

    pub fn failed(&self) -> &[TaskFailure] {
        &self.failed
    }

    pub fn failed_hosts(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.host.as_str()).collect()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Consume the report, keeping the successes. Failed hosts are excluded
    /// from any further processing.
    pub fn into_completed(self) -> Vec<(String, T)> {
        self.completed
    }

    /// Fold another phase's failures into this report's.
    pub fn absorb_failures<U>(&mut self, other: &mut RunReport<U>) {
        self.failed.append(&mut other.failed);
    }
}

impl<T> Default for RunReport<T> {
    fn default() -> Self {
        Self {
            completed: vec![],
            failed: vec![],
        }
    }
}

/// Run `task` against every `(name, payload)` pair, at most `limit` hosts in
/// flight at once.
#[tracing::instrument(skip(hosts, task))]
pub async fn run_on_hosts<P, T, F, Fut>(
    hosts: Vec<(String, P)>,
    limit: usize,
    task: F,
) -> RunReport<T>
where
    F: Fn(String, P) -> Fut,
    Fut: Future<Output = Result<T, TaskError>>,
{
    let total = hosts.len();
    debug!("running task across {} hosts", total);
    let mut stream = futures::stream::iter(hosts.into_iter().map(|(name, payload)| {
        let fut = task(name.clone(), payload);
        async move { (name, fut.await) }
    }))
    .buffer_unordered(limit.max(1));

    let mut report = RunReport::default();
    while let Some((host, outcome)) = stream.next().await {
        match outcome {
            Ok(value) => {
                debug!("task succeeded on {}", &host);
                report.completed.push((host, value));
            }
            Err(error) => {
                warn!("task failed on {}: {}", &host, &error);
                println!("*** {}: task failed: {} ***", &host, &error);
                report.failed.push(TaskFailure { host, error });
            }
        }
    }
    debug!(
        "run finished: {}/{} hosts succeeded",
        report.completed.len(),
        total
    );
    report
}
