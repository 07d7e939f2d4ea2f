//! Multi-worker, single-writer processing pipeline.
//!
//! Origin zones are submitted in sorted order. Each work item goes into
//! two bounded queues: its ticket into the worker queue, its pending
//! result into the writer queue. Workers process zones in whatever order
//! they finish them; the writer waits on the pending results in
//! submission order, so sinks always see zones in that order.
//!
//! Blocking on a full queue is the only backpressure. It bounds the
//! number of zones in flight by the queue capacities, whatever the
//! number of zones.

mod listener;
mod work;
mod worker;
mod writer;

#[cfg(test)]
mod pipeline_tests;

use std::fmt;
use std::num::NonZeroUsize;
use std::thread;

use crossbeam::channel::bounded;
use serde::Deserialize;
use tracing::{error, info};

use crate::domain::ZoneId;
use crate::error::AssignmentError;

pub use listener::{RouteSink, SinkHooks, SinkSet};
pub use work::WorkResult;
pub use worker::{ProcessorFactory, ZoneProcessor};

use work::{Message, work_item};
use worker::run_worker;
use writer::{Delivered, run_writer};

/// Lifecycle of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Submitting,
    Draining,
    Complete,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Submitting => "submitting",
            PipelineState::Draining => "draining",
            PipelineState::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Pipeline sizing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Worker threads; defaults to the available parallelism.
    pub threads: Option<usize>,
    /// Worker queue capacity per worker thread.
    pub worker_queue_factor: usize,
    /// Writer queue capacity per worker thread.
    pub writer_queue_factor: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threads: None,
            worker_queue_factor: 5,
            writer_queue_factor: 4,
        }
    }
}

impl PipelineConfig {
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: Some(threads),
            ..Self::default()
        }
    }

    /// Number of worker threads to start.
    pub fn thread_count(&self) -> usize {
        self.threads
            .unwrap_or_else(|| thread::available_parallelism().map_or(1, NonZeroUsize::get))
    }

    fn validate(&self) -> Result<(), AssignmentError> {
        if self.threads == Some(0) {
            return Err(AssignmentError::Configuration(
                "at least one worker thread is required".to_string(),
            ));
        }
        if self.worker_queue_factor == 0 || self.writer_queue_factor == 0 {
            return Err(AssignmentError::Configuration(
                "queue factors must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStats {
    pub threads: usize,
    /// Zones delivered to the sinks.
    pub zones: usize,
    /// Candidates delivered, summed over all channels.
    pub routes: usize,
    /// Unroutable demand, summed over all channels.
    pub unroutable: f64,
}

/// Errors that only happen because another thread failed first.
fn is_consequential(error: &AssignmentError) -> bool {
    matches!(
        error.root_cause(),
        AssignmentError::QueueClosed(_) | AssignmentError::ResultAbandoned { .. }
    )
}

/// Pick the error that caused the run to fail, preferring worker errors,
/// then the writer's, then the submitter's.
fn root_failure(errors: impl IntoIterator<Item = AssignmentError>) -> Option<AssignmentError> {
    let mut consequential = None;
    for error in errors {
        if !is_consequential(&error) {
            return Some(error);
        }
        consequential.get_or_insert(error);
    }
    consequential
}

/// The processing pipeline. Runs once.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    channels: usize,
    state: PipelineState,
}

impl Pipeline {
    /// Creates a pipeline with `channels` result slots per work item.
    ///
    /// # Errors
    ///
    /// Returns `Err` on an invalid configuration or zero channels.
    pub fn new(config: PipelineConfig, channels: usize) -> Result<Self, AssignmentError> {
        config.validate()?;
        if channels == 0 {
            return Err(AssignmentError::Configuration(
                "at least one output channel is required".to_string(),
            ));
        }
        Ok(Self {
            config,
            channels,
            state: PipelineState::Idle,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    fn transition(&mut self, next: PipelineState) {
        info!(from = %self.state, to = %next, "pipeline state");
        self.state = next;
    }

    /// Processes `origins` with processors from `factory` and delivers
    /// the results to `sinks`, one sink set per channel. Blocks until the
    /// writer has finished.
    ///
    /// # Errors
    ///
    /// Returns the first failure of a worker, the writer or the
    /// submission. Nothing is retried.
    pub fn run<P: ProcessorFactory>(
        &mut self,
        factory: &P,
        origins: &[ZoneId],
        sinks: &mut [SinkSet<'_>],
    ) -> Result<PipelineStats, AssignmentError> {
        if self.state != PipelineState::Idle {
            return Err(AssignmentError::Configuration(format!(
                "pipeline cannot run while {}",
                self.state
            )));
        }
        if sinks.len() != self.channels {
            return Err(AssignmentError::Configuration(format!(
                "{} sink sets for {} output channels",
                sinks.len(),
                self.channels
            )));
        }

        let mut origins = origins.to_vec();
        origins.sort();
        origins.dedup();
        let threads = self.config.thread_count();
        let channels = self.channels;
        let worker_capacity = threads * self.config.worker_queue_factor;
        let writer_capacity = threads * self.config.writer_queue_factor;

        self.transition(PipelineState::Submitting);

        let (worker_results, writer_result, submit_error) = thread::scope(|scope| {
            let (work_tx, work_rx) = bounded(worker_capacity);
            let (write_tx, write_rx) = bounded(writer_capacity);

            let mut workers = Vec::with_capacity(threads);
            for worker in 0..threads {
                let queue = work_rx.clone();
                let handle = thread::Builder::new()
                    .name(format!("assign-worker-{worker}"))
                    .spawn_scoped(scope, move || run_worker(worker, factory, queue))
                    .map_err(|e| AssignmentError::Thread(e.to_string()))?;
                workers.push(handle);
            }
            drop(work_rx);

            let writer = thread::Builder::new()
                .name("assign-writer".to_string())
                .spawn_scoped(scope, move || run_writer(write_rx, sinks))
                .map_err(|e| AssignmentError::Thread(e.to_string()))?;

            let mut submit_error = None;
            for &origin in &origins {
                let (ticket, pending) = work_item(origin, channels);
                if write_tx.send(Message::Item(pending)).is_err() {
                    submit_error = Some(AssignmentError::QueueClosed("writer"));
                    break;
                }
                if work_tx.send(Message::Item(ticket)).is_err() {
                    submit_error = Some(AssignmentError::QueueClosed("worker"));
                    break;
                }
            }

            self.transition(PipelineState::Draining);
            if submit_error.is_none() {
                for _ in 0..threads {
                    if work_tx.send(Message::End).is_err() {
                        submit_error = Some(AssignmentError::QueueClosed("worker"));
                        break;
                    }
                }
            }
            if submit_error.is_none() && write_tx.send(Message::End).is_err() {
                submit_error = Some(AssignmentError::QueueClosed("writer"));
            }
            // Disconnect so that failed runs wind down
            drop(work_tx);
            drop(write_tx);

            let worker_results: Vec<Result<usize, AssignmentError>> = workers
                .into_iter()
                .enumerate()
                .map(|(worker, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(AssignmentError::WorkerPanicked(format!(
                            "assign-worker-{worker}"
                        )))
                    })
                })
                .collect();
            let writer_result = writer.join().unwrap_or_else(|_| {
                Err(AssignmentError::WorkerPanicked("assign-writer".to_string()))
            });

            Ok::<_, AssignmentError>((worker_results, writer_result, submit_error))
        })?;

        let mut errors = Vec::new();
        for result in worker_results {
            if let Err(e) = result {
                errors.push(e);
            }
        }
        let delivered: Option<Delivered> = match writer_result {
            Ok(delivered) => Some(delivered),
            Err(e) => {
                errors.push(e);
                None
            }
        };
        errors.extend(submit_error);

        if let Some(failure) = root_failure(errors) {
            error!(error = %failure, "pipeline failed");
            return Err(failure);
        }
        let Some(delivered) = delivered else {
            return Err(AssignmentError::QueueClosed("writer"));
        };

        self.transition(PipelineState::Complete);
        Ok(PipelineStats {
            threads,
            zones: delivered.zones,
            routes: delivered.routes,
            unroutable: delivered.unroutable,
        })
    }
}
