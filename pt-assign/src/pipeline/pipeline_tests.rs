//! Tests for the worker pool and the ordered writer.

use super::*;
use crate::demand::UnroutableDemand;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam::channel::{Receiver, Sender, unbounded};

const A: ZoneId = ZoneId(1);
const B: ZoneId = ZoneId(2);
const DESTINATION: ZoneId = ZoneId(99);

/// Processor with scripted behaviour per zone.
#[derive(Clone, Default)]
struct Script {
    channels: usize,
    /// Zone that waits for `releaser` before finishing.
    held: Option<(ZoneId, ZoneId)>,
    fail_on: Option<ZoneId>,
    panic_on: Option<ZoneId>,
}

struct ScriptedFactory {
    script: Script,
    completed: Arc<Mutex<Vec<ZoneId>>>,
    release: (Sender<()>, Receiver<()>),
}

impl ScriptedFactory {
    fn new(script: Script) -> Self {
        Self {
            script,
            completed: Arc::new(Mutex::new(Vec::new())),
            release: unbounded(),
        }
    }

    fn completed(&self) -> Vec<ZoneId> {
        self.completed.lock().unwrap().clone()
    }
}

struct ScriptedProcessor {
    script: Script,
    completed: Arc<Mutex<Vec<ZoneId>>>,
    release: (Sender<()>, Receiver<()>),
}

impl ProcessorFactory for ScriptedFactory {
    type Processor = ScriptedProcessor;

    fn create(&self, _worker: usize) -> Result<ScriptedProcessor, AssignmentError> {
        Ok(ScriptedProcessor {
            script: self.script.clone(),
            completed: Arc::clone(&self.completed),
            release: self.release.clone(),
        })
    }
}

impl ZoneProcessor for ScriptedProcessor {
    fn process(&mut self, origin: ZoneId) -> Result<Vec<WorkResult>, AssignmentError> {
        if self.script.fail_on == Some(origin) {
            return Err(AssignmentError::UnknownZone(origin));
        }
        if self.script.panic_on == Some(origin) {
            panic!("scripted panic for {origin}");
        }
        match self.script.held {
            Some((held, _)) if held == origin => {
                self.release
                    .1
                    .recv_timeout(Duration::from_secs(10))
                    .expect("releasing zone never finished");
            }
            Some((_, releaser)) if releaser == origin => {
                self.release.0.send(()).unwrap();
            }
            _ => {}
        }
        self.completed.lock().unwrap().push(origin);

        let results = (0..self.script.channels)
            .map(|_| WorkResult {
                origin,
                routes: BTreeMap::from([(DESTINATION, Vec::new())]),
                unroutable: UnroutableDemand::new(),
            })
            .collect();
        Ok(results)
    }
}

/// Sink recording the origin of every finished OD pair.
fn recording_sink(log: &Mutex<Vec<ZoneId>>) -> SinkHooks<'_> {
    SinkHooks::new().with_od_pair_done(move |origin, _| {
        log.lock().unwrap().push(origin);
        Ok(())
    })
}

#[test]
fn writer_keeps_submission_order() {
    let factory = ScriptedFactory::new(Script {
        channels: 1,
        held: Some((A, B)),
        ..Script::default()
    });
    let delivered = Mutex::new(Vec::new());
    let mut sink = recording_sink(&delivered);

    let mut pipeline = Pipeline::new(PipelineConfig::with_threads(2), 1).unwrap();
    let stats = pipeline
        .run(&factory, &[A, B], &mut [vec![&mut sink as &mut dyn RouteSink]])
        .unwrap();

    assert_eq!(factory.completed(), vec![B, A]);
    assert_eq!(*delivered.lock().unwrap(), vec![A, B]);
    assert_eq!(stats.zones, 2);
    assert_eq!(stats.threads, 2);
    assert_eq!(pipeline.state(), PipelineState::Complete);
}

#[test]
fn origins_are_submitted_sorted() {
    let factory = ScriptedFactory::new(Script {
        channels: 1,
        ..Script::default()
    });
    let delivered = Mutex::new(Vec::new());
    let mut sink = recording_sink(&delivered);
    let origins: Vec<ZoneId> = (1..=20).rev().map(ZoneId).chain([ZoneId(5)]).collect();

    let mut pipeline = Pipeline::new(PipelineConfig::with_threads(3), 1).unwrap();
    let stats = pipeline
        .run(&factory, &origins, &mut [vec![&mut sink as &mut dyn RouteSink]])
        .unwrap();

    let expected: Vec<ZoneId> = (1..=20).map(ZoneId).collect();
    assert_eq!(*delivered.lock().unwrap(), expected);
    assert_eq!(stats.zones, 20);
}

#[test]
fn every_channel_gets_its_result() {
    let factory = ScriptedFactory::new(Script {
        channels: 2,
        ..Script::default()
    });
    let first = Mutex::new(Vec::new());
    let second = Mutex::new(Vec::new());
    let finished = Mutex::new(0);
    let mut sink_a = recording_sink(&first);
    let mut sink_b = recording_sink(&second);
    let mut closer = SinkHooks::new().with_finish(|| {
        *finished.lock().unwrap() += 1;
        Ok(())
    });

    let mut pipeline = Pipeline::new(PipelineConfig::with_threads(2), 2).unwrap();
    pipeline
        .run(
            &factory,
            &[A, B],
            &mut [
                vec![&mut sink_a as &mut dyn RouteSink],
                vec![&mut sink_b as &mut dyn RouteSink, &mut closer],
            ],
        )
        .unwrap();

    assert_eq!(*first.lock().unwrap(), vec![A, B]);
    assert_eq!(*second.lock().unwrap(), vec![A, B]);
    assert_eq!(*finished.lock().unwrap(), 1);
}

#[test]
fn sink_count_must_match_channels() {
    let factory = ScriptedFactory::new(Script {
        channels: 2,
        ..Script::default()
    });
    let mut sink = SinkHooks::new();

    let mut pipeline = Pipeline::new(PipelineConfig::with_threads(1), 2).unwrap();
    let err = pipeline
        .run(&factory, &[A], &mut [vec![&mut sink as &mut dyn RouteSink]])
        .unwrap_err();

    assert!(matches!(err, AssignmentError::Configuration(_)));
    assert_eq!(pipeline.state(), PipelineState::Idle);
}

#[test]
fn worker_failure_aborts_run() {
    let factory = ScriptedFactory::new(Script {
        channels: 1,
        fail_on: Some(ZoneId(7)),
        ..Script::default()
    });
    let mut sink = SinkHooks::new();
    let origins: Vec<ZoneId> = (1..=200).map(ZoneId).collect();

    let mut pipeline = Pipeline::new(PipelineConfig::with_threads(2), 1).unwrap();
    let err = pipeline
        .run(&factory, &origins, &mut [vec![&mut sink as &mut dyn RouteSink]])
        .unwrap_err();

    assert!(matches!(err, AssignmentError::Worker { .. }));
    assert!(matches!(
        err.root_cause(),
        AssignmentError::UnknownZone(ZoneId(7))
    ));
    assert_eq!(err.exit_code(), 2);
    assert_ne!(pipeline.state(), PipelineState::Complete);
}

#[test]
fn worker_panic_is_reported() {
    let factory = ScriptedFactory::new(Script {
        channels: 1,
        panic_on: Some(B),
        ..Script::default()
    });
    let mut sink = SinkHooks::new();

    let mut pipeline = Pipeline::new(PipelineConfig::with_threads(1), 1).unwrap();
    let err = pipeline
        .run(&factory, &[A, B], &mut [vec![&mut sink as &mut dyn RouteSink]])
        .unwrap_err();

    assert!(matches!(err, AssignmentError::WorkerPanicked(_)));
}

#[test]
fn sink_failure_aborts_run() {
    let factory = ScriptedFactory::new(Script {
        channels: 1,
        ..Script::default()
    });
    let mut sink = SinkHooks::new()
        .with_od_pair_done(|_, _| Err(AssignmentError::Sink("disk full".to_string())));
    let origins: Vec<ZoneId> = (1..=100).map(ZoneId).collect();

    let mut pipeline = Pipeline::new(PipelineConfig::with_threads(2), 1).unwrap();
    let err = pipeline
        .run(&factory, &origins, &mut [vec![&mut sink as &mut dyn RouteSink]])
        .unwrap_err();

    assert!(matches!(err, AssignmentError::Sink(_)));
    assert_eq!(err.exit_code(), 5);
}

#[test]
fn pipeline_runs_once() {
    let factory = ScriptedFactory::new(Script {
        channels: 1,
        ..Script::default()
    });
    let mut sink = SinkHooks::new();
    let mut pipeline = Pipeline::new(PipelineConfig::with_threads(1), 1).unwrap();

    pipeline
        .run(&factory, &[A], &mut [vec![&mut sink as &mut dyn RouteSink]])
        .unwrap();
    let err = pipeline
        .run(&factory, &[A], &mut [vec![&mut sink as &mut dyn RouteSink]])
        .unwrap_err();
    assert!(matches!(err, AssignmentError::Configuration(_)));
}

#[test]
fn empty_submission_finishes_sinks() {
    let factory = ScriptedFactory::new(Script {
        channels: 1,
        ..Script::default()
    });
    let finished = Mutex::new(false);
    let mut sink = SinkHooks::new().with_finish(|| {
        *finished.lock().unwrap() = true;
        Ok(())
    });

    let mut pipeline = Pipeline::new(PipelineConfig::with_threads(4), 1).unwrap();
    let stats = pipeline
        .run(&factory, &[], &mut [vec![&mut sink as &mut dyn RouteSink]])
        .unwrap();

    assert_eq!(stats.zones, 0);
    assert!(*finished.lock().unwrap());
}

#[test]
fn invalid_configurations_are_rejected() {
    assert!(Pipeline::new(PipelineConfig::with_threads(0), 1).is_err());
    assert!(Pipeline::new(PipelineConfig::default(), 0).is_err());

    let config = PipelineConfig {
        writer_queue_factor: 0,
        ..PipelineConfig::default()
    };
    assert!(Pipeline::new(config, 1).is_err());

    let config: PipelineConfig = serde_json::from_str(r#"{"threads": 3}"#).unwrap();
    assert_eq!(config.thread_count(), 3);
    assert_eq!(config.worker_queue_factor, 5);
    assert_eq!(config.writer_queue_factor, 4);
}
