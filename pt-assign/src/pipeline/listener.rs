//! Result sinks.
//!
//! The writer thread feeds every delivered result to the sinks of its
//! channel, synchronously and in registration order.

use crate::demand::UnroutableDemandPart;
use crate::domain::{Candidate, ZoneId};
use crate::error::AssignmentError;

/// Receives assignment results on the writer thread.
///
/// For each origin zone a sink sees the zone's unroutable demand parts
/// first, then for every destination zone each surviving candidate
/// followed by [`on_od_pair_done`](RouteSink::on_od_pair_done).
/// [`on_finish`](RouteSink::on_finish) is called once after the last zone.
pub trait RouteSink: Send {
    fn on_route(
        &mut self,
        origin: ZoneId,
        destination: ZoneId,
        candidate: &Candidate,
    ) -> Result<(), AssignmentError>;

    fn on_od_pair_done(
        &mut self,
        origin: ZoneId,
        destination: ZoneId,
    ) -> Result<(), AssignmentError>;

    fn on_unroutable(&mut self, part: &UnroutableDemandPart) -> Result<(), AssignmentError>;

    fn on_finish(&mut self) -> Result<(), AssignmentError>;
}

/// The sinks of one output channel.
pub type SinkSet<'a> = Vec<&'a mut dyn RouteSink>;

type RouteHook<'a> =
    Box<dyn FnMut(ZoneId, ZoneId, &Candidate) -> Result<(), AssignmentError> + Send + 'a>;
type PairHook<'a> = Box<dyn FnMut(ZoneId, ZoneId) -> Result<(), AssignmentError> + Send + 'a>;
type UnroutableHook<'a> =
    Box<dyn FnMut(&UnroutableDemandPart) -> Result<(), AssignmentError> + Send + 'a>;
type FinishHook<'a> = Box<dyn FnMut() -> Result<(), AssignmentError> + Send + 'a>;

/// A sink built from optional callbacks; missing hooks do nothing.
#[derive(Default)]
pub struct SinkHooks<'a> {
    on_route: Option<RouteHook<'a>>,
    on_od_pair_done: Option<PairHook<'a>>,
    on_unroutable: Option<UnroutableHook<'a>>,
    on_finish: Option<FinishHook<'a>>,
}

impl<'a> SinkHooks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(
        mut self,
        hook: impl FnMut(ZoneId, ZoneId, &Candidate) -> Result<(), AssignmentError> + Send + 'a,
    ) -> Self {
        self.on_route = Some(Box::new(hook));
        self
    }

    pub fn with_od_pair_done(
        mut self,
        hook: impl FnMut(ZoneId, ZoneId) -> Result<(), AssignmentError> + Send + 'a,
    ) -> Self {
        self.on_od_pair_done = Some(Box::new(hook));
        self
    }

    pub fn with_unroutable(
        mut self,
        hook: impl FnMut(&UnroutableDemandPart) -> Result<(), AssignmentError> + Send + 'a,
    ) -> Self {
        self.on_unroutable = Some(Box::new(hook));
        self
    }

    pub fn with_finish(
        mut self,
        hook: impl FnMut() -> Result<(), AssignmentError> + Send + 'a,
    ) -> Self {
        self.on_finish = Some(Box::new(hook));
        self
    }
}

impl RouteSink for SinkHooks<'_> {
    fn on_route(
        &mut self,
        origin: ZoneId,
        destination: ZoneId,
        candidate: &Candidate,
    ) -> Result<(), AssignmentError> {
        match &mut self.on_route {
            Some(hook) => hook(origin, destination, candidate),
            None => Ok(()),
        }
    }

    fn on_od_pair_done(
        &mut self,
        origin: ZoneId,
        destination: ZoneId,
    ) -> Result<(), AssignmentError> {
        match &mut self.on_od_pair_done {
            Some(hook) => hook(origin, destination),
            None => Ok(()),
        }
    }

    fn on_unroutable(&mut self, part: &UnroutableDemandPart) -> Result<(), AssignmentError> {
        match &mut self.on_unroutable {
            Some(hook) => hook(part),
            None => Ok(()),
        }
    }

    fn on_finish(&mut self) -> Result<(), AssignmentError> {
        match &mut self.on_finish {
            Some(hook) => hook(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_hooks_are_no_ops() {
        let mut sink = SinkHooks::new();
        assert!(sink.on_od_pair_done(ZoneId(1), ZoneId(2)).is_ok());
        assert!(sink.on_finish().is_ok());
    }

    #[test]
    fn hooks_are_called() {
        let mut pairs = Vec::new();
        let mut finished = false;
        {
            let mut sink = SinkHooks::new()
                .with_od_pair_done(|o, d| {
                    pairs.push((o, d));
                    Ok(())
                })
                .with_finish(|| {
                    finished = true;
                    Ok(())
                });
            let sink: &mut dyn RouteSink = &mut sink;
            sink.on_od_pair_done(ZoneId(1), ZoneId(2)).unwrap();
            sink.on_finish().unwrap();
        }
        assert_eq!(pairs, vec![(ZoneId(1), ZoneId(2))]);
        assert!(finished);
    }

    #[test]
    fn hook_errors_propagate() {
        let mut sink = SinkHooks::new()
            .with_finish(|| Err(AssignmentError::Sink("disk full".to_string())));
        let sink: &mut dyn RouteSink = &mut sink;
        assert!(matches!(sink.on_finish(), Err(AssignmentError::Sink(_))));
    }
}
