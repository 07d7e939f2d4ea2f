//! Zones and their access points.

use std::collections::{BTreeMap, HashMap};

use chrono::Duration;
use serde::Deserialize;

use super::{DomainError, MAX_INPUT_SECONDS, StopId, ZoneId};
use crate::error::AssignmentError;

/// A traffic analysis zone.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    /// Cluster tag, used by downstream consumers only.
    #[serde(default)]
    pub cluster: Option<String>,
}

impl Zone {
    pub fn new(id: ZoneId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cluster: None,
        }
    }
}

/// A stop a zone can be accessed from, with the walk time to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectedStop {
    pub zone: ZoneId,
    pub stop: StopId,
    walk_seconds: i64,
}

impl ConnectedStop {
    pub fn new(zone: ZoneId, stop: StopId, walk_time: Duration) -> Self {
        Self {
            zone,
            stop,
            walk_seconds: walk_time.num_seconds(),
        }
    }

    /// Walk time between the zone and the stop.
    pub fn walk_time(&self) -> Duration {
        Duration::seconds(self.walk_seconds)
    }
}

/// Zones, their connected stops, and the reverse stop → zones relation.
#[derive(Debug, Clone, Default)]
pub struct ZoneNetwork {
    zones: BTreeMap<ZoneId, Zone>,
    connections: BTreeMap<ZoneId, Vec<ConnectedStop>>,
    zones_by_stop: HashMap<StopId, Vec<ZoneId>>,
}

impl ZoneNetwork {
    /// Builds the network.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a connected stop names an undeclared zone or has
    /// a negative walk time.
    pub fn new(
        zones: impl IntoIterator<Item = Zone>,
        connected_stops: impl IntoIterator<Item = ConnectedStop>,
    ) -> Result<Self, DomainError> {
        let zones: BTreeMap<ZoneId, Zone> = zones.into_iter().map(|z| (z.id, z)).collect();
        let mut connections: BTreeMap<ZoneId, Vec<ConnectedStop>> =
            zones.keys().map(|id| (*id, Vec::new())).collect();
        let mut zones_by_stop: HashMap<StopId, Vec<ZoneId>> = HashMap::new();

        for connected in connected_stops {
            if connected.walk_seconds < 0 {
                return Err(DomainError::NegativeWalk {
                    zone: connected.zone,
                    stop: connected.stop,
                });
            }
            if connected.walk_seconds > MAX_INPUT_SECONDS {
                return Err(DomainError::WalkTooLong {
                    zone: connected.zone,
                    stop: connected.stop,
                });
            }
            let Some(list) = connections.get_mut(&connected.zone) else {
                return Err(DomainError::UnknownZone {
                    zone: connected.zone,
                    stop: connected.stop,
                });
            };
            let zones_of_stop = zones_by_stop.entry(connected.stop).or_default();
            if !zones_of_stop.contains(&connected.zone) {
                zones_of_stop.push(connected.zone);
            }
            list.push(connected);
        }

        Ok(Self {
            zones,
            connections,
            zones_by_stop,
        })
    }

    /// Looks up a zone.
    pub fn zone(&self, id: ZoneId) -> Result<&Zone, AssignmentError> {
        self.zones.get(&id).ok_or(AssignmentError::UnknownZone(id))
    }

    /// Returns the access points of a zone (possibly empty).
    pub fn connected_stops(&self, id: ZoneId) -> Result<&[ConnectedStop], AssignmentError> {
        self.connections
            .get(&id)
            .map(Vec::as_slice)
            .ok_or(AssignmentError::UnknownZone(id))
    }

    /// All zone ids in ascending order.
    pub fn zone_ids(&self) -> impl Iterator<Item = ZoneId> + '_ {
        self.zones.keys().copied()
    }

    /// Zones a stop is connected to.
    pub fn zones_of_stop(&self, stop: StopId) -> &[ZoneId] {
        self.zones_by_stop
            .get(&stop)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns true if `stop` is one of `zone`'s access points.
    pub fn stop_in_zone(&self, stop: StopId, zone: ZoneId) -> bool {
        self.zones_of_stop(stop).contains(&zone)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
