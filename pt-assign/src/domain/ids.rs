//! Identifier types.
//!
//! Zones, stops, lines, routes and trips are all numbered by the data
//! source. Wrapping the raw numbers keeps them from being mixed up.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

id_type!(
    /// A traffic analysis zone.
    ZoneId,
    "Z"
);
id_type!(
    /// A physical stop (platform or stop point).
    StopId,
    "S"
);
id_type!(
    /// A public-transport line.
    LineId,
    "L"
);
id_type!(
    /// A route (stop pattern) of a line.
    RouteId,
    "R"
);
id_type!(
    /// A single vehicle run along a route.
    TripId,
    "T"
);
