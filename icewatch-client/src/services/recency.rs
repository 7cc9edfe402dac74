//! Recency classification of sightings into marker tiers
//!
//! Age bands are half-open: a sighting exactly 3h old is `Recent`, not
//! `Immediate`. Tiers are recomputed from the clock on every evaluation.

use crate::models::Sighting;
use chrono::{DateTime, Duration, Utc};
use icewatch_common::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Age at which a sighting stops being `Immediate`
pub const RECENT_AFTER_HOURS: i64 = 3;
/// Age at which a sighting becomes `Aging`
pub const AGING_AFTER_HOURS: i64 = 6;
/// Age at which a sighting becomes `Stale`
pub const STALE_AFTER_HOURS: i64 = 12;

/// Recency tier, ordered from newest to oldest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Immediate,
    Recent,
    Aging,
    Stale,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Immediate, Tier::Recent, Tier::Aging, Tier::Stale];

    /// Marker pin colour
    pub fn pin_color(&self) -> &'static str {
        match self {
            Tier::Immediate => "red",
            Tier::Recent => "orange",
            Tier::Aging => "yellow",
            Tier::Stale => "blue",
        }
    }

    /// Legend text shown next to the colour
    pub fn legend(&self) -> &'static str {
        match self {
            Tier::Immediate => "Just reported",
            Tier::Recent => "Reported 3-6 hours ago",
            Tier::Aging => "Reported 6-12 hours ago",
            Tier::Stale => "Older reports",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Immediate => "Immediate",
            Tier::Recent => "Recent",
            Tier::Aging => "Aging",
            Tier::Stale => "Stale",
        };
        f.pad(name)
    }
}

/// Age of a report at `now`, clamped to zero for future timestamps
pub fn age(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - timestamp).max(Duration::zero())
}

/// Classify a report timestamp relative to `now`
pub fn classify(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> Tier {
    let age = age(timestamp, now);

    if age < Duration::hours(RECENT_AFTER_HOURS) {
        Tier::Immediate
    } else if age < Duration::hours(AGING_AFTER_HOURS) {
        Tier::Recent
    } else if age < Duration::hours(STALE_AFTER_HOURS) {
        Tier::Aging
    } else {
        Tier::Stale
    }
}

/// Classifier bound to a clock
#[derive(Clone)]
pub struct Classifier {
    clock: Arc<dyn Clock>,
}

impl Classifier {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn classify(&self, sighting: &Sighting) -> Tier {
        classify(sighting.timestamp, self.clock.now())
    }
}
