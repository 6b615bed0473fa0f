//! Event-list summarization.

use crate::{EventType, RiskEvent, Severity};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Counts over a finished event list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventStatistics {
    pub total: usize,
    pub by_type: HashMap<EventType, usize>,
    pub by_severity: HashMap<Severity, usize>,
    /// Events observed within the last hour of `now`
    pub recent_count: usize,
}

/// Pure summarization; an empty list yields the all-zero result.
pub fn summarize(events: &[RiskEvent], now: DateTime<Utc>) -> EventStatistics {
    let one_hour_ago = now - Duration::hours(1);

    let mut stats = EventStatistics {
        total: events.len(),
        ..Default::default()
    };

    for event in events {
        *stats.by_type.entry(event.event_type).or_insert(0) += 1;
        *stats.by_severity.entry(event.severity).or_insert(0) += 1;
        if event.timestamp >= one_hour_ago {
            stats.recent_count += 1;
        }
    }

    stats
}
