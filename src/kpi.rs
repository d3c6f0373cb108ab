use crate::models::{CallEvent, CallResult, DailyMetrics, Metric, MetricPatch};
use chrono::{FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-date KPI records. Every mutation returns a new snapshot, so callers
/// may keep older snapshots around (for diffing, or to persist later).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KpiStore {
    days: BTreeMap<NaiveDate, DailyMetrics>,
}

impl KpiStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &DailyMetrics)> {
        self.days.iter()
    }

    pub fn get_for_date(&self, date: NaiveDate) -> DailyMetrics {
        self.days.get(&date).cloned().unwrap_or_default()
    }

    pub fn update_for_date(&self, date: NaiveDate, patch: &MetricPatch) -> Self {
        let mut record = self.get_for_date(date);
        patch.apply(&mut record);
        self.replace(date, record)
    }

    pub fn increment_metric(&self, date: NaiveDate, metric: Metric, amount: u32) -> Self {
        let current = self.get_for_date(date).get(metric);
        let patch = MetricPatch::new().with(metric, current.saturating_add(amount));
        self.update_for_date(date, &patch)
    }

    pub fn add_objection(&self, date: NaiveDate, text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return self.clone();
        }
        let mut record = self.get_for_date(date);
        record.objections.push(trimmed.to_string());
        self.replace(date, record)
    }

    pub fn record_call(&self, event: &CallEvent, day_boundary: FixedOffset) -> Self {
        let mut days = self.days.clone();
        apply_call(&mut days, event, day_boundary);
        Self { days }
    }

    /// Replays a full call history into a fresh store. Events are folded in
    /// their derived order, so any permutation of the same events yields the
    /// same store, objection order included.
    pub fn rebuild_from_history(events: &[CallEvent], day_boundary: FixedOffset) -> Self {
        let mut ordered = events.iter().collect::<Vec<_>>();
        ordered.sort();

        let mut days = BTreeMap::new();
        for event in ordered {
            apply_call(&mut days, event, day_boundary);
        }
        tracing::debug!(
            events = events.len(),
            days = days.len(),
            "rebuilt kpi store from call history"
        );
        Self { days }
    }

    fn replace(&self, date: NaiveDate, record: DailyMetrics) -> Self {
        let mut days = self.days.clone();
        days.insert(date, record);
        Self { days }
    }
}

pub fn call_date(event: &CallEvent, day_boundary: FixedOffset) -> NaiveDate {
    event.occurred_at.with_timezone(&day_boundary).date_naive()
}

fn apply_call(days: &mut BTreeMap<NaiveDate, DailyMetrics>, event: &CallEvent, day_boundary: FixedOffset) {
    let record = days.entry(call_date(event, day_boundary)).or_default();
    record.dials = record.dials.saturating_add(1);
    if event.outcome.is_pickup() {
        record.pickups = record.pickups.saturating_add(1);
    }
    if event.had_conversation {
        record.conversations = record.conversations.saturating_add(1);
    }
    if event.had_triage {
        record.triage = record.triage.saturating_add(1);
    }
    if event.result == CallResult::MeetingBooked {
        record.booked_meetings = record.booked_meetings.saturating_add(1);
    }
    if let Some(objection) = event.objection.as_deref().map(str::trim) {
        if !objection.is_empty() {
            record.objections.push(objection.to_string());
        }
    }
}
