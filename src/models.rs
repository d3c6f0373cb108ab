use crate::errors::AppError;
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

// ─── KPI Metrics ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    Dials,
    Pickups,
    Conversations,
    Triage,
    BookedMeetings,
    MeetingsRan,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Self::Dials,
        Self::Pickups,
        Self::Conversations,
        Self::Triage,
        Self::BookedMeetings,
        Self::MeetingsRan,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dials => "dials",
            Self::Pickups => "pickups",
            Self::Conversations => "conversations",
            Self::Triage => "triage",
            Self::BookedMeetings => "bookedMeetings",
            Self::MeetingsRan => "meetingsRan",
        }
    }
}

impl FromStr for Metric {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|metric| metric.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown metric '{}'", value)))
    }
}

/// Activity recorded for one calendar date. Absent dates read as the
/// all-zero default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyMetrics {
    pub dials: u32,
    pub pickups: u32,
    pub conversations: u32,
    pub triage: u32,
    pub booked_meetings: u32,
    pub meetings_ran: u32,
    pub objections: Vec<String>,
}

impl DailyMetrics {
    pub fn get(&self, metric: Metric) -> u32 {
        match metric {
            Metric::Dials => self.dials,
            Metric::Pickups => self.pickups,
            Metric::Conversations => self.conversations,
            Metric::Triage => self.triage,
            Metric::BookedMeetings => self.booked_meetings,
            Metric::MeetingsRan => self.meetings_ran,
        }
    }

    pub fn set(&mut self, metric: Metric, value: u32) {
        let slot = match metric {
            Metric::Dials => &mut self.dials,
            Metric::Pickups => &mut self.pickups,
            Metric::Conversations => &mut self.conversations,
            Metric::Triage => &mut self.triage,
            Metric::BookedMeetings => &mut self.booked_meetings,
            Metric::MeetingsRan => &mut self.meetings_ran,
        };
        *slot = value;
    }

    /// Adds every counter of `other` into `self` and appends its objections.
    pub fn absorb(&mut self, other: &DailyMetrics) {
        for metric in Metric::ALL {
            self.set(metric, self.get(metric).saturating_add(other.get(metric)));
        }
        self.objections.extend(other.objections.iter().cloned());
    }
}

/// Partial update for a single date. `None` keeps the prior value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricPatch {
    pub dials: Option<u32>,
    pub pickups: Option<u32>,
    pub conversations: Option<u32>,
    pub triage: Option<u32>,
    pub booked_meetings: Option<u32>,
    pub meetings_ran: Option<u32>,
    pub objections: Option<Vec<String>>,
}

impl MetricPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, metric: Metric, value: u32) -> Self {
        let slot = match metric {
            Metric::Dials => &mut self.dials,
            Metric::Pickups => &mut self.pickups,
            Metric::Conversations => &mut self.conversations,
            Metric::Triage => &mut self.triage,
            Metric::BookedMeetings => &mut self.booked_meetings,
            Metric::MeetingsRan => &mut self.meetings_ran,
        };
        *slot = Some(value);
        self
    }

    pub fn with_objections(mut self, objections: Vec<String>) -> Self {
        self.objections = Some(objections);
        self
    }

    pub fn apply(&self, target: &mut DailyMetrics) {
        let fields = [
            (Metric::Dials, self.dials),
            (Metric::Pickups, self.pickups),
            (Metric::Conversations, self.conversations),
            (Metric::Triage, self.triage),
            (Metric::BookedMeetings, self.booked_meetings),
            (Metric::MeetingsRan, self.meetings_ran),
        ];
        for (metric, value) in fields {
            if let Some(value) = value {
                target.set(metric, value);
            }
        }
        if let Some(objections) = &self.objections {
            target.objections = objections.clone();
        }
    }
}

// ─── Call History ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallOutcome {
    DecisionMakerReached,
    Gatekeeper,
    NoAnswer,
    Voicemail,
    WrongNumber,
}

impl CallOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DecisionMakerReached => "decision-maker-reached",
            Self::Gatekeeper => "gatekeeper",
            Self::NoAnswer => "no-answer",
            Self::Voicemail => "voicemail",
            Self::WrongNumber => "wrong-number",
        }
    }

    pub fn is_pickup(self) -> bool {
        matches!(self, Self::DecisionMakerReached)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CallResult {
    MeetingBooked,
    FollowUp,
    NotInterested,
    CallbackRequested,
    #[default]
    None,
}

impl CallResult {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MeetingBooked => "meeting-booked",
            Self::FollowUp => "follow-up",
            Self::NotInterested => "not-interested",
            Self::CallbackRequested => "callback-requested",
            Self::None => "none",
        }
    }
}

/// One dial as recorded in a contact's history. The derived ordering starts
/// with `occurred_at`, which gives history replays a canonical order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEvent {
    pub occurred_at: DateTime<Utc>,
    pub outcome: CallOutcome,
    #[serde(default)]
    pub had_conversation: bool,
    #[serde(default)]
    pub had_triage: bool,
    #[serde(default)]
    pub result: CallResult,
    #[serde(default)]
    pub objection: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CallEvent {
    pub fn new(occurred_at: DateTime<Utc>, outcome: CallOutcome) -> Self {
        Self {
            occurred_at,
            outcome,
            had_conversation: false,
            had_triage: false,
            result: CallResult::None,
            objection: None,
            notes: None,
        }
    }
}

// ─── Week Analytics ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekDayEntry {
    pub date: NaiveDate,
    pub day_name: String,
    #[serde(flatten)]
    pub metrics: DailyMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricAverages {
    pub dials: f64,
    pub pickups: f64,
    pub conversations: f64,
    pub triage: f64,
    pub booked_meetings: f64,
    pub meetings_ran: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekRatios {
    pub meetings_showed_ratio: f64,
    pub conversations_to_meetings: f64,
    pub triage_to_conversations: f64,
    pub pickups_to_conversations: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekAnalytics {
    pub week_start: NaiveDate,
    pub days: [WeekDayEntry; 5],
    pub totals: DailyMetrics,
    pub days_worked: u32,
    pub averages: MetricAverages,
    pub ratios: WeekRatios,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectionCount {
    pub objection: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub actual: u32,
    pub goal: u32,
    pub remaining: u32,
    pub percent: f64,
    pub met: bool,
}

// ─── Contacts & Sequences ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ContactStatus {
    #[default]
    New,
    InProgress,
    MeetingBooked,
    NotInterested,
    DoNotCall,
}

impl ContactStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in-progress",
            Self::MeetingBooked => "meeting-booked",
            Self::NotInterested => "not-interested",
            Self::DoNotCall => "do-not-call",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: ContactStatus,
    #[serde(default)]
    pub calls: Vec<CallEvent>,
    pub enrollment: Option<SequenceEnrollment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContactPayload {
    pub name: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutreachChannel {
    Call,
    Email,
    Linkedin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceStep {
    pub day_offset: u32,
    pub channel: OutreachChannel,
    pub instruction: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceDefinition {
    pub id: String,
    pub name: String,
    pub steps: Vec<SequenceStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceEnrollment {
    pub sequence_id: String,
    pub started_on: NaiveDate,
    #[serde(default)]
    pub completed_steps: BTreeSet<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueStep {
    pub index: usize,
    pub step: SequenceStep,
    pub due_on: NaiveDate,
    pub overdue_days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutreachTask {
    pub contact_id: String,
    pub contact_name: String,
    pub sequence_id: String,
    pub due: DueStep,
}

// ─── Settings ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub daily_dial_goal: u32,
    pub weekly_meeting_goal: u32,
    /// Offset from UTC, in minutes, that decides which calendar day a call
    /// belongs to.
    pub day_boundary_offset_minutes: i32,
}

impl AppSettings {
    pub fn day_boundary(&self) -> FixedOffset {
        self.day_boundary_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            daily_dial_goal: 50,
            weekly_meeting_goal: 5,
            day_boundary_offset_minutes: 0,
        }
    }
}
