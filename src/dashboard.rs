use crate::config::{self, load_settings};
use crate::contacts::ContactBook;
use crate::db::{load_json, save_json, BlobStore, Database};
use crate::errors::{AppError, AppResult};
use crate::events::{DashboardEvent, EventBus};
use crate::goals::{daily_progress, weekly_meeting_progress};
use crate::kpi::{call_date, KpiStore};
use crate::models::{
    AppSettings, CallEvent, Contact, ContactStatus, DailyMetrics, GoalProgress, Metric, MetricPatch,
    NewContactPayload, ObjectionCount, OutreachTask, SequenceDefinition, SequenceEnrollment, WeekAnalytics,
};
use crate::objections::rank_objections;
use crate::sequences::{complete_step, due_steps, is_finished};
use crate::week::aggregate_week;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

pub const KPIS_KEY: &str = "kpis";
pub const CONTACTS_KEY: &str = "contacts";
pub const SEQUENCES_KEY: &str = "sequences";

struct DashboardState {
    kpis: KpiStore,
    contacts: ContactBook,
    sequences: Vec<SequenceDefinition>,
    settings: AppSettings,
}

/// Owns the current dashboard snapshots. Each mutation computes a new
/// snapshot, writes it to the blob store, and only then swaps it in.
pub struct DashboardCore {
    blobs: Arc<dyn BlobStore>,
    events: EventBus,
    state: Mutex<DashboardState>,
}

impl DashboardCore {
    pub fn new(app_data_dir: PathBuf) -> AppResult<Self> {
        let db_path = app_data_dir.join("dashboard.sqlite");
        let db = Arc::new(Database::new(&db_path)?);
        Self::with_store(db)
    }

    pub fn with_store(blobs: Arc<dyn BlobStore>) -> AppResult<Self> {
        let kpis: KpiStore = load_json(blobs.as_ref(), KPIS_KEY)?;
        let contacts: ContactBook = load_json(blobs.as_ref(), CONTACTS_KEY)?;
        let sequences: Vec<SequenceDefinition> = load_json(blobs.as_ref(), SEQUENCES_KEY)?;
        let settings = load_settings(blobs.as_ref())?;

        tracing::info!(
            kpi_days = kpis.len(),
            contacts = contacts.len(),
            sequences = sequences.len(),
            "dashboard state loaded"
        );

        Ok(Self {
            blobs,
            events: EventBus::new(),
            state: Mutex::new(DashboardState {
                kpis,
                contacts,
                sequences,
                settings,
            }),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    pub fn kpis(&self) -> AppResult<KpiStore> {
        Ok(self.lock()?.kpis.clone())
    }

    pub fn contacts(&self) -> AppResult<ContactBook> {
        Ok(self.lock()?.contacts.clone())
    }

    pub fn sequences(&self) -> AppResult<Vec<SequenceDefinition>> {
        Ok(self.lock()?.sequences.clone())
    }

    pub fn settings(&self) -> AppResult<AppSettings> {
        Ok(self.lock()?.settings.clone())
    }

    pub fn update_settings(&self, update: serde_json::Value) -> AppResult<AppSettings> {
        let mut state = self.lock()?;
        let settings = config::update_settings(self.blobs.as_ref(), update)?;
        state.settings = settings.clone();
        drop(state);

        self.events.publish(DashboardEvent::SettingsUpdated);
        Ok(settings)
    }

    // ─── Contacts ───────────────────────────────────────────────────────────

    pub fn add_contact(&self, payload: NewContactPayload) -> AppResult<Contact> {
        let mut state = self.lock()?;
        let (contacts, contact) = state.contacts.add_contact(payload)?;
        save_json(self.blobs.as_ref(), CONTACTS_KEY, &contacts)?;
        state.contacts = contacts;
        drop(state);

        tracing::info!(contact_id = %contact.id, "contact added");
        self.events.publish(DashboardEvent::ContactUpdated {
            contact_id: contact.id.clone(),
        });
        Ok(contact)
    }

    pub fn set_contact_status(&self, contact_id: &str, status: ContactStatus) -> AppResult<Contact> {
        let mut state = self.lock()?;
        let (contacts, contact) = state.contacts.set_status(contact_id, status)?;
        save_json(self.blobs.as_ref(), CONTACTS_KEY, &contacts)?;
        state.contacts = contacts;
        drop(state);

        self.events.publish(DashboardEvent::ContactUpdated {
            contact_id: contact.id.clone(),
        });
        Ok(contact)
    }

    /// Logs a dial against a contact and folds it into that day's KPIs.
    /// Returns the updated metrics for the call's date.
    pub fn record_call(&self, contact_id: &str, event: CallEvent) -> AppResult<DailyMetrics> {
        let mut state = self.lock()?;
        let day_boundary = state.settings.day_boundary();
        let date = call_date(&event, day_boundary);

        let kpis = state.kpis.record_call(&event, day_boundary);
        let (contacts, contact) = state.contacts.log_call(contact_id, event)?;

        self.blobs.put_blobs(&[
            (CONTACTS_KEY, serde_json::to_value(&contacts)?),
            (KPIS_KEY, serde_json::to_value(&kpis)?),
        ])?;
        let metrics = kpis.get_for_date(date);
        state.contacts = contacts;
        state.kpis = kpis;
        drop(state);

        tracing::info!(
            contact_id = %contact.id,
            %date,
            dials = metrics.dials,
            status = contact.status.as_str(),
            "call recorded"
        );
        self.events.publish(DashboardEvent::ContactUpdated {
            contact_id: contact.id.clone(),
        });
        self.events.publish(DashboardEvent::KpisUpdated { date });
        Ok(metrics)
    }

    // ─── KPIs ───────────────────────────────────────────────────────────────

    pub fn increment(&self, date: NaiveDate, metric: Metric, amount: u32) -> AppResult<DailyMetrics> {
        self.mutate_kpis(date, |kpis| kpis.increment_metric(date, metric, amount))
    }

    pub fn update_day(&self, date: NaiveDate, patch: &MetricPatch) -> AppResult<DailyMetrics> {
        self.mutate_kpis(date, |kpis| kpis.update_for_date(date, patch))
    }

    pub fn log_objection(&self, date: NaiveDate, text: &str) -> AppResult<DailyMetrics> {
        if text.trim().is_empty() {
            return Ok(self.lock()?.kpis.get_for_date(date));
        }
        self.mutate_kpis(date, |kpis| kpis.add_objection(date, text))
    }

    pub fn mark_meeting_ran(&self, date: NaiveDate) -> AppResult<DailyMetrics> {
        self.increment(date, Metric::MeetingsRan, 1)
    }

    /// Replaces the KPI store with one replayed from every contact's call
    /// history. Manually entered counters (such as meetings ran) are lost.
    pub fn rebuild_kpis(&self) -> AppResult<KpiStore> {
        let mut state = self.lock()?;
        let calls = state.contacts.all_calls();
        let kpis = KpiStore::rebuild_from_history(&calls, state.settings.day_boundary());
        save_json(self.blobs.as_ref(), KPIS_KEY, &kpis)?;
        state.kpis = kpis.clone();
        drop(state);

        tracing::info!(calls = calls.len(), days = kpis.len(), "kpi store rebuilt");
        self.events.publish(DashboardEvent::KpisRebuilt { days: kpis.len() });
        Ok(kpis)
    }

    pub fn reset_kpis(&self) -> AppResult<()> {
        let mut state = self.lock()?;
        let kpis = KpiStore::new();
        save_json(self.blobs.as_ref(), KPIS_KEY, &kpis)?;
        state.kpis = kpis;
        drop(state);

        tracing::warn!("kpi store reset");
        self.events.publish(DashboardEvent::KpisRebuilt { days: 0 });
        Ok(())
    }

    pub fn week_analytics(&self, date: NaiveDate) -> AppResult<WeekAnalytics> {
        Ok(aggregate_week(&self.lock()?.kpis, date))
    }

    pub fn weekly_objections(&self, date: NaiveDate) -> AppResult<Vec<ObjectionCount>> {
        let analytics = self.week_analytics(date)?;
        Ok(rank_objections(&analytics.totals.objections))
    }

    pub fn daily_goal(&self, date: NaiveDate) -> AppResult<GoalProgress> {
        let state = self.lock()?;
        Ok(daily_progress(&state.kpis, date, state.settings.daily_dial_goal))
    }

    pub fn weekly_meeting_goal(&self, date: NaiveDate) -> AppResult<GoalProgress> {
        let state = self.lock()?;
        let analytics = aggregate_week(&state.kpis, date);
        Ok(weekly_meeting_progress(&analytics, state.settings.weekly_meeting_goal))
    }

    // ─── Sequences ──────────────────────────────────────────────────────────

    pub fn save_sequence(&self, definition: SequenceDefinition) -> AppResult<SequenceDefinition> {
        definition.validate()?;
        let mut state = self.lock()?;
        let mut sequences = state.sequences.clone();
        match sequences.iter_mut().find(|existing| existing.id == definition.id) {
            Some(existing) => *existing = definition.clone(),
            None => sequences.push(definition.clone()),
        }
        save_json(self.blobs.as_ref(), SEQUENCES_KEY, &sequences)?;
        state.sequences = sequences;
        drop(state);

        tracing::info!(
            sequence_id = %definition.id,
            steps = definition.steps.len(),
            "sequence saved"
        );
        self.events.publish(DashboardEvent::SequencesUpdated);
        Ok(definition)
    }

    pub fn enroll_contact(&self, contact_id: &str, sequence_id: &str, start: NaiveDate) -> AppResult<Contact> {
        let mut state = self.lock()?;
        if !state.sequences.iter().any(|sequence| sequence.id == sequence_id) {
            return Err(AppError::NotFound(format!("sequence {}", sequence_id)));
        }
        let enrollment = SequenceEnrollment::new(sequence_id, start);
        let (contacts, contact) = state.contacts.set_enrollment(contact_id, Some(enrollment))?;
        save_json(self.blobs.as_ref(), CONTACTS_KEY, &contacts)?;
        state.contacts = contacts;
        drop(state);

        tracing::info!(contact_id, sequence_id, %start, "contact enrolled in sequence");
        self.events.publish(DashboardEvent::ContactUpdated {
            contact_id: contact.id.clone(),
        });
        Ok(contact)
    }

    /// Marks a step done. The enrollment is cleared once every step is done.
    pub fn complete_sequence_step(&self, contact_id: &str, index: usize) -> AppResult<Contact> {
        let mut state = self.lock()?;
        let contact = state
            .contacts
            .get(contact_id)
            .ok_or_else(|| AppError::NotFound(format!("contact {}", contact_id)))?;
        let enrollment = contact
            .enrollment
            .as_ref()
            .ok_or_else(|| AppError::Validation(format!("contact {} is not in a sequence", contact_id)))?;
        let definition = state
            .sequences
            .iter()
            .find(|sequence| sequence.id == enrollment.sequence_id)
            .ok_or_else(|| AppError::NotFound(format!("sequence {}", enrollment.sequence_id)))?;

        let updated = complete_step(definition, enrollment, index)?;
        let next = if is_finished(definition, &updated) { None } else { Some(updated) };
        let (contacts, contact) = state.contacts.set_enrollment(contact_id, next)?;
        save_json(self.blobs.as_ref(), CONTACTS_KEY, &contacts)?;
        state.contacts = contacts;
        drop(state);

        self.events.publish(DashboardEvent::ContactUpdated {
            contact_id: contact.id.clone(),
        });
        Ok(contact)
    }

    /// Every outreach step due on or before `today`, across enrolled contacts
    /// that can still be called, most overdue first.
    pub fn due_outreach(&self, today: NaiveDate) -> AppResult<Vec<OutreachTask>> {
        let state = self.lock()?;
        let mut tasks = Vec::new();
        for contact in state.contacts.list() {
            if matches!(contact.status, ContactStatus::DoNotCall | ContactStatus::NotInterested) {
                continue;
            }
            let Some(enrollment) = contact.enrollment.as_ref() else {
                continue;
            };
            let Some(definition) = state
                .sequences
                .iter()
                .find(|sequence| sequence.id == enrollment.sequence_id)
            else {
                tracing::warn!(
                    contact_id = %contact.id,
                    sequence_id = %enrollment.sequence_id,
                    "enrollment references unknown sequence"
                );
                continue;
            };
            tasks.extend(due_steps(definition, enrollment, today).into_iter().map(|due| OutreachTask {
                contact_id: contact.id.clone(),
                contact_name: contact.name.clone(),
                sequence_id: definition.id.clone(),
                due,
            }));
        }
        tasks.sort_by(|left, right| right.due.overdue_days.cmp(&left.due.overdue_days));
        Ok(tasks)
    }

    fn mutate_kpis(&self, date: NaiveDate, apply: impl FnOnce(&KpiStore) -> KpiStore) -> AppResult<DailyMetrics> {
        let mut state = self.lock()?;
        let kpis = apply(&state.kpis);
        save_json(self.blobs.as_ref(), KPIS_KEY, &kpis)?;
        let metrics = kpis.get_for_date(date);
        state.kpis = kpis;
        drop(state);

        self.events.publish(DashboardEvent::KpisUpdated { date });
        Ok(metrics)
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, DashboardState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("dashboard state mutex poisoned".to_string()))
    }
}
