use crate::kpi::KpiStore;
use crate::models::{GoalProgress, WeekAnalytics};
use chrono::NaiveDate;

pub fn daily_progress(store: &KpiStore, date: NaiveDate, goal: u32) -> GoalProgress {
    progress(store.get_for_date(date).dials, goal)
}

pub fn weekly_meeting_progress(analytics: &WeekAnalytics, goal: u32) -> GoalProgress {
    progress(analytics.totals.booked_meetings, goal)
}

// A zero goal counts as met.
fn progress(actual: u32, goal: u32) -> GoalProgress {
    let percent = if goal == 0 {
        100.0
    } else {
        (f64::from(actual) / f64::from(goal) * 100.0).min(100.0)
    };
    GoalProgress {
        actual,
        goal,
        remaining: goal.saturating_sub(actual),
        percent,
        met: actual >= goal,
    }
}
