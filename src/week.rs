use crate::kpi::KpiStore;
use crate::models::{DailyMetrics, MetricAverages, WeekAnalytics, WeekDayEntry, WeekRatios};
use chrono::{Datelike, Days, NaiveDate};

const WORKDAY_NAMES: [&str; 5] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];

/// Monday of the week containing `date`. Sunday belongs to the week that
/// started six days earlier. Dates in chrono's first partial week saturate
/// to `NaiveDate::MIN`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(offset)).unwrap_or(NaiveDate::MIN)
}

/// Monday to Friday of the week containing `date`. Days past
/// `NaiveDate::MAX` repeat the last representable date.
pub fn week_window(store: &KpiStore, date: NaiveDate) -> [WeekDayEntry; 5] {
    let monday = week_start(date);
    std::array::from_fn(|offset| {
        let day = monday
            .checked_add_days(Days::new(offset as u64))
            .unwrap_or(NaiveDate::MAX);
        WeekDayEntry {
            date: day,
            day_name: WORKDAY_NAMES[offset].to_string(),
            metrics: store.get_for_date(day),
        }
    })
}

pub fn aggregate_week(store: &KpiStore, week_start_date: NaiveDate) -> WeekAnalytics {
    let days = week_window(store, week_start_date);

    let mut totals = DailyMetrics::default();
    for entry in &days {
        totals.absorb(&entry.metrics);
    }
    let days_worked = days.iter().filter(|entry| entry.metrics.dials > 0).count() as u32;

    WeekAnalytics {
        week_start: week_start(week_start_date),
        averages: averages(&totals, days_worked),
        ratios: ratios(&totals),
        days,
        totals,
        days_worked,
    }
}

fn averages(totals: &DailyMetrics, days_worked: u32) -> MetricAverages {
    if days_worked == 0 {
        return MetricAverages::default();
    }
    let per_day = |value: u32| f64::from(value) / f64::from(days_worked);
    MetricAverages {
        dials: per_day(totals.dials),
        pickups: per_day(totals.pickups),
        conversations: per_day(totals.conversations),
        triage: per_day(totals.triage),
        booked_meetings: per_day(totals.booked_meetings),
        meetings_ran: per_day(totals.meetings_ran),
    }
}

fn ratios(totals: &DailyMetrics) -> WeekRatios {
    WeekRatios {
        meetings_showed_ratio: ratio(totals.meetings_ran, totals.booked_meetings),
        conversations_to_meetings: ratio(totals.booked_meetings, totals.conversations),
        triage_to_conversations: ratio(totals.triage, totals.conversations),
        pickups_to_conversations: ratio(totals.pickups, totals.conversations),
    }
}

fn ratio(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        f64::from(numerator) / f64::from(denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::{aggregate_week, week_start};
    use crate::kpi::KpiStore;
    use crate::models::{DailyMetrics, Metric, MetricPatch};
    use chrono::NaiveDate;

    fn day(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date")
    }

    fn store_with(date: &str, metrics: DailyMetrics) -> KpiStore {
        let patch = MetricPatch {
            dials: Some(metrics.dials),
            pickups: Some(metrics.pickups),
            conversations: Some(metrics.conversations),
            triage: Some(metrics.triage),
            booked_meetings: Some(metrics.booked_meetings),
            meetings_ran: Some(metrics.meetings_ran),
            objections: Some(metrics.objections),
        };
        KpiStore::new().update_for_date(day(date), &patch)
    }

    #[test]
    fn week_start_rounds_down_to_monday() {
        assert_eq!(week_start(day("2024-01-15")), day("2024-01-15"));
        assert_eq!(week_start(day("2024-01-17")), day("2024-01-15"));
        assert_eq!(week_start(day("2024-01-21")), day("2024-01-15"));
        assert_eq!(week_start(day("2024-01-22")), day("2024-01-22"));
    }

    #[test]
    fn empty_store_yields_five_zero_days() {
        let analytics = aggregate_week(&KpiStore::new(), day("2024-01-15"));
        assert_eq!(analytics.days.len(), 5);
        assert_eq!(analytics.days_worked, 0);
        assert_eq!(analytics.totals, DailyMetrics::default());
        assert_eq!(analytics.averages.dials, 0.0);
        assert_eq!(analytics.ratios.meetings_showed_ratio, 0.0);
        assert_eq!(analytics.ratios.pickups_to_conversations, 0.0);
    }

    #[test]
    fn midweek_date_covers_monday_to_friday() {
        let analytics = aggregate_week(&KpiStore::new(), day("2024-01-17"));
        let dates = analytics.days.iter().map(|entry| entry.date).collect::<Vec<_>>();
        assert_eq!(
            dates,
            vec![
                day("2024-01-15"),
                day("2024-01-16"),
                day("2024-01-17"),
                day("2024-01-18"),
                day("2024-01-19"),
            ]
        );
        assert_eq!(analytics.days[0].day_name, "Monday");
        assert_eq!(analytics.days[4].day_name, "Friday");
        assert_eq!(analytics.week_start, day("2024-01-15"));
    }

    #[test]
    fn single_active_day_drives_averages_and_ratios() {
        let store = store_with(
            "2024-01-15",
            DailyMetrics {
                dials: 10,
                pickups: 4,
                conversations: 2,
                triage: 1,
                booked_meetings: 1,
                meetings_ran: 1,
                objections: vec!["too expensive".to_string()],
            },
        )
        .update_for_date(day("2024-01-16"), &MetricPatch::new().with(Metric::Dials, 0));

        let analytics = aggregate_week(&store, day("2024-01-15"));
        assert_eq!(analytics.totals.dials, 10);
        assert_eq!(analytics.days_worked, 1);
        assert_eq!(analytics.averages.dials, 10.0);
        assert_eq!(analytics.ratios.meetings_showed_ratio, 1.0);
        assert_eq!(analytics.ratios.pickups_to_conversations, 2.0);
        assert_eq!(analytics.ratios.conversations_to_meetings, 0.5);
        assert_eq!(analytics.ratios.triage_to_conversations, 0.5);
        assert_eq!(analytics.totals.objections, vec!["too expensive".to_string()]);
    }

    #[test]
    fn averages_divide_by_active_days_only() {
        let store = KpiStore::new()
            .increment_metric(day("2024-01-15"), Metric::Dials, 10)
            .increment_metric(day("2024-01-17"), Metric::Dials, 5)
            .increment_metric(day("2024-01-17"), Metric::Pickups, 3)
            .increment_metric(day("2024-01-18"), Metric::Pickups, 2);

        let analytics = aggregate_week(&store, day("2024-01-19"));
        assert_eq!(analytics.days_worked, 2);
        assert_eq!(analytics.averages.dials, 7.5);
        assert_eq!(analytics.averages.pickups, 2.5);
    }

    #[test]
    fn objections_concatenate_in_weekday_order() {
        let store = KpiStore::new()
            .add_objection(day("2024-01-17"), "timing")
            .add_objection(day("2024-01-15"), "price")
            .add_objection(day("2024-01-15"), "no need")
            .add_objection(day("2024-01-20"), "weekend call");

        let analytics = aggregate_week(&store, day("2024-01-15"));
        assert_eq!(analytics.totals.objections, vec!["price", "no need", "timing"]);
    }

    #[test]
    fn pickups_to_conversations_divides_pickups_by_conversations() {
        let store = KpiStore::new()
            .increment_metric(day("2024-01-16"), Metric::Dials, 12)
            .increment_metric(day("2024-01-16"), Metric::Pickups, 6)
            .increment_metric(day("2024-01-16"), Metric::Conversations, 2);

        let ratios = aggregate_week(&store, day("2024-01-16")).ratios;
        assert_eq!(ratios.pickups_to_conversations, 3.0);
    }

    #[test]
    fn window_keeps_five_days_at_the_end_of_the_calendar() {
        let analytics = aggregate_week(&KpiStore::new(), NaiveDate::MAX);
        assert_eq!(analytics.days.len(), 5);
        assert_eq!(analytics.days[4].day_name, "Friday");
        assert!(analytics.days.iter().all(|entry| entry.date <= NaiveDate::MAX));
    }

    #[test]
    fn zero_divisors_produce_zero_ratios() {
        let store = KpiStore::new()
            .increment_metric(day("2024-01-15"), Metric::Dials, 4)
            .increment_metric(day("2024-01-15"), Metric::MeetingsRan, 2)
            .increment_metric(day("2024-01-15"), Metric::Triage, 1);

        let ratios = aggregate_week(&store, day("2024-01-15")).ratios;
        assert_eq!(ratios.meetings_showed_ratio, 0.0);
        assert_eq!(ratios.triage_to_conversations, 0.0);
        assert!(!ratios.meetings_showed_ratio.is_nan());
    }
}
