use crate::errors::{AppError, AppResult};
use crate::models::{DueStep, SequenceDefinition, SequenceEnrollment, SequenceStep};
use chrono::{Days, NaiveDate};
use uuid::Uuid;

impl SequenceDefinition {
    pub fn new(name: impl Into<String>, steps: Vec<SequenceStep>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            steps,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("sequence name is required".to_string()));
        }
        if self.steps.is_empty() {
            return Err(AppError::Validation(format!("sequence '{}' has no steps", self.name)));
        }
        if self.steps.windows(2).any(|pair| pair[1].day_offset < pair[0].day_offset) {
            return Err(AppError::Validation(format!(
                "sequence '{}' steps must be ordered by day offset",
                self.name
            )));
        }
        Ok(())
    }
}

impl SequenceEnrollment {
    pub fn new(sequence_id: impl Into<String>, started_on: NaiveDate) -> Self {
        Self {
            sequence_id: sequence_id.into(),
            started_on,
            completed_steps: Default::default(),
        }
    }
}

pub fn step_due_date(enrollment: &SequenceEnrollment, step: &SequenceStep) -> NaiveDate {
    enrollment
        .started_on
        .checked_add_days(Days::new(u64::from(step.day_offset)))
        .unwrap_or(NaiveDate::MAX)
}

/// Incomplete steps due on or before `today`, in step order.
pub fn due_steps(definition: &SequenceDefinition, enrollment: &SequenceEnrollment, today: NaiveDate) -> Vec<DueStep> {
    pending(definition, enrollment, today)
        .filter(|due| due.due_on <= today)
        .collect()
}

pub fn next_step(definition: &SequenceDefinition, enrollment: &SequenceEnrollment, today: NaiveDate) -> Option<DueStep> {
    pending(definition, enrollment, today).next()
}

pub fn complete_step(
    definition: &SequenceDefinition,
    enrollment: &SequenceEnrollment,
    index: usize,
) -> AppResult<SequenceEnrollment> {
    if enrollment.sequence_id != definition.id {
        return Err(AppError::Validation(format!(
            "enrollment belongs to sequence {}, not {}",
            enrollment.sequence_id, definition.id
        )));
    }
    if index >= definition.steps.len() {
        return Err(AppError::NotFound(format!(
            "step {} of sequence '{}' ({} steps)",
            index,
            definition.name,
            definition.steps.len()
        )));
    }
    let mut updated = enrollment.clone();
    updated.completed_steps.insert(index);
    Ok(updated)
}

pub fn is_finished(definition: &SequenceDefinition, enrollment: &SequenceEnrollment) -> bool {
    (0..definition.steps.len()).all(|index| enrollment.completed_steps.contains(&index))
}

fn pending<'a>(
    definition: &'a SequenceDefinition,
    enrollment: &'a SequenceEnrollment,
    today: NaiveDate,
) -> impl Iterator<Item = DueStep> + 'a {
    definition
        .steps
        .iter()
        .enumerate()
        .filter(move |(index, _)| !enrollment.completed_steps.contains(index))
        .map(move |(index, step)| {
            let due_on = step_due_date(enrollment, step);
            DueStep {
                index,
                step: step.clone(),
                due_on,
                overdue_days: (today - due_on).num_days().max(0),
            }
        })
}

#[cfg(test)]
mod tests {
    use super::{complete_step, due_steps, is_finished, next_step};
    use crate::models::{OutreachChannel, SequenceDefinition, SequenceEnrollment, SequenceStep};
    use chrono::NaiveDate;

    fn day(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date")
    }

    fn step(day_offset: u32, channel: OutreachChannel) -> SequenceStep {
        SequenceStep {
            day_offset,
            channel,
            instruction: format!("touch on day {}", day_offset),
        }
    }

    fn three_touch() -> SequenceDefinition {
        SequenceDefinition::new(
            "three touch",
            vec![
                step(0, OutreachChannel::Call),
                step(0, OutreachChannel::Email),
                step(3, OutreachChannel::Call),
            ],
        )
    }

    #[test]
    fn validation_rejects_unordered_and_empty() {
        assert!(three_touch().validate().is_ok());
        assert!(SequenceDefinition::new("empty", Vec::new()).validate().is_err());
        assert!(SequenceDefinition::new(" ", vec![step(0, OutreachChannel::Call)]).validate().is_err());
        let unordered = SequenceDefinition::new(
            "unordered",
            vec![step(2, OutreachChannel::Call), step(1, OutreachChannel::Email)],
        );
        assert!(unordered.validate().is_err());
    }

    #[test]
    fn due_steps_respect_offsets_and_completion() {
        let definition = three_touch();
        let enrollment = SequenceEnrollment::new(definition.id.clone(), day("2024-01-15"));

        let due = due_steps(&definition, &enrollment, day("2024-01-16"));
        assert_eq!(due.iter().map(|entry| entry.index).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(due[0].overdue_days, 1);

        let enrollment = complete_step(&definition, &enrollment, 0).expect("complete");
        let due = due_steps(&definition, &enrollment, day("2024-01-18"));
        assert_eq!(due.iter().map(|entry| entry.index).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(due[1].overdue_days, 0);
    }

    #[test]
    fn next_step_looks_past_today() {
        let definition = three_touch();
        let mut enrollment = SequenceEnrollment::new(definition.id.clone(), day("2024-01-15"));
        enrollment.completed_steps.extend([0, 1]);

        let next = next_step(&definition, &enrollment, day("2024-01-15")).expect("next");
        assert_eq!(next.index, 2);
        assert_eq!(next.due_on, day("2024-01-18"));
        assert_eq!(next.overdue_days, 0);
    }

    #[test]
    fn completing_every_step_finishes() {
        let definition = three_touch();
        let mut enrollment = SequenceEnrollment::new(definition.id.clone(), day("2024-01-15"));
        for index in 0..3 {
            enrollment = complete_step(&definition, &enrollment, index).expect("complete");
        }
        assert!(is_finished(&definition, &enrollment));
        assert!(next_step(&definition, &enrollment, day("2024-01-20")).is_none());
        assert!(complete_step(&definition, &enrollment, 3).is_err());
    }
}
