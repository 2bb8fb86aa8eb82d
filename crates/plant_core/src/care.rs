use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{CareCategory, CareSchedule, Plant};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Per-schedule status of a single plant at an evaluation instant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CareStatus {
    pub category: CareCategory,
    pub days_until_due: i64,
    pub is_overdue: bool,
    pub days_overdue: i64,
}

/// Due date of the next occurrence: the last time the care was performed
/// (or `created_at` if never) plus `frequency_days` calendar days. The time of
/// day is carried over unchanged. Frequency is not validated here.
pub fn schedule_due_date(schedule: &CareSchedule, created_at: DateTime<Utc>) -> DateTime<Utc> {
    let anchor = schedule.last_performed.unwrap_or(created_at);
    anchor
        .checked_add_days(Days::new(u64::from(schedule.frequency_days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// `None` when the plant has no schedule for `category`.
pub fn next_due_date(plant: &Plant, category: CareCategory) -> Option<DateTime<Utc>> {
    plant
        .schedule(category)
        .map(|schedule| schedule_due_date(schedule, plant.created_at))
}

/// Whole days from `now` until `due`, rounded up. Negative once the due
/// instant is more than a full day in the past.
pub fn days_until(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = due.signed_duration_since(now).num_milliseconds();
    let days = millis.div_euclid(MILLIS_PER_DAY);
    if millis.rem_euclid(MILLIS_PER_DAY) == 0 {
        days
    } else {
        days + 1
    }
}

fn days_since(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    now.signed_duration_since(due)
        .num_milliseconds()
        .div_euclid(MILLIS_PER_DAY)
}

pub fn care_status(plant: &Plant, now: DateTime<Utc>) -> Vec<CareStatus> {
    plant
        .care_schedules
        .iter()
        .map(|schedule| {
            let due = schedule_due_date(schedule, plant.created_at);
            CareStatus {
                category: schedule.category,
                days_until_due: days_until(due, now),
                is_overdue: due < now,
                days_overdue: days_since(due, now),
            }
        })
        .collect()
}

/// Worst lateness across a plant's schedules, for warning badges.
pub fn max_days_overdue(plant: &Plant, now: DateTime<Utc>) -> i64 {
    care_status(plant, now)
        .into_iter()
        .filter(|status| status.is_overdue)
        .map(|status| status.days_overdue)
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 9, 30, 0).unwrap() + Duration::days(n)
    }

    fn plant_with(schedules: Vec<CareSchedule>) -> Plant {
        Plant {
            id: "plant_1".into(),
            name: "Calathea".into(),
            species: None,
            location: None,
            notes: None,
            image_uri: None,
            created_at: day(0),
            updated_at: day(0),
            care_schedules: schedules,
        }
    }

    #[test]
    fn never_performed_counts_from_creation() {
        let plant = plant_with(vec![CareSchedule::new(CareCategory::Watering, 7)]);
        assert_eq!(next_due_date(&plant, CareCategory::Watering), Some(day(7)));
    }

    #[test]
    fn last_performed_wins_over_creation() {
        let plant = plant_with(vec![
            CareSchedule::new(CareCategory::Fertilization, 30).performed_at(day(40))
        ]);
        assert_eq!(
            next_due_date(&plant, CareCategory::Fertilization),
            Some(day(70))
        );
    }

    #[test]
    fn missing_category_is_not_scheduled() {
        let plant = plant_with(vec![CareSchedule::new(CareCategory::Watering, 7)]);
        assert_eq!(next_due_date(&plant, CareCategory::Repotting), None);
    }

    #[test]
    fn adds_calendar_days_across_month_and_leap_boundaries() {
        let anchor = Utc.with_ymd_and_hms(2024, 2, 25, 18, 15, 0).unwrap();
        let schedule = CareSchedule::new(CareCategory::Pruning, 7);
        assert_eq!(
            schedule_due_date(&schedule, anchor),
            Utc.with_ymd_and_hms(2024, 3, 3, 18, 15, 0).unwrap()
        );
    }

    #[test]
    fn rounds_partial_days_up() {
        assert_eq!(days_until(day(7), day(10)), -3);
        assert_eq!(days_until(day(7), day(7)), 0);
        assert_eq!(days_until(day(7), day(7) + Duration::hours(6)), 0);
        assert_eq!(days_until(day(7), day(7) - Duration::hours(6)), 1);
        assert_eq!(days_until(day(7), day(5)), 2);
    }

    #[test]
    fn status_reports_overdue_days() {
        let plant = plant_with(vec![
            CareSchedule::new(CareCategory::Watering, 7),
            CareSchedule::new(CareCategory::Repotting, 365),
        ]);
        let status = care_status(&plant, day(10));
        assert_eq!(status.len(), 2);
        assert!(status[0].is_overdue);
        assert_eq!(status[0].days_overdue, 3);
        assert_eq!(status[0].days_until_due, -3);
        assert!(!status[1].is_overdue);
        assert_eq!(max_days_overdue(&plant, day(10)), 3);
        assert_eq!(max_days_overdue(&plant, day(1)), 0);
    }
}
