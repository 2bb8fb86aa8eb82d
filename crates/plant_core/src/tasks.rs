use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::care::{days_until, schedule_due_date};
use crate::model::{CareCategory, Plant};

pub const DEFAULT_UPCOMING_DAYS: i64 = 7;

/// A pending occurrence of a care schedule. Derived from the plant on every
/// generation and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CareTask {
    pub id: String,
    pub plant_id: String,
    pub plant_name: String,
    pub category: CareCategory,
    pub due_date: DateTime<Utc>,
    pub is_overdue: bool,
    pub days_until_due: i64,
    pub frequency_days: u32,
}

impl CareTask {
    pub fn task_id(plant_id: &str, category: CareCategory) -> String {
        format!("{}-{}", plant_id, category)
    }

    pub fn is_due_now(&self) -> bool {
        self.is_overdue || self.days_until_due == 0
    }

    pub fn describe(&self) -> String {
        let days = self.days_until_due;
        match days {
            d if d < 0 => format!("{} is overdue by {}", self.category, plural_days(-d)),
            0 => format!("{} is due today", self.category),
            d => format!("{} is due in {}", self.category, plural_days(d)),
        }
    }
}

fn plural_days(n: i64) -> String {
    if n == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", n)
    }
}

/// One generation of tasks, sorted by due date.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskList {
    tasks: Vec<CareTask>,
}

impl TaskList {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CareTask> {
        self.tasks.iter()
    }

    pub fn sorted(&self) -> &[CareTask] {
        &self.tasks
    }

    /// Overdue tasks and those due today.
    pub fn due_now(&self) -> Vec<&CareTask> {
        self.tasks.iter().filter(|task| task.is_due_now()).collect()
    }

    /// Tasks due after today and at most `horizon_days` ahead.
    pub fn upcoming(&self, horizon_days: i64) -> Vec<&CareTask> {
        self.tasks
            .iter()
            .filter(|task| task.days_until_due > 0 && task.days_until_due <= horizon_days)
            .collect()
    }

    pub fn for_plant<'a>(&'a self, plant_id: &'a str) -> impl Iterator<Item = &'a CareTask> + 'a {
        self.tasks.iter().filter(move |task| task.plant_id == plant_id)
    }

    pub fn find(&self, task_id: &str) -> Option<&CareTask> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

}

impl IntoIterator for TaskList {
    type Item = CareTask;
    type IntoIter = std::vec::IntoIter<CareTask>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.into_iter()
    }
}

/// Expand every (plant, schedule) pair into a task evaluated at `now`.
/// Equal due dates keep plant order, then schedule order.
pub fn generate_tasks(plants: &[Plant], now: DateTime<Utc>) -> TaskList {
    let mut tasks: Vec<CareTask> = plants
        .iter()
        .flat_map(|plant| {
            plant.care_schedules.iter().map(move |schedule| {
                let due_date = schedule_due_date(schedule, plant.created_at);
                let days_until_due = days_until(due_date, now);
                CareTask {
                    id: CareTask::task_id(&plant.id, schedule.category),
                    plant_id: plant.id.clone(),
                    plant_name: plant.name.clone(),
                    category: schedule.category,
                    due_date,
                    is_overdue: days_until_due < 0,
                    days_until_due,
                    frequency_days: schedule.frequency_days,
                }
            })
        })
        .collect();
    tasks.sort_by_key(|task| task.due_date);
    tracing::debug!(task_count = tasks.len(), plant_count = plants.len(), "generated care tasks");
    TaskList { tasks }
}
