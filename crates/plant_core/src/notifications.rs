use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveTime, TimeZone, Timelike, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{CareCategory, Plant};
use crate::tasks::{generate_tasks, CareTask};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct NotificationError(pub String);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub plant_id: String,
    pub task_id: String,
    pub category: CareCategory,
}

/// Repeats every day at a fixed UTC time of day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyTrigger {
    pub hour: u32,
    pub minute: u32,
}

impl DailyTrigger {
    pub fn at(time: NaiveTime) -> Self {
        Self {
            hour: time.hour(),
            minute: time.minute(),
        }
    }

    /// First firing strictly after `now`: today if the time is still ahead,
    /// tomorrow otherwise.
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or_default();
        let today = Utc.from_utc_datetime(&now.date_naive().and_time(time));
        if today > now {
            today
        } else {
            today.checked_add_days(Days::new(1)).unwrap_or(today)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub payload: NotificationPayload,
    pub trigger: DailyTrigger,
}

impl NotificationRequest {
    pub fn for_task(task: &CareTask, trigger: DailyTrigger) -> Self {
        Self {
            title: format!("Time to {}!", task.category),
            body: format!("{} needs {}.", task.plant_name, task.category),
            payload: NotificationPayload {
                plant_id: task.plant_id.clone(),
                task_id: task.id.clone(),
                category: task.category,
            },
            trigger,
        }
    }
}

/// Platform-specific notification adapters will implement this trait.
pub trait NotificationSink: Send + Sync {
    fn schedule(&self, notification: NotificationRequest) -> Result<(), NotificationError>;
    fn cancel_all(&self) -> Result<(), NotificationError>;
}

impl<S: NotificationSink + ?Sized> NotificationSink for Arc<S> {
    fn schedule(&self, notification: NotificationRequest) -> Result<(), NotificationError> {
        (**self).schedule(notification)
    }

    fn cancel_all(&self) -> Result<(), NotificationError> {
        (**self).cancel_all()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub enabled: bool,
    pub remind_before_days: i64,
    #[serde(with = "hh_mm")]
    pub reminder_time: NaiveTime,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            enabled: true,
            remind_before_days: 1,
            reminder_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
        }
    }
}

mod hh_mm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format("%H:%M"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderReport {
    pub disabled: bool,
    pub considered: usize,
    pub scheduled: Vec<String>,
    pub failed: Vec<String>,
}

/// Replace every scheduled notification with one per task that is not yet
/// overdue and falls due within `remind_before_days`. A failure on one
/// notification does not stop the others.
pub fn schedule_reminders(
    plants: &[Plant],
    prefs: &NotificationPreferences,
    sink: &dyn NotificationSink,
    now: DateTime<Utc>,
) -> ReminderReport {
    if !prefs.enabled {
        tracing::info!("reminders disabled, nothing scheduled");
        return ReminderReport {
            disabled: true,
            ..ReminderReport::default()
        };
    }

    let tasks = generate_tasks(plants, now);
    let due_soon: Vec<&CareTask> = tasks
        .iter()
        .filter(|task| !task.is_overdue && task.days_until_due <= prefs.remind_before_days)
        .collect();

    if let Err(err) = sink.cancel_all() {
        tracing::warn!(%err, "failed to cancel previously scheduled reminders");
    }

    let trigger = DailyTrigger::at(prefs.reminder_time);
    let mut report = ReminderReport {
        considered: tasks.len(),
        ..ReminderReport::default()
    };
    for task in due_soon {
        match sink.schedule(NotificationRequest::for_task(task, trigger)) {
            Ok(()) => report.scheduled.push(task.id.clone()),
            Err(err) => {
                tracing::warn!(task_id = %task.id, %err, "failed to schedule reminder");
                report.failed.push(task.id.clone());
            }
        }
    }

    tracing::info!(
        scheduled = report.scheduled.len(),
        failed = report.failed.len(),
        "care reminders scheduled"
    );
    report
}

/// Records requests instead of talking to a platform. Individual task ids
/// can be configured to fail.
#[derive(Debug, Default)]
pub struct InMemoryNotificationSink {
    scheduled: RwLock<Vec<NotificationRequest>>,
    failing_tasks: RwLock<HashSet<String>>,
    fail_cancel: AtomicBool,
    cancel_calls: AtomicUsize,
}

impl InMemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for_task(&self, task_id: impl Into<String>) {
        self.failing_tasks.write().insert(task_id.into());
    }

    pub fn fail_cancel(&self, fail: bool) {
        self.fail_cancel.store(fail, Ordering::SeqCst);
    }

    pub fn scheduled(&self) -> Vec<NotificationRequest> {
        self.scheduled.read().clone()
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }
}

impl NotificationSink for InMemoryNotificationSink {
    fn schedule(&self, notification: NotificationRequest) -> Result<(), NotificationError> {
        if self
            .failing_tasks
            .read()
            .contains(&notification.payload.task_id)
        {
            return Err(NotificationError(format!(
                "platform refused {}",
                notification.payload.task_id
            )));
        }
        self.scheduled.write().push(notification);
        Ok(())
    }

    fn cancel_all(&self) -> Result<(), NotificationError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_cancel.load(Ordering::SeqCst) {
            return Err(NotificationError("cancel rejected".into()));
        }
        self.scheduled.write().clear();
        Ok(())
    }
}
