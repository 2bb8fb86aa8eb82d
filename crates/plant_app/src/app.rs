use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime, Utc};
use directories::ProjectDirs;
use plant_core::{
    care,
    notifications::{NotificationError, NotificationRequest, NotificationSink},
    photos::NewPhoto,
    storage::FileStore,
    tasks::DEFAULT_UPCOMING_DAYS,
    CareCategory, CareError, CareService, PlantDraft, PlantLocation, TaskList,
};
use tracing::{debug, info};

use crate::cli::{Command, PhotoCommand};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub upcoming_days: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("PLANT_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir.trim());
            }
        }
        if let Ok(days) = std::env::var("PLANT_UPCOMING_DAYS") {
            match days.trim().parse::<i64>() {
                Ok(value) if value >= 0 => config.upcoming_days = value,
                _ => tracing::warn!(value = %days, "ignoring invalid PLANT_UPCOMING_DAYS"),
            }
        }
        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = ProjectDirs::from("com", "plantcare", "plantcare")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".plantcare"));
        Self {
            data_dir,
            upcoming_days: DEFAULT_UPCOMING_DAYS,
        }
    }
}

/// Stands in for a platform notification center: reminders end up in the log.
#[derive(Debug, Default)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn schedule(&self, notification: NotificationRequest) -> Result<(), NotificationError> {
        info!(
            task_id = %notification.payload.task_id,
            hour = notification.trigger.hour,
            minute = notification.trigger.minute,
            next_fire = %notification.trigger.next_fire_after(Utc::now()),
            title = %notification.title,
            "reminder scheduled: {}",
            notification.body
        );
        Ok(())
    }

    fn cancel_all(&self) -> Result<(), NotificationError> {
        debug!("cancelled scheduled reminders");
        Ok(())
    }
}

pub fn open_service(config: &AppConfig) -> Result<CareService> {
    info!(path = %config.data_dir.display(), "opening plant data");
    CareService::builder()
        .with_store(Box::new(FileStore::new(&config.data_dir)))
        .with_notification_sink(Box::new(LogNotificationSink))
        .build()
        .context("failed to open plant data")
}

pub fn run(config: AppConfig, command: Command) -> Result<()> {
    let service = open_service(&config)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&service, &config, command, &mut out)
}

pub fn execute<W: Write>(
    service: &CareService,
    config: &AppConfig,
    command: Command,
    out: &mut W,
) -> Result<()> {
    match command {
        Command::Agenda { days } => {
            let tasks = service.tasks()?;
            let today = service.now().date_naive();
            write_agenda(out, &tasks, days.unwrap_or(config.upcoming_days), today)?;
        }
        Command::Plants => {
            let now = service.now();
            let plants = service.plants()?;
            if plants.is_empty() {
                writeln!(out, "No plants yet. Add one with `plantcare add <name>`.")?;
            }
            for plant in plants {
                match &plant.species {
                    Some(species) => writeln!(out, "{} ({species}) [{}]", plant.name, plant.id)?,
                    None => writeln!(out, "{} [{}]", plant.name, plant.id)?,
                }
                for status in care::care_status(&plant, now) {
                    writeln!(
                        out,
                        "  {}: {}",
                        status.category,
                        format_due_in(status.days_until_due)
                    )?;
                }
            }
        }
        Command::Add {
            name,
            species,
            location,
            notes,
            water,
            fertilize,
            prune,
            repot,
        } => {
            let mut draft = PlantDraft::new(name);
            draft.species = species;
            draft.notes = notes;
            draft.location = location
                .as_deref()
                .map(str::parse::<PlantLocation>)
                .transpose()?;
            for (category, frequency) in [
                (CareCategory::Watering, water),
                (CareCategory::Fertilization, fertilize),
                (CareCategory::Pruning, prune),
                (CareCategory::Repotting, repot),
            ] {
                if let Some(days) = frequency {
                    draft = draft.with_schedule(category, days);
                }
            }
            let plant = service.create_plant(draft)?;
            writeln!(out, "Added {} [{}]", plant.name, plant.id)?;
        }
        Command::Done { plant_id, category } => {
            let category: CareCategory = category.parse()?;
            let plant = service.record_care(&plant_id, category)?;
            let next = service.next_care_date(&plant.id, category)?;
            match next {
                Some(due) => writeln!(
                    out,
                    "Recorded {category} for {}. Next: {}",
                    plant.name,
                    format_relative_label(due.date_naive(), service.now().date_naive())
                )?,
                None => writeln!(out, "Recorded {category} for {}.", plant.name)?,
            }
        }
        Command::Remove { plant_id } => {
            let plant = service.plant(&plant_id)?;
            service.delete_plant(&plant_id)?;
            writeln!(out, "Removed {}", plant.name)?;
        }
        Command::Remind { before, at, off, on } => {
            let mut prefs = service.preferences()?;
            let changed = before.is_some() || at.is_some() || off || on;
            if let Some(days) = before {
                prefs.remind_before_days = days;
            }
            if let Some(at) = at {
                prefs.reminder_time = NaiveTime::parse_from_str(at.trim(), "%H:%M")
                    .map_err(|_| CareError::validation("Reminder time must look like 08:30"))?;
            }
            if off {
                prefs.enabled = false;
            }
            if on {
                prefs.enabled = true;
            }
            if changed {
                service.save_preferences(&prefs)?;
            }
            if !prefs.enabled {
                service.cancel_reminders()?;
                writeln!(out, "Reminders are off.")?;
                return Ok(());
            }
            let report = service.schedule_reminders()?;
            writeln!(
                out,
                "Scheduled {} reminder(s) for {}",
                report.scheduled.len(),
                prefs.reminder_time.format("%H:%M")
            )?;
            if !report.failed.is_empty() {
                writeln!(out, "{} reminder(s) could not be scheduled", report.failed.len())?;
            }
        }
        Command::Photo { action } => match action {
            PhotoCommand::Add {
                plant_id,
                image_uri,
                notes,
                height,
                width,
            } => {
                let photo = service.add_photo(
                    &plant_id,
                    NewPhoto {
                        notes,
                        height_cm: height,
                        width_cm: width,
                        ..NewPhoto::new(image_uri)
                    },
                )?;
                writeln!(out, "Saved photo [{}]", photo.id)?;
            }
            PhotoCommand::List { plant_id } => {
                let photos = service.photos_for(&plant_id)?;
                if photos.is_empty() {
                    writeln!(out, "No photos yet.")?;
                }
                for photo in photos {
                    write!(out, "{}  {}", photo.timestamp.format("%Y-%m-%d"), photo.image_uri)?;
                    if let Some(height) = photo.height_cm {
                        write!(out, "  {height} cm")?;
                    }
                    if let Some(notes) = &photo.notes {
                        write!(out, "  {notes}")?;
                    }
                    writeln!(out)?;
                }
            }
        },
    }
    Ok(())
}

/// Text for an error shown to the user. Domain errors get their friendly
/// message, anything else its chain.
pub fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<CareError>() {
        Some(care) => care.user_message(),
        None => format!("{err:#}"),
    }
}

fn write_agenda<W: Write>(out: &mut W, tasks: &TaskList, horizon: i64, today: NaiveDate) -> Result<()> {
    let due_now = tasks.due_now();
    let upcoming = tasks.upcoming(horizon);
    if due_now.is_empty() && upcoming.is_empty() {
        writeln!(out, "Nothing to do. Your plants are happy.")?;
        return Ok(());
    }
    if !due_now.is_empty() {
        writeln!(out, "Needs care now")?;
        for task in due_now {
            writeln!(out, "  {}: {} [{}]", task.plant_name, task.describe(), task.plant_id)?;
        }
    }
    if !upcoming.is_empty() {
        writeln!(out, "Coming up")?;
        for task in upcoming {
            writeln!(
                out,
                "  {:<12}{}: {}",
                format_relative_label(task.due_date.date_naive(), today),
                task.plant_name,
                task.category
            )?;
        }
    }
    Ok(())
}

/// Same rule as the agenda: late only once a whole day has passed.
fn format_due_in(days_until_due: i64) -> String {
    match days_until_due {
        d if d < 0 => format!("overdue by {}", plural_days(-d)),
        0 => "due today".to_string(),
        1 => "due tomorrow".to_string(),
        d => format!("due in {}", plural_days(d)),
    }
}

fn plural_days(n: i64) -> String {
    if n == 1 {
        "1 day".to_string()
    } else {
        format!("{n} days")
    }
}

fn format_relative_label(date: NaiveDate, today: NaiveDate) -> String {
    let diff = date.signed_duration_since(today).num_days();
    match diff {
        -1 => "Yesterday".to_string(),
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        d if d < 0 => format!("{} days ago", -d),
        d => format!("In {} days", d),
    }
}
