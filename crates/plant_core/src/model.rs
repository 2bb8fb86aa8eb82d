use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

use crate::error::{CareError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CareCategory {
    Watering,
    Fertilization,
    Pruning,
    Repotting,
}

impl CareCategory {
    pub const ALL: [CareCategory; 4] = [
        CareCategory::Watering,
        CareCategory::Fertilization,
        CareCategory::Pruning,
        CareCategory::Repotting,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CareCategory::Watering => "watering",
            CareCategory::Fertilization => "fertilization",
            CareCategory::Pruning => "pruning",
            CareCategory::Repotting => "repotting",
        }
    }
}

impl fmt::Display for CareCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CareCategory {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        CareCategory::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CareError::validation(format!("unknown care category `{wanted}`")))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PlantLocation {
    #[serde(rename = "bedroom")]
    Bedroom,
    #[serde(rename = "balcony")]
    Balcony,
    #[serde(rename = "office")]
    Office,
    #[serde(rename = "living room")]
    LivingRoom,
    #[serde(rename = "kitchen")]
    Kitchen,
    #[serde(rename = "bathroom")]
    Bathroom,
    #[serde(rename = "other")]
    Other,
}

impl PlantLocation {
    pub const ALL: [PlantLocation; 7] = [
        PlantLocation::Bedroom,
        PlantLocation::Balcony,
        PlantLocation::Office,
        PlantLocation::LivingRoom,
        PlantLocation::Kitchen,
        PlantLocation::Bathroom,
        PlantLocation::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PlantLocation::Bedroom => "bedroom",
            PlantLocation::Balcony => "balcony",
            PlantLocation::Office => "office",
            PlantLocation::LivingRoom => "living room",
            PlantLocation::Kitchen => "kitchen",
            PlantLocation::Bathroom => "bathroom",
            PlantLocation::Other => "other",
        }
    }
}

impl fmt::Display for PlantLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlantLocation {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace(['-', '_'], " ");
        PlantLocation::ALL
            .into_iter()
            .find(|location| location.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| CareError::validation(format!("unknown location `{}`", s.trim())))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CareSchedule {
    pub category: CareCategory,
    #[serde(rename = "frequency")]
    pub frequency_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_performed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CareSchedule {
    pub fn new(category: CareCategory, frequency_days: u32) -> Self {
        Self {
            category,
            frequency_days,
            last_performed: None,
            notes: None,
        }
    }

    pub fn performed_at(mut self, when: DateTime<Utc>) -> Self {
        self.last_performed = Some(when);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<PlantLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub care_schedules: Vec<CareSchedule>,
}

impl Plant {
    pub fn schedule(&self, category: CareCategory) -> Option<&CareSchedule> {
        self.care_schedules
            .iter()
            .find(|schedule| schedule.category == category)
    }

    pub fn schedule_mut(&mut self, category: CareCategory) -> Option<&mut CareSchedule> {
        self.care_schedules
            .iter_mut()
            .find(|schedule| schedule.category == category)
    }
}

/// A plant as found in storage. Records written by older app versions may
/// lack timestamps or schedules.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredPlant {
    id: String,
    name: String,
    #[serde(default)]
    species: Option<String>,
    #[serde(default)]
    location: Option<PlantLocation>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    image_uri: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    care_schedules: Vec<CareSchedule>,
}

impl StoredPlant {
    /// Missing timestamps become `loaded_at`.
    pub(crate) fn into_plant(self, loaded_at: DateTime<Utc>) -> Plant {
        Plant {
            id: self.id,
            name: self.name,
            species: self.species,
            location: self.location,
            notes: self.notes,
            image_uri: self.image_uri,
            created_at: self.created_at.unwrap_or(loaded_at),
            updated_at: self.updated_at.unwrap_or(loaded_at),
            care_schedules: self.care_schedules,
        }
    }
}

/// Input for creating a plant. Ids and timestamps are assigned on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlantDraft {
    pub name: String,
    pub species: Option<String>,
    pub location: Option<PlantLocation>,
    pub notes: Option<String>,
    pub image_uri: Option<String>,
    pub care_schedules: Vec<CareSchedule>,
}

impl PlantDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_schedule(mut self, category: CareCategory, frequency_days: u32) -> Self {
        self.care_schedules
            .push(CareSchedule::new(category, frequency_days));
        self
    }

    pub fn with_species(mut self, species: impl Into<String>) -> Self {
        self.species = Some(species.into());
        self
    }

    pub fn with_location(mut self, location: PlantLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub(crate) fn into_plant(self, now: DateTime<Utc>) -> Result<Plant> {
        let name = required_text(&self.name, "Please enter a plant name")?;
        validate_schedules(&self.care_schedules)?;
        Ok(Plant {
            id: generate_id("plant", now),
            name,
            species: optional_text(self.species),
            location: self.location,
            notes: optional_text(self.notes),
            image_uri: optional_text(self.image_uri),
            created_at: now,
            updated_at: now,
            care_schedules: self.care_schedules,
        })
    }
}

/// Partial update. `None` leaves a field untouched; a `Some` schedule list
/// replaces the whole collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlantUpdate {
    pub name: Option<String>,
    pub species: Option<Option<String>>,
    pub location: Option<Option<PlantLocation>>,
    pub notes: Option<Option<String>>,
    pub image_uri: Option<Option<String>>,
    pub care_schedules: Option<Vec<CareSchedule>>,
}

impl PlantUpdate {
    pub(crate) fn apply(self, plant: &mut Plant, now: DateTime<Utc>) -> Result<()> {
        let name = match &self.name {
            Some(name) => Some(required_text(name, "Please enter a plant name")?),
            None => None,
        };
        if let Some(schedules) = &self.care_schedules {
            validate_schedules(schedules)?;
        }

        if let Some(name) = name {
            plant.name = name;
        }
        if let Some(species) = self.species {
            plant.species = optional_text(species);
        }
        if let Some(location) = self.location {
            plant.location = location;
        }
        if let Some(notes) = self.notes {
            plant.notes = optional_text(notes);
        }
        if let Some(image_uri) = self.image_uri {
            plant.image_uri = optional_text(image_uri);
        }
        if let Some(schedules) = self.care_schedules {
            plant.care_schedules = schedules;
        }
        plant.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlantPhoto {
    pub id: String,
    pub plant_id: String,
    pub image_uri: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, rename = "height", skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f32>,
    #[serde(default, rename = "width", skip_serializing_if = "Option::is_none")]
    pub width_cm: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoUpdate {
    pub image_uri: Option<String>,
    pub notes: Option<Option<String>>,
    pub height_cm: Option<Option<f32>>,
    pub width_cm: Option<Option<f32>>,
}

pub(crate) fn validate_schedules(schedules: &[CareSchedule]) -> Result<()> {
    if schedules.is_empty() {
        return Err(CareError::validation("Please add at least one care schedule"));
    }
    for (idx, schedule) in schedules.iter().enumerate() {
        if schedule.frequency_days == 0 {
            return Err(CareError::validation(format!(
                "{} frequency must be at least 1 day",
                schedule.category
            )));
        }
        if schedules[..idx]
            .iter()
            .any(|earlier| earlier.category == schedule.category)
        {
            return Err(CareError::validation(format!(
                "{} is scheduled more than once",
                schedule.category
            )));
        }
    }
    Ok(())
}

pub(crate) fn generate_id(prefix: &str, now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    format!("{}_{}_{}", prefix, now.timestamp_millis(), suffix)
}

pub(crate) fn required_text(value: &str, message: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CareError::validation(message));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
