use chrono::{DateTime, Utc};

use crate::error::{CareError, Result};
use crate::model::{generate_id, optional_text, PhotoUpdate, PlantPhoto};

/// Camera or gallery access. Returns a local file URI, or `None` when the
/// user backs out.
pub trait ImagePicker: Send + Sync {
    fn pick_image(&self) -> Result<Option<String>>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPhoto {
    pub image_uri: String,
    pub notes: Option<String>,
    pub height_cm: Option<f32>,
    pub width_cm: Option<f32>,
}

impl NewPhoto {
    pub fn new(image_uri: impl Into<String>) -> Self {
        Self {
            image_uri: image_uri.into(),
            ..Self::default()
        }
    }

    pub(crate) fn into_photo(self, plant_id: &str, now: DateTime<Utc>) -> Result<PlantPhoto> {
        let image_uri = self.image_uri.trim().to_string();
        if image_uri.is_empty() {
            return Err(CareError::validation("A photo needs an image"));
        }
        validate_measurement(self.height_cm)?;
        validate_measurement(self.width_cm)?;
        Ok(PlantPhoto {
            id: generate_id("photo", now),
            plant_id: plant_id.to_string(),
            image_uri,
            timestamp: now,
            notes: optional_text(self.notes),
            height_cm: self.height_cm,
            width_cm: self.width_cm,
        })
    }
}

fn validate_measurement(value: Option<f32>) -> Result<()> {
    match value {
        Some(cm) if !cm.is_finite() || cm < 0.0 => Err(CareError::validation(
            "Measurements must be a positive number of centimetres",
        )),
        _ => Ok(()),
    }
}

impl PhotoUpdate {
    pub(crate) fn apply(self, photo: &mut PlantPhoto) -> Result<()> {
        if let Some(Some(cm)) = self.height_cm {
            validate_measurement(Some(cm))?;
        }
        if let Some(Some(cm)) = self.width_cm {
            validate_measurement(Some(cm))?;
        }
        if let Some(uri) = self.image_uri {
            let uri = uri.trim().to_string();
            if uri.is_empty() {
                return Err(CareError::validation("A photo needs an image"));
            }
            photo.image_uri = uri;
        }
        if let Some(notes) = self.notes {
            photo.notes = optional_text(notes);
        }
        if let Some(height) = self.height_cm {
            photo.height_cm = height;
        }
        if let Some(width) = self.width_cm {
            photo.width_cm = width;
        }
        Ok(())
    }
}

/// Photos of one plant, newest first.
pub fn photos_for_plant(photos: &[PlantPhoto], plant_id: &str) -> Vec<PlantPhoto> {
    let mut selected: Vec<PlantPhoto> = photos
        .iter()
        .filter(|photo| photo.plant_id == plant_id)
        .cloned()
        .collect();
    selected.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    selected
}
