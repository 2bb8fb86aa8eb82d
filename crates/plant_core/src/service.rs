use chrono::{DateTime, Utc};

use crate::{
    cache::CollectionCache,
    care::{self, CareStatus},
    clock::{Clock, SystemClock},
    error::{CareError, Result},
    model::{CareCategory, PhotoUpdate, Plant, PlantDraft, PlantPhoto, PlantUpdate, StoredPlant},
    notifications::{self, NotificationPreferences, NotificationSink, ReminderReport},
    photos::{self, ImagePicker, NewPhoto},
    storage::{KeyValueStore, MemoryStore, PHOTOS_KEY, PLANTS_KEY, PREFERENCES_KEY},
    store,
    tasks::{self, CareTask, TaskList},
};

pub struct CareService {
    store: Box<dyn KeyValueStore>,
    notification_sink: Option<Box<dyn NotificationSink>>,
    clock: Box<dyn Clock>,
    plants: CollectionCache<Plant>,
}

pub struct CareServiceBuilder {
    store: Option<Box<dyn KeyValueStore>>,
    notification_sink: Option<Box<dyn NotificationSink>>,
    clock: Option<Box<dyn Clock>>,
}

impl CareServiceBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            notification_sink: None,
            clock: None,
        }
    }

    pub fn with_store(mut self, store: Box<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_notification_sink(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.notification_sink = Some(sink);
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the service and loads the plant collection once.
    pub fn build(self) -> Result<CareService> {
        let service = CareService {
            store: self
                .store
                .unwrap_or_else(|| Box::new(MemoryStore::new())),
            notification_sink: self.notification_sink,
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock)),
            plants: CollectionCache::new("plants"),
        };
        service.reload()?;
        Ok(service)
    }
}

impl Default for CareServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CareService {
    pub fn builder() -> CareServiceBuilder {
        CareServiceBuilder::new()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn cache(&self) -> &CollectionCache<Plant> {
        &self.plants
    }

    pub fn plants(&self) -> Result<Vec<Plant>> {
        if let Some(plants) = self.plants.get() {
            return Ok(plants);
        }
        match store::load_collection::<StoredPlant>(self.store.as_ref(), PLANTS_KEY) {
            Ok(stored) => {
                let loaded_at = self.now();
                let plants: Vec<Plant> = stored
                    .into_iter()
                    .map(|plant| plant.into_plant(loaded_at))
                    .collect();
                tracing::debug!(count = plants.len(), "plants loaded from storage");
                self.plants.replace(plants.clone());
                Ok(plants)
            }
            Err(err) => {
                tracing::error!(%err, "failed to load plants");
                Err(err)
            }
        }
    }

    /// Drop the cached collection and read it back from storage.
    pub fn reload(&self) -> Result<Vec<Plant>> {
        self.plants.invalidate();
        self.plants()
    }

    pub fn plant(&self, id: &str) -> Result<Plant> {
        self.plants()?
            .into_iter()
            .find(|plant| plant.id == id)
            .ok_or_else(|| CareError::not_found("plant", id))
    }

    pub fn create_plant(&self, draft: PlantDraft) -> Result<Plant> {
        let plant = draft.into_plant(self.now())?;
        let mut plants = self.plants()?;
        plants.push(plant.clone());
        self.persist_plants(plants)?;
        tracing::info!(plant_id = %plant.id, name = %plant.name, "plant created");
        Ok(plant)
    }

    pub fn update_plant(&self, id: &str, update: PlantUpdate) -> Result<Plant> {
        let now = self.now();
        let mut plants = self.plants()?;
        let plant = plants
            .iter_mut()
            .find(|plant| plant.id == id)
            .ok_or_else(|| CareError::not_found("plant", id))?;
        update.apply(plant, now)?;
        let updated = plant.clone();
        self.persist_plants(plants)?;
        tracing::info!(plant_id = %id, "plant updated");
        Ok(updated)
    }

    /// Removes the plant together with its photo log.
    pub fn delete_plant(&self, id: &str) -> Result<()> {
        let plants = self.plants()?;
        let before = plants.len();
        let remaining: Vec<Plant> = plants.into_iter().filter(|plant| plant.id != id).collect();
        if remaining.len() == before {
            return Err(CareError::not_found("plant", id));
        }
        // Photos are read before anything is written.
        let photos: Vec<PlantPhoto> = store::load_collection(self.store.as_ref(), PHOTOS_KEY)?;
        let photo_count = photos.len();
        let kept: Vec<PlantPhoto> = photos
            .into_iter()
            .filter(|photo| photo.plant_id != id)
            .collect();
        self.persist_plants(remaining)?;

        if kept.len() != photo_count {
            if let Err(err) = store::save_collection(self.store.as_ref(), PHOTOS_KEY, &kept) {
                tracing::warn!(plant_id = %id, %err, "plant deleted but its photos were kept");
            }
        }
        tracing::info!(plant_id = %id, photos_removed = photo_count - kept.len(), "plant deleted");
        Ok(())
    }

    /// Mark one kind of care as done now. Tasks must be regenerated by the
    /// caller to see the new due date.
    pub fn record_care(&self, plant_id: &str, category: CareCategory) -> Result<Plant> {
        let now = self.now();
        let mut plants = self.plants()?;
        let plant = plants
            .iter_mut()
            .find(|plant| plant.id == plant_id)
            .ok_or_else(|| CareError::not_found("plant", plant_id))?;
        let schedule = plant
            .schedule_mut(category)
            .ok_or_else(|| CareError::not_found("care schedule", CareTask::task_id(plant_id, category)))?;
        schedule.last_performed = Some(now);
        plant.updated_at = now;
        let updated = plant.clone();
        self.persist_plants(plants)?;
        tracing::info!(plant_id = %plant_id, %category, "care recorded");
        Ok(updated)
    }

    pub fn complete_task(&self, task: &CareTask) -> Result<Plant> {
        self.record_care(&task.plant_id, task.category)
    }

    pub fn next_care_date(&self, plant_id: &str, category: CareCategory) -> Result<Option<DateTime<Utc>>> {
        let plant = self.plant(plant_id)?;
        Ok(care::next_due_date(&plant, category))
    }

    pub fn tasks(&self) -> Result<TaskList> {
        Ok(tasks::generate_tasks(&self.plants()?, self.now()))
    }

    pub fn care_status(&self, plant_id: &str) -> Result<Vec<CareStatus>> {
        let plant = self.plant(plant_id)?;
        Ok(care::care_status(&plant, self.now()))
    }

    pub fn preferences(&self) -> Result<NotificationPreferences> {
        Ok(store::load_value(self.store.as_ref(), PREFERENCES_KEY)?.unwrap_or_default())
    }

    pub fn save_preferences(&self, prefs: &NotificationPreferences) -> Result<()> {
        if prefs.remind_before_days < 0 {
            return Err(CareError::validation("Reminder lead time cannot be negative"));
        }
        store::save_value(self.store.as_ref(), PREFERENCES_KEY, prefs)
    }

    pub fn schedule_reminders(&self) -> Result<ReminderReport> {
        let sink = self.sink()?;
        let prefs = self.preferences()?;
        let plants = self.plants()?;
        Ok(notifications::schedule_reminders(
            &plants,
            &prefs,
            sink,
            self.now(),
        ))
    }

    pub fn cancel_reminders(&self) -> Result<()> {
        self.sink()?.cancel_all()?;
        Ok(())
    }

    pub fn photos_for(&self, plant_id: &str) -> Result<Vec<PlantPhoto>> {
        let photos: Vec<PlantPhoto> = store::load_collection(self.store.as_ref(), PHOTOS_KEY)?;
        Ok(photos::photos_for_plant(&photos, plant_id))
    }

    pub fn latest_photo(&self, plant_id: &str) -> Result<Option<PlantPhoto>> {
        Ok(self.photos_for(plant_id)?.into_iter().next())
    }

    pub fn add_photo(&self, plant_id: &str, photo: NewPhoto) -> Result<PlantPhoto> {
        self.plant(plant_id)?;
        let photo = photo.into_photo(plant_id, self.now())?;
        let mut photos: Vec<PlantPhoto> = store::load_collection(self.store.as_ref(), PHOTOS_KEY)?;
        photos.push(photo.clone());
        store::save_collection(self.store.as_ref(), PHOTOS_KEY, &photos)?;
        tracing::info!(plant_id = %plant_id, photo_id = %photo.id, "photo added");
        Ok(photo)
    }

    /// `Ok(None)` when the picker was dismissed without an image.
    pub fn capture_photo(
        &self,
        picker: &dyn ImagePicker,
        plant_id: &str,
        notes: Option<String>,
    ) -> Result<Option<PlantPhoto>> {
        let Some(image_uri) = picker.pick_image()? else {
            tracing::debug!(plant_id = %plant_id, "image picking cancelled");
            return Ok(None);
        };
        let photo = NewPhoto {
            notes,
            ..NewPhoto::new(image_uri)
        };
        self.add_photo(plant_id, photo).map(Some)
    }

    pub fn update_photo(&self, photo_id: &str, update: PhotoUpdate) -> Result<PlantPhoto> {
        let mut photos: Vec<PlantPhoto> = store::load_collection(self.store.as_ref(), PHOTOS_KEY)?;
        let photo = photos
            .iter_mut()
            .find(|photo| photo.id == photo_id)
            .ok_or_else(|| CareError::not_found("photo", photo_id))?;
        update.apply(photo)?;
        let updated = photo.clone();
        store::save_collection(self.store.as_ref(), PHOTOS_KEY, &photos)?;
        Ok(updated)
    }

    pub fn delete_photo(&self, photo_id: &str) -> Result<()> {
        let photos: Vec<PlantPhoto> = store::load_collection(self.store.as_ref(), PHOTOS_KEY)?;
        let before = photos.len();
        let kept: Vec<PlantPhoto> = photos
            .into_iter()
            .filter(|photo| photo.id != photo_id)
            .collect();
        if kept.len() == before {
            return Err(CareError::not_found("photo", photo_id));
        }
        store::save_collection(self.store.as_ref(), PHOTOS_KEY, &kept)?;
        tracing::info!(photo_id = %photo_id, "photo deleted");
        Ok(())
    }

    /// Wipe plants and photos. Preferences survive.
    pub fn clear(&self) -> Result<()> {
        self.plants.invalidate();
        store::remove_key(self.store.as_ref(), PLANTS_KEY)?;
        store::remove_key(self.store.as_ref(), PHOTOS_KEY)?;
        tracing::info!("plant data cleared");
        Ok(())
    }
}

impl CareService {
    fn persist_plants(&self, plants: Vec<Plant>) -> Result<()> {
        match store::save_collection(self.store.as_ref(), PLANTS_KEY, &plants) {
            Ok(()) => {
                self.plants.replace(plants);
                Ok(())
            }
            Err(err) => {
                self.plants.invalidate();
                tracing::error!(%err, "failed to save plants");
                Err(err)
            }
        }
    }

    fn sink(&self) -> Result<&dyn NotificationSink> {
        self.notification_sink
            .as_deref()
            .ok_or_else(|| CareError::Notification("no notification sink configured".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::model::CareSchedule;
    use crate::notifications::InMemoryNotificationSink;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    struct Fixture {
        service: CareService,
        store: Arc<MemoryStore>,
        clock: Arc<FixedClock>,
        sink: Arc<InMemoryNotificationSink>,
    }

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap() + Duration::days(n)
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(day(0)));
        let sink = Arc::new(InMemoryNotificationSink::new());
        let service = CareService::builder()
            .with_store(Box::new(store.clone()))
            .with_clock(Box::new(clock.clone()))
            .with_notification_sink(Box::new(sink.clone()))
            .build()
            .expect("build care service");
        Fixture {
            service,
            store,
            clock,
            sink,
        }
    }

    fn fern() -> PlantDraft {
        PlantDraft::new("Fern")
            .with_schedule(CareCategory::Watering, 7)
            .with_schedule(CareCategory::Fertilization, 30)
    }

    #[test]
    fn overdue_task_leaves_due_now_after_completion() {
        let fx = fixture();
        let plant = fx.service.create_plant(fern()).unwrap();

        fx.clock.set(day(10));
        let tasks = fx.service.tasks().unwrap();
        let watering = tasks
            .find(&CareTask::task_id(&plant.id, CareCategory::Watering))
            .expect("watering task")
            .clone();
        assert_eq!(watering.due_date, day(7));
        assert_eq!(watering.days_until_due, -3);
        assert!(watering.is_overdue);
        assert_eq!(tasks.due_now().len(), 1);

        fx.service.complete_task(&watering).unwrap();
        let refreshed = fx.service.tasks().unwrap();
        let watering = refreshed.find(&watering.id).unwrap();
        assert_eq!(watering.due_date, day(17));
        assert!(refreshed.due_now().is_empty());
    }

    #[test]
    fn deleting_a_plant_drops_its_tasks_and_photos() {
        let fx = fixture();
        let fern = fx.service.create_plant(fern()).unwrap();
        let cactus = fx
            .service
            .create_plant(PlantDraft::new("Cactus").with_schedule(CareCategory::Watering, 21))
            .unwrap();
        fx.service
            .add_photo(&fern.id, NewPhoto::new("file:///fern.jpg"))
            .unwrap();

        fx.service.delete_plant(&fern.id).unwrap();
        let tasks = fx.service.tasks().unwrap();
        assert_eq!(tasks.for_plant(&fern.id).count(), 0);
        assert_eq!(tasks.for_plant(&cactus.id).count(), 1);
        assert!(fx.service.photos_for(&fern.id).unwrap().is_empty());
        assert!(matches!(
            fx.service.delete_plant(&fern.id),
            Err(CareError::NotFound { .. })
        ));
    }

    #[test]
    fn failed_write_invalidates_cache_and_keeps_persisted_state() {
        let fx = fixture();
        let plant = fx.service.create_plant(fern()).unwrap();
        assert!(fx.service.cache().is_loaded());

        fx.store.fail_writes(true);
        let result = fx.service.record_care(&plant.id, CareCategory::Watering);
        assert!(matches!(result, Err(CareError::StorageWrite { .. })));
        assert!(!fx.service.cache().is_loaded());

        fx.store.fail_writes(false);
        let reloaded = fx.service.plant(&plant.id).unwrap();
        assert_eq!(
            reloaded.schedule(CareCategory::Watering).unwrap().last_performed,
            None
        );
    }

    #[test]
    fn read_failure_surfaces_without_caching() {
        let fx = fixture();
        fx.service.create_plant(fern()).unwrap();
        fx.store.fail_reads(true);
        assert!(fx.service.reload().is_err());
        assert!(!fx.service.cache().is_loaded());
        fx.store.fail_reads(false);
        assert_eq!(fx.service.plants().unwrap().len(), 1);
    }

    #[test]
    fn record_care_for_unknown_category_is_not_found() {
        let fx = fixture();
        let plant = fx.service.create_plant(fern()).unwrap();
        let err = fx
            .service
            .record_care(&plant.id, CareCategory::Repotting)
            .unwrap_err();
        assert!(matches!(err, CareError::NotFound { kind: "care schedule", .. }));
        assert!(fx.service.record_care("nope", CareCategory::Watering).is_err());
    }

    #[test]
    fn update_replaces_schedules_and_preserves_history_given() {
        let fx = fixture();
        let plant = fx.service.create_plant(fern()).unwrap();
        fx.clock.set(day(2));
        fx.service.record_care(&plant.id, CareCategory::Watering).unwrap();

        let kept = fx
            .service
            .plant(&plant.id)
            .unwrap()
            .schedule(CareCategory::Watering)
            .cloned()
            .unwrap();
        let updated = fx
            .service
            .update_plant(
                &plant.id,
                PlantUpdate {
                    care_schedules: Some(vec![
                        CareSchedule {
                            frequency_days: 4,
                            ..kept
                        },
                        CareSchedule::new(CareCategory::Pruning, 60),
                    ]),
                    ..PlantUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.care_schedules.len(), 2);
        assert_eq!(
            fx.service
                .next_care_date(&plant.id, CareCategory::Watering)
                .unwrap(),
            Some(day(6))
        );
        assert_eq!(
            fx.service
                .next_care_date(&plant.id, CareCategory::Fertilization)
                .unwrap(),
            None
        );
    }

    #[test]
    fn reminders_use_stored_preferences() {
        let fx = fixture();
        fx.service
            .create_plant(PlantDraft::new("Basil").with_schedule(CareCategory::Watering, 2))
            .unwrap();
        fx.clock.set(day(1));

        let report = fx.service.schedule_reminders().unwrap();
        assert_eq!(report.scheduled.len(), 1);

        fx.service
            .save_preferences(&NotificationPreferences {
                enabled: false,
                ..NotificationPreferences::default()
            })
            .unwrap();
        let report = fx.service.schedule_reminders().unwrap();
        assert!(report.disabled);
        assert_eq!(fx.sink.scheduled().len(), 1);

        fx.service.cancel_reminders().unwrap();
        assert!(fx.sink.scheduled().is_empty());
    }

    #[test]
    fn reminders_need_a_sink() {
        let service = CareService::builder().build().unwrap();
        assert!(matches!(
            service.schedule_reminders(),
            Err(CareError::Notification(_))
        ));
    }

    #[test]
    fn capture_photo_handles_cancel() {
        struct Picker(Option<&'static str>);
        impl ImagePicker for Picker {
            fn pick_image(&self) -> Result<Option<String>> {
                Ok(self.0.map(str::to_string))
            }
        }

        let fx = fixture();
        let plant = fx.service.create_plant(fern()).unwrap();
        assert!(fx
            .service
            .capture_photo(&Picker(None), &plant.id, None)
            .unwrap()
            .is_none());
        let photo = fx
            .service
            .capture_photo(&Picker(Some("file:///cam/1.jpg")), &plant.id, Some("first".into()))
            .unwrap()
            .expect("photo stored");
        assert_eq!(
            fx.service.latest_photo(&plant.id).unwrap().map(|p| p.id),
            Some(photo.id)
        );
        assert!(fx.store.raw(PHOTOS_KEY).unwrap().contains("file:///cam/1.jpg"));
    }

    #[test]
    fn legacy_records_without_timestamps_load() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                PLANTS_KEY,
                r#"[{"id":"p1","name":"Fern","careSchedules":[{"category":"watering","frequency":7}]},
                    {"id":"p2","name":"Cactus","createdAt":"2025-04-01T10:00:00Z","updatedAt":"2025-04-01T10:00:00Z",
                     "careSchedules":[{"category":"watering","frequency":21}]}]"#,
            )
            .unwrap();
        let service = CareService::builder()
            .with_store(Box::new(store.clone()))
            .with_clock(Box::new(FixedClock::new(day(0))))
            .build()
            .expect("legacy data loads");

        let plants = service.plants().unwrap();
        assert_eq!(plants.len(), 2);
        assert_eq!(plants[0].created_at, day(0));
        assert_eq!(
            service.next_care_date("p1", CareCategory::Watering).unwrap(),
            Some(day(7))
        );
    }

    #[test]
    fn failed_photo_read_keeps_the_plant() {
        let fx = fixture();
        let plant = fx.service.create_plant(fern()).unwrap();
        fx.service
            .add_photo(&plant.id, NewPhoto::new("file:///fern.jpg"))
            .unwrap();

        fx.store.fail_reads(true);
        assert!(matches!(
            fx.service.delete_plant(&plant.id),
            Err(CareError::StorageRead { .. })
        ));
        fx.store.fail_reads(false);

        assert_eq!(fx.service.reload().unwrap().len(), 1);
        assert_eq!(fx.service.photos_for(&plant.id).unwrap().len(), 1);
        fx.service.delete_plant(&plant.id).unwrap();
        assert!(fx.service.reload().unwrap().is_empty());
    }

    #[test]
    fn photos_can_be_edited_and_removed() {
        let fx = fixture();
        let plant = fx.service.create_plant(fern()).unwrap();
        let photo = fx
            .service
            .add_photo(&plant.id, NewPhoto::new("file:///fern.jpg"))
            .unwrap();

        let updated = fx
            .service
            .update_photo(
                &photo.id,
                PhotoUpdate {
                    notes: Some(Some("new frond".into())),
                    height_cm: Some(Some(41.0)),
                    ..PhotoUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.notes.as_deref(), Some("new frond"));
        assert_eq!(
            fx.service.latest_photo(&plant.id).unwrap(),
            Some(updated.clone())
        );

        assert!(matches!(
            fx.service.update_photo("photo_missing", PhotoUpdate::default()),
            Err(CareError::NotFound { kind: "photo", .. })
        ));
        fx.service.delete_photo(&photo.id).unwrap();
        assert!(fx.service.photos_for(&plant.id).unwrap().is_empty());
        assert!(matches!(
            fx.service.delete_photo(&photo.id),
            Err(CareError::NotFound { kind: "photo", .. })
        ));
    }

    #[test]
    fn clear_keeps_preferences() {
        let fx = fixture();
        let plant = fx.service.create_plant(fern()).unwrap();
        fx.service
            .add_photo(&plant.id, NewPhoto::new("file:///fern.jpg"))
            .unwrap();
        let prefs = NotificationPreferences {
            remind_before_days: 3,
            ..NotificationPreferences::default()
        };
        fx.service.save_preferences(&prefs).unwrap();

        fx.service.clear().unwrap();
        assert!(fx.service.plants().unwrap().is_empty());
        assert!(fx.service.photos_for(&plant.id).unwrap().is_empty());
        assert_eq!(fx.store.raw(PLANTS_KEY), None);
        assert_eq!(fx.service.preferences().unwrap(), prefs);
    }
}
