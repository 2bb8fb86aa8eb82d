pub mod cache;
pub mod care;
pub mod clock;
pub mod error;
pub mod model;
pub mod notifications;
pub mod photos;
pub mod service;
pub mod storage;
pub mod store;
pub mod tasks;

pub use crate::error::{CareError, Result};
pub use crate::model::{
    CareCategory, CareSchedule, PhotoUpdate, Plant, PlantDraft, PlantLocation, PlantPhoto,
    PlantUpdate,
};
pub use crate::service::{CareService, CareServiceBuilder};
pub use crate::tasks::{CareTask, TaskList};
