pub mod download_entity;
pub mod model_entity;

pub use download_entity::{ActiveDownload, DownloadEntity, DownloadSnapshot, DownloadStats, SpeedPolicy};
pub use model_entity::{ModelEntity, Reaction};
