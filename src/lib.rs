pub mod config;
pub mod models;
pub mod error;
pub mod clock;
pub mod api;
pub mod database;
pub mod collections;
pub mod word_of_day;
pub mod tts;
pub mod pronunciation;
pub mod export;
pub mod app;

pub use app::LexiCruxx;
pub use config::Config;
pub use error::LookupError;
pub use models::*;
