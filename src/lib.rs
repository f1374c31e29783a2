pub mod audit;
pub mod clock;
pub mod config;
pub mod duration;
pub mod engine;
pub mod error;
pub mod format;
pub mod fx;
pub mod lifecycle;
pub mod models;
pub mod storage;
pub mod valuation;

pub use config::Settings;
pub use engine::Engine;
pub use error::{Error, ErrorKind, Result};
