pub mod api;
pub mod config;
pub mod database;
pub mod duration;
pub mod error;
pub mod export;
pub mod influx;
pub mod logging;
pub mod mapper;
pub mod metrics;
pub mod models;
pub mod template;
pub mod window;

pub use error::{DwhExportError, Result};
