#![forbid(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod errors;
pub mod extract;
pub mod fetch;
pub mod http;
pub mod models;
pub mod queue;
pub mod slack;
pub mod state;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
