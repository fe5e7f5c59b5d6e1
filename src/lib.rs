pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod tasks;

pub use error::{PortalError, Result};
