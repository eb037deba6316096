//! Type definitions for snapvault

mod configuration;
mod runtime_config;
mod schema;

pub use configuration::*;
pub use runtime_config::*;
pub use schema::*;
