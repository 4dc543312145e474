pub mod config;
pub mod follow;
pub mod logging;
pub mod render;
pub mod repl;

pub use config::{AppConfig, EndpointConfig};
