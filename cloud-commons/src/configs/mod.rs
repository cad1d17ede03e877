mod discovery_config;
mod log_config;
mod registration_config;
mod retry_config;

pub use discovery_config::*;
pub use log_config::*;
pub use registration_config::*;
pub use retry_config::*;
