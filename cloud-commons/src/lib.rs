pub mod config;
pub mod configs;
pub mod error;
pub mod loadbalancer;
pub mod logging;
pub mod service;
pub mod service_discovery;
pub mod service_register_center;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
