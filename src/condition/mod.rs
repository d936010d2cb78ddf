pub mod config;
pub mod processor;

pub use config::{ConditionConfig, ConfigError, TriggerFeature};
pub use processor::ConditionProcessor;
