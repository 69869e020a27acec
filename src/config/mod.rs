pub mod store;
pub mod types;

pub use store::{ConfigError, ConfigStore};
pub use types::Config;
