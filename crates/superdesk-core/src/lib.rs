pub mod config;
pub mod error;
pub mod event;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use error::{Result, SuperdeskError};
pub use event::{EventChannel, Subscription};
pub use types::*;
