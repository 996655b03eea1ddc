pub mod config;
pub mod error;
pub mod types;

pub use config::ChatscanConfig;
pub use error::{ChatscanError, Result};
pub use types::*;
