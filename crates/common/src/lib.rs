pub mod config;
pub mod error;
pub mod logger;
pub mod record;

// Re-export commonly used types
pub use config::{AppConfig, IndexPaths, RelevanceWeights};
pub use error::PaperSeekError;
pub use record::Record;
pub type Result<T> = std::result::Result<T, PaperSeekError>;
