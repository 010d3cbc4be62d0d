pub mod config;
pub mod csv_writer;
pub mod extractor;
pub mod models;
pub mod notifiers;
pub mod pipeline;
pub mod scraper;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use models::ProductRecord;
pub use pipeline::{NotificationOutcome, RunOutcome, ScrapePipeline};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
