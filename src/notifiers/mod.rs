// Notifier implementations
pub mod traits;
pub mod discord;

pub use traits::{NotificationResult, Notifier};
pub use discord::DiscordNotifier;
