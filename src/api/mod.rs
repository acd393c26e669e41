//! HTTP handlers for the webhook listener

pub mod status;
pub mod webhook;

// Re-export handlers
pub use status::{root, status};
pub use webhook::{handle_webhook, webhook_status};
