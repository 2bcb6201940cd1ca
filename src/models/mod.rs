// Request/Response models
pub mod common;
pub mod subscriber;
pub mod subscriber_ext; // Conversions for entity::subscribers
pub mod transaction;
