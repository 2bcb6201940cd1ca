// Service modules
pub mod billing;
pub mod subscriber_service;
pub mod validation_service;

pub use billing::{BillingClient, GooglePlayClient};
pub use subscriber_service::SubscriberService;
pub use validation_service::SubscriptionValidator;
