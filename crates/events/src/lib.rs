//! Outbound alert notifications.
//!
//! Accepted alerts are fanned out to every configured
//! [`NotificationChannel`] by the [`AlertNotifier`]. Each channel runs
//! independently; one failing channel never affects another, and nothing
//! here can undo or repeat the persistence of the alert itself.

pub mod delivery;
pub mod message;
pub mod notifier;

pub use delivery::email::{EmailConfig, EmailDelivery, EmailError};
pub use delivery::webhook::{ChatWebhookConfig, WebhookDelivery, WebhookError};
pub use notifier::{AlertNotifier, NotificationChannel, NotificationError};
