// Public API - what other modules can use
pub use email::{EmailSender, LoggingEmailSender, NotifyError};
pub use subscriber::NotificationSubscriber;

pub mod email;
pub mod subscriber;
