pub mod dispatch;
pub mod notifications;

pub use notifications::NotificationService;
