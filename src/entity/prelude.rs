//! 预导入模块，方便使用

pub use super::notification_reads::{
    ActiveModel as NotificationReadActiveModel, Entity as NotificationReads,
    Model as NotificationReadModel,
};
pub use super::notifications::{
    ActiveModel as NotificationActiveModel, Entity as Notifications, Model as NotificationModel,
};
pub use super::users::{ActiveModel as UserActiveModel, Entity as Users, Model as UserModel};
