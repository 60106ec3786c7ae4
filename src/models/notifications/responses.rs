use serde::Serialize;
use ts_rs::TS;

use super::entities::Notification;
use crate::models::common::pagination::PaginationInfo;

/// 带已读状态的通知
///
/// is_read 每次请求重新计算，不缓存在实体上。
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notification.ts")]
pub struct NotificationWithReadStatus {
    #[serde(flatten)]
    #[ts(flatten)]
    pub notification: Notification,
    pub is_read: bool,
}

/// 通知列表响应
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notification.ts")]
pub struct NotificationListResponse {
    pub items: Vec<NotificationWithReadStatus>,
    pub pagination: PaginationInfo,
}

/// 通知详情响应
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notification.ts")]
pub struct NotificationDetailResponse {
    pub notification: NotificationWithReadStatus,
}

/// 未读通知数量响应
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notification.ts")]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

/// 标记全部已读响应
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notification.ts")]
pub struct MarkAllReadResponse {
    pub marked_count: i64,
}

/// 某一类型/优先级的数量
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notification.ts")]
pub struct BucketCount {
    pub key: String,
    pub count: i64,
}

/// 通知统计概览（仅管理员）
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notification.ts")]
pub struct NotificationStatsResponse {
    pub total: i64,
    pub active: i64,
    pub expired: i64,
    pub recent_30_days: i64,
    pub by_type: Vec<BucketCount>,
    pub by_priority: Vec<BucketCount>,
}
