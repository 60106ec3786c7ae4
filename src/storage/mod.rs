use std::sync::Arc;

use crate::models::{
    notifications::{
        entities::Notification,
        requests::{CreateNotificationRequest, NotificationListQuery, UpdateNotificationRequest},
        responses::NotificationStatsResponse,
    },
    users::entities::User,
};

use crate::errors::Result;

pub mod sea_orm_storage;

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 用户查询方法（只读，账号生命周期由外部用户管理服务负责）
    // 通过ID获取用户信息
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;
    // 按通知定向谓词批量解析收件人（仅已验证邮箱的活跃用户）
    async fn find_notification_recipients(&self, notification: &Notification)
    -> Result<Vec<User>>;

    /// 通知管理方法
    // 创建通知
    async fn create_notification(
        &self,
        req: CreateNotificationRequest,
        created_by: i64,
    ) -> Result<Notification>;
    // 通过ID获取通知
    async fn get_notification_by_id(&self, id: i64) -> Result<Option<Notification>>;
    // 列出候选通知（活跃且未过期，可按类型/优先级过滤；可见性由调用方匹配）
    async fn list_candidate_notifications(
        &self,
        query: NotificationListQuery,
    ) -> Result<Vec<Notification>>;
    // 更新通知
    async fn update_notification(
        &self,
        id: i64,
        update: UpdateNotificationRequest,
    ) -> Result<Option<Notification>>;
    // 删除通知（硬删除）
    async fn delete_notification(&self, id: i64) -> Result<bool>;
    // 浏览计数批量原子自增（列表渲染副作用，不按用户去重）
    async fn increment_view_counts(&self, ids: &[i64]) -> Result<u64>;
    // 通知统计概览
    async fn notification_stats(&self) -> Result<NotificationStatsResponse>;

    /// 已读跟踪方法
    // 标记已读：按 (notification_id, user_id) 条件插入，幂等；
    // 返回是否新插入（重复标记返回 false，read_at 不被覆盖）
    async fn mark_notification_read(&self, notification_id: i64, user_id: i64) -> Result<bool>;
    // 查询给定通知集合中该用户已读的子集
    async fn find_read_notification_ids(
        &self,
        user_id: i64,
        notification_ids: &[i64],
    ) -> Result<Vec<i64>>;
    // 批量标记已读（用于"全部已读"），返回新插入条数
    async fn mark_notifications_read_bulk(
        &self,
        user_id: i64,
        notification_ids: &[i64],
    ) -> Result<i64>;
}

pub async fn create_storage() -> Result<Arc<dyn Storage>> {
    let storage = sea_orm_storage::SeaOrmStorage::new_async().await?;
    Ok(Arc::new(storage))
}
