//! 通知存储操作

use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use super::SeaOrmStorage;
use crate::entity::notifications::{ActiveModel, Column, Entity as Notifications};
use crate::errors::{CollegeHubError, Result};
use crate::models::notifications::{
    entities::{Notification, NotificationPriority, NotificationType},
    requests::{CreateNotificationRequest, NotificationListQuery, UpdateNotificationRequest},
    responses::{BucketCount, NotificationStatsResponse},
};

impl SeaOrmStorage {
    /// 创建通知
    pub async fn create_notification_impl(
        &self,
        req: CreateNotificationRequest,
        created_by: i64,
    ) -> Result<Notification> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            title: Set(req.title),
            message: Set(req.message),
            notification_type: Set(req.notification_type.to_string()),
            priority: Set(req.priority.to_string()),
            target_audience: Set(serde_json::to_string(&req.target_audience)?),
            target_departments: Set(serde_json::to_string(&req.target_departments)?),
            target_semesters: Set(serde_json::to_string(&req.target_semesters)?),
            created_by: Set(created_by),
            is_active: Set(true),
            expires_at: Set(req.expires_at.map(|t| t.timestamp())),
            attachments: Set(if req.attachments.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&req.attachments)?)
            }),
            view_count: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| CollegeHubError::database_operation(format!("创建通知失败: {e}")))?;

        result.into_notification()
    }

    /// 通过 ID 获取通知
    pub async fn get_notification_by_id_impl(&self, id: i64) -> Result<Option<Notification>> {
        let result = Notifications::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CollegeHubError::database_operation(format!("查询通知失败: {e}")))?;

        result.map(|m| m.into_notification()).transpose()
    }

    /// 列出候选通知：活跃且未过期，可选类型/优先级过滤
    ///
    /// 定向可见性（受众/院系/学期）由调用方用 Notification::is_visible_to
    /// 逐条判定，保证列表、详情与测试共用同一份谓词实现。
    pub async fn list_candidate_notifications_impl(
        &self,
        query: NotificationListQuery,
    ) -> Result<Vec<Notification>> {
        let now = chrono::Utc::now().timestamp();

        let mut select = Notifications::find()
            .filter(Column::IsActive.eq(true))
            .filter(
                Condition::any()
                    .add(Column::ExpiresAt.is_null())
                    .add(Column::ExpiresAt.gt(now)),
            );

        if let Some(notification_type) = &query.notification_type {
            select = select.filter(Column::NotificationType.eq(notification_type.to_string()));
        }
        if let Some(priority) = &query.priority {
            select = select.filter(Column::Priority.eq(priority.to_string()));
        }

        let models = select
            .order_by_desc(Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| CollegeHubError::database_operation(format!("查询通知列表失败: {e}")))?;

        models.into_iter().map(|m| m.into_notification()).collect()
    }

    /// 更新通知（缺省字段保持不变，新附件追加）
    pub async fn update_notification_impl(
        &self,
        id: i64,
        update: UpdateNotificationRequest,
    ) -> Result<Option<Notification>> {
        let existing = Notifications::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CollegeHubError::database_operation(format!("查询通知失败: {e}")))?;

        let Some(existing) = existing else {
            return Ok(None);
        };

        // 附件只追加不替换
        let merged_attachments = if let Some(new_attachments) = &update.new_attachments {
            let mut attachments = existing.clone().into_notification()?.attachments;
            attachments.extend(new_attachments.iter().cloned());
            Some(Some(serde_json::to_string(&attachments)?))
        } else {
            None
        };

        let mut model: ActiveModel = existing.into();

        if let Some(title) = update.title {
            model.title = Set(title);
        }
        if let Some(message) = update.message {
            model.message = Set(message);
        }
        if let Some(notification_type) = update.notification_type {
            model.notification_type = Set(notification_type.to_string());
        }
        if let Some(priority) = update.priority {
            model.priority = Set(priority.to_string());
        }
        if let Some(audience) = update.target_audience {
            model.target_audience = Set(serde_json::to_string(&audience)?);
        }
        if let Some(departments) = update.target_departments {
            model.target_departments = Set(serde_json::to_string(&departments)?);
        }
        if let Some(semesters) = update.target_semesters {
            model.target_semesters = Set(serde_json::to_string(&semesters)?);
        }
        if let Some(is_active) = update.is_active {
            model.is_active = Set(is_active);
        }
        if update.clear_expires_at {
            model.expires_at = Set(None);
        } else if let Some(expires_at) = update.expires_at {
            model.expires_at = Set(Some(expires_at.timestamp()));
        }
        if let Some(attachments) = merged_attachments {
            model.attachments = Set(attachments);
        }
        model.updated_at = Set(chrono::Utc::now().timestamp());

        let result = model
            .update(&self.db)
            .await
            .map_err(|e| CollegeHubError::database_operation(format!("更新通知失败: {e}")))?;

        result.into_notification().map(Some)
    }

    /// 删除通知（硬删除，已读记录随外键级联删除）
    pub async fn delete_notification_impl(&self, id: i64) -> Result<bool> {
        let result = Notifications::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| CollegeHubError::database_operation(format!("删除通知失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    /// 批量自增浏览计数
    ///
    /// view_count = view_count + 1 由数据库端原子完成，并发列表请求
    /// 不会互相丢失增量。按设计不做用户级去重：同一用户重复拉取列表
    /// 会重复计数（统计的是曝光量而非独立观看人数）。
    pub async fn increment_view_counts_impl(&self, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = Notifications::update_many()
            .col_expr(Column::ViewCount, Expr::col(Column::ViewCount).add(1))
            .filter(Column::Id.is_in(ids.to_vec()))
            .exec(&self.db)
            .await
            .map_err(|e| CollegeHubError::database_operation(format!("更新浏览计数失败: {e}")))?;

        Ok(result.rows_affected)
    }

    /// 通知统计概览
    pub async fn notification_stats_impl(&self) -> Result<NotificationStatsResponse> {
        let now = chrono::Utc::now().timestamp();
        let thirty_days_ago = now - 30 * 24 * 60 * 60;

        let total = self.count_notifications(Condition::all()).await?;
        let active = self
            .count_notifications(Condition::all().add(Column::IsActive.eq(true)))
            .await?;
        let expired = self
            .count_notifications(Condition::all().add(Column::ExpiresAt.lte(now)))
            .await?;
        let recent_30_days = self
            .count_notifications(Condition::all().add(Column::CreatedAt.gte(thirty_days_ago)))
            .await?;

        let mut by_type = Vec::new();
        for notification_type in NotificationType::ALL {
            let count = self
                .count_notifications(
                    Condition::all()
                        .add(Column::NotificationType.eq(notification_type.to_string())),
                )
                .await?;
            by_type.push(BucketCount {
                key: notification_type.to_string(),
                count,
            });
        }
        by_type.sort_by(|a, b| b.count.cmp(&a.count));

        let mut by_priority = Vec::new();
        for priority in NotificationPriority::ALL {
            let count = self
                .count_notifications(
                    Condition::all().add(Column::Priority.eq(priority.to_string())),
                )
                .await?;
            by_priority.push(BucketCount {
                key: priority.to_string(),
                count,
            });
        }
        by_priority.sort_by(|a, b| b.count.cmp(&a.count));

        Ok(NotificationStatsResponse {
            total,
            active,
            expired,
            recent_30_days,
            by_type,
            by_priority,
        })
    }

    async fn count_notifications(&self, condition: Condition) -> Result<i64> {
        let count = Notifications::find()
            .filter(condition)
            .count(&self.db)
            .await
            .map_err(|e| CollegeHubError::database_operation(format!("统计通知失败: {e}")))?;

        Ok(count as i64)
    }
}
