//! 已读记录存储操作
//!
//! 幂等性由数据库唯一索引 (notification_id, user_id) 加 ON CONFLICT
//! DO NOTHING 保证，并发重复标记不会产生重复行，也不会覆盖首次的
//! read_at。

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set};

use super::SeaOrmStorage;
use crate::entity::notification_reads::{ActiveModel, Column, Entity as NotificationReads};
use crate::errors::{CollegeHubError, Result};

impl SeaOrmStorage {
    /// 标记单条通知已读，返回是否为新插入
    pub async fn mark_notification_read_impl(
        &self,
        notification_id: i64,
        user_id: i64,
    ) -> Result<bool> {
        let model = ActiveModel {
            notification_id: Set(notification_id),
            user_id: Set(user_id),
            read_at: Set(chrono::Utc::now().timestamp()),
            ..Default::default()
        };

        let result = NotificationReads::insert(model)
            .on_conflict_do_nothing_on([Column::NotificationId, Column::UserId])
            .exec(&self.db)
            .await
            .map_err(|e| CollegeHubError::database_operation(format!("标记已读失败: {e}")))?;

        Ok(!matches!(
            result,
            sea_orm::TryInsertResult::Conflicted | sea_orm::TryInsertResult::Empty
        ))
    }

    /// 查询给定通知集合中该用户已读的子集
    pub async fn find_read_notification_ids_impl(
        &self,
        user_id: i64,
        notification_ids: &[i64],
    ) -> Result<Vec<i64>> {
        if notification_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = NotificationReads::find()
            .select_only()
            .column(Column::NotificationId)
            .filter(Column::UserId.eq(user_id))
            .filter(Column::NotificationId.is_in(notification_ids.to_vec()))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| CollegeHubError::database_operation(format!("查询已读记录失败: {e}")))?;

        Ok(ids)
    }

    /// 批量标记已读，返回新插入条数
    pub async fn mark_notifications_read_bulk_impl(
        &self,
        user_id: i64,
        notification_ids: &[i64],
    ) -> Result<i64> {
        if notification_ids.is_empty() {
            return Ok(0);
        }

        // 先排除已有记录，逐条按冲突忽略插入，统计真正新增的条数
        let already_read = self
            .find_read_notification_ids_impl(user_id, notification_ids)
            .await?;

        let now = chrono::Utc::now().timestamp();
        let models: Vec<ActiveModel> = notification_ids
            .iter()
            .filter(|id| !already_read.contains(id))
            .map(|&notification_id| ActiveModel {
                notification_id: Set(notification_id),
                user_id: Set(user_id),
                read_at: Set(now),
                ..Default::default()
            })
            .collect();

        if models.is_empty() {
            return Ok(0);
        }

        let inserted = models.len() as i64;
        NotificationReads::insert_many(models)
            .on_conflict_do_nothing_on([Column::NotificationId, Column::UserId])
            .exec(&self.db)
            .await
            .map_err(|e| CollegeHubError::database_operation(format!("批量标记已读失败: {e}")))?;

        Ok(inserted)
    }
}
