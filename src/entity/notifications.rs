//! 通知实体
//!
//! 定向字段（受众/院系/学期）和附件以 JSON 文本列存储，
//! 转换为业务模型时解析。解析失败视为数据损坏，向上传播错误。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    pub message: String,
    pub notification_type: String,
    pub priority: String,
    pub target_audience: String,
    pub target_departments: String,
    pub target_semesters: String,
    pub created_by: i64,
    pub is_active: bool,
    pub expires_at: Option<i64>,
    pub attachments: Option<String>,
    pub view_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CreatedBy",
        to = "super::users::Column::Id"
    )]
    Creator,
    #[sea_orm(has_many = "super::notification_reads::Entity")]
    NotificationReads,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Creator.def()
    }
}

impl Related<super::notification_reads::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NotificationReads.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn into_notification(
        self,
    ) -> crate::errors::Result<crate::models::notifications::entities::Notification> {
        use crate::errors::CollegeHubError;
        use crate::models::notifications::entities::{
            Attachment, Audience, Notification, NotificationPriority, NotificationType,
        };
        use chrono::{DateTime, Utc};

        // 定向字段损坏时直接报错，不回退到默认值
        let target_audience: Vec<Audience> =
            serde_json::from_str(&self.target_audience).map_err(|e| {
                CollegeHubError::serialization(format!(
                    "Corrupt target_audience on notification {}: {e}",
                    self.id
                ))
            })?;
        let target_departments: Vec<String> = serde_json::from_str(&self.target_departments)
            .map_err(|e| {
                CollegeHubError::serialization(format!(
                    "Corrupt target_departments on notification {}: {e}",
                    self.id
                ))
            })?;
        let target_semesters: Vec<i32> =
            serde_json::from_str(&self.target_semesters).map_err(|e| {
                CollegeHubError::serialization(format!(
                    "Corrupt target_semesters on notification {}: {e}",
                    self.id
                ))
            })?;
        let attachments: Vec<Attachment> = match &self.attachments {
            Some(raw) => serde_json::from_str(raw).map_err(|e| {
                CollegeHubError::serialization(format!(
                    "Corrupt attachments on notification {}: {e}",
                    self.id
                ))
            })?,
            None => Vec::new(),
        };

        Ok(Notification {
            id: self.id,
            title: self.title,
            message: self.message,
            notification_type: self
                .notification_type
                .parse::<NotificationType>()
                .map_err(CollegeHubError::serialization)?,
            priority: self
                .priority
                .parse::<NotificationPriority>()
                .map_err(CollegeHubError::serialization)?,
            target_audience,
            target_departments,
            target_semesters,
            created_by: self.created_by,
            is_active: self.is_active,
            expires_at: self
                .expires_at
                .map(|ts| DateTime::<Utc>::from_timestamp(ts, 0).unwrap_or_default()),
            attachments,
            view_count: self.view_count,
            created_at: DateTime::<Utc>::from_timestamp(self.created_at, 0).unwrap_or_default(),
            updated_at: DateTime::<Utc>::from_timestamp(self.updated_at, 0).unwrap_or_default(),
        })
    }
}
