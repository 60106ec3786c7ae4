use serde::Deserialize;
use ts_rs::TS;

use super::entities::{Attachment, Audience, NotificationPriority, NotificationType};
use crate::models::common::PaginationQuery;
use crate::utils::validate::{
    validate_department_name, validate_message, validate_semester, validate_title,
};

// 通知查询参数（来自HTTP请求）
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notification.ts")]
pub struct NotificationQueryParams {
    #[serde(flatten)]
    #[ts(flatten)]
    pub pagination: PaginationQuery,
    pub notification_type: Option<NotificationType>,
    pub priority: Option<NotificationPriority>,
    #[serde(default)]
    pub unread_only: bool,
}

// 创建通知请求
//
// 定向字段在创建时固定，之后创建者或管理员可以修改。
// attachments 元数据由外部文件存储服务上传后产出，这里原样接收。
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notification.ts")]
pub struct CreateNotificationRequest {
    pub title: String,
    pub message: String,
    #[serde(default = "default_type")]
    pub notification_type: NotificationType,
    #[serde(default = "default_priority")]
    pub priority: NotificationPriority,
    pub target_audience: Vec<Audience>,
    #[serde(default)]
    pub target_departments: Vec<String>,
    #[serde(default)]
    pub target_semesters: Vec<i32>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

fn default_type() -> NotificationType {
    NotificationType::General
}

fn default_priority() -> NotificationPriority {
    NotificationPriority::Medium
}

/// 请求校验结果，收集全部违规字段后一次性返回
#[derive(Debug, Clone)]
pub struct ValidationErrors {
    pub errors: Vec<String>,
}

impl ValidationErrors {
    pub fn error_message(&self) -> String {
        self.errors.join("; ")
    }
}

impl CreateNotificationRequest {
    /// 校验所有字段，返回每一条违规信息，而不是遇错即停
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();

        if let Err(e) = validate_title(&self.title) {
            errors.push(e.to_string());
        }
        if let Err(e) = validate_message(&self.message) {
            errors.push(e.to_string());
        }
        if self.target_audience.is_empty() {
            errors.push("Target audience must contain at least one entry".to_string());
        }
        for department in &self.target_departments {
            if let Err(e) = validate_department_name(department) {
                errors.push(format!("Department '{department}': {e}"));
            }
        }
        for semester in &self.target_semesters {
            if let Err(e) = validate_semester(*semester) {
                errors.push(e.to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors { errors })
        }
    }
}

// 更新通知请求（创建者或管理员）
//
// 所有字段可选，缺省字段保持不变。新附件追加到既有附件之后。
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/notification.ts")]
pub struct UpdateNotificationRequest {
    pub title: Option<String>,
    pub message: Option<String>,
    pub notification_type: Option<NotificationType>,
    pub priority: Option<NotificationPriority>,
    pub target_audience: Option<Vec<Audience>>,
    pub target_departments: Option<Vec<String>>,
    pub target_semesters: Option<Vec<i32>>,
    pub is_active: Option<bool>,
    // Some(None) 无法用 Option 表达，置空过期时间走 clear_expires_at
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub clear_expires_at: bool,
    pub new_attachments: Option<Vec<Attachment>>,
}

impl UpdateNotificationRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();

        if let Some(title) = &self.title
            && let Err(e) = validate_title(title)
        {
            errors.push(e.to_string());
        }
        if let Some(message) = &self.message
            && let Err(e) = validate_message(message)
        {
            errors.push(e.to_string());
        }
        if let Some(audience) = &self.target_audience
            && audience.is_empty()
        {
            errors.push("Target audience must contain at least one entry".to_string());
        }
        if let Some(departments) = &self.target_departments {
            for department in departments {
                if let Err(e) = validate_department_name(department) {
                    errors.push(format!("Department '{department}': {e}"));
                }
            }
        }
        if let Some(semesters) = &self.target_semesters {
            for semester in semesters {
                if let Err(e) = validate_semester(*semester) {
                    errors.push(e.to_string());
                }
            }
        }
        if self.expires_at.is_some() && self.clear_expires_at {
            errors.push("expires_at and clear_expires_at are mutually exclusive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors { errors })
        }
    }
}

// 通知列表查询参数（用于存储层）
#[derive(Debug, Clone, Default)]
pub struct NotificationListQuery {
    pub notification_type: Option<NotificationType>,
    pub priority: Option<NotificationPriority>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notifications::entities::Audience;

    fn valid_request() -> CreateNotificationRequest {
        CreateNotificationRequest {
            title: "Library closed on Friday".to_string(),
            message: "The central library will remain closed this Friday for maintenance."
                .to_string(),
            notification_type: NotificationType::General,
            priority: NotificationPriority::Medium,
            target_audience: vec![Audience::All],
            target_departments: vec![],
            target_semesters: vec![],
            expires_at: None,
            attachments: vec![],
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn empty_audience_rejected() {
        let mut req = valid_request();
        req.target_audience = vec![];
        let errors = req.validate().unwrap_err();
        assert!(errors.error_message().contains("Target audience"));
    }

    #[test]
    fn semester_out_of_range_rejected() {
        let mut req = valid_request();
        req.target_semesters = vec![0, 3, 9];
        let errors = req.validate().unwrap_err();
        // 0 和 9 各报一条，3 合法
        assert_eq!(
            errors
                .errors
                .iter()
                .filter(|e| e.contains("Semester"))
                .count(),
            2
        );
    }

    #[test]
    fn all_violations_reported_together() {
        let req = CreateNotificationRequest {
            title: "Hi".to_string(),                        // 过短
            message: "Short".to_string(),                   // 过短
            notification_type: NotificationType::General,
            priority: NotificationPriority::Low,
            target_audience: vec![],                        // 为空
            target_departments: vec![],
            target_semesters: vec![42],                     // 越界
            expires_at: None,
            attachments: vec![],
        };
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.errors.len(), 4);
    }

    #[test]
    fn update_expiry_conflict_rejected() {
        let req = UpdateNotificationRequest {
            title: None,
            message: None,
            notification_type: None,
            priority: None,
            target_audience: None,
            target_departments: None,
            target_semesters: None,
            is_active: None,
            expires_at: Some(chrono::Utc::now()),
            clear_expires_at: true,
            new_attachments: None,
        };
        assert!(req.validate().is_err());
    }
}
