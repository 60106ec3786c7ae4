use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::{error, info};

use super::NotificationService;
use crate::middlewares::RequireJWT;
use crate::models::notifications::entities::Notification;
use crate::models::notifications::requests::UpdateNotificationRequest;
use crate::models::users::entities::UserRole;
use crate::models::{ApiResponse, ErrorCode};

pub async fn update_notification(
    service: &NotificationService,
    request: &HttpRequest,
    notification_id: i64,
    update_data: UpdateNotificationRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    if let Err(violations) = update_data.validate() {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::ValidationFailed,
            violations.error_message(),
        )));
    }

    let existing = match storage.get_notification_by_id(notification_id).await {
        Ok(Some(notification)) => notification,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::NotificationNotFound,
                "Notification not found",
            )));
        }
        Err(e) => {
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    format!("查询通知失败: {e}"),
                )),
            );
        }
    };

    if let Err(resp) = check_modify_permission(request, &existing) {
        return Ok(resp);
    }

    match storage.update_notification(notification_id, update_data).await {
        Ok(Some(notification)) => {
            info!("Notification {} updated", notification.id);
            Ok(HttpResponse::Ok().json(ApiResponse::success(
                notification,
                "Notification updated successfully",
            )))
        }
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::NotificationNotFound,
            "Notification not found",
        ))),
        Err(e) => {
            error!("Failed to update notification {}: {}", notification_id, e);
            Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    "Failed to update notification",
                )),
            )
        }
    }
}

// 创建者或管理员可修改，其余角色一律 403
pub(crate) fn check_modify_permission(
    request: &HttpRequest,
    notification: &Notification,
) -> Result<(), HttpResponse> {
    let uid = RequireJWT::extract_user_id(request);
    let role = RequireJWT::extract_user_role(request);

    match (uid, role) {
        (Some(_), Some(UserRole::Admin)) => Ok(()),
        (Some(uid), Some(_)) if uid == notification.created_by => Ok(()),
        (Some(_), Some(_)) => Err(HttpResponse::Forbidden().json(ApiResponse::error_empty(
            ErrorCode::NotificationPermissionDenied,
            "Only the creator or an admin can modify this notification",
        ))),
        _ => Err(HttpResponse::Unauthorized().json(ApiResponse::error_empty(
            ErrorCode::Unauthorized,
            "Unauthorized: missing user context",
        ))),
    }
}
