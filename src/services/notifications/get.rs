use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::NotificationService;
use crate::models::notifications::responses::{
    NotificationDetailResponse, NotificationWithReadStatus,
};
use crate::models::{ApiResponse, ErrorCode};

pub async fn get_notification(
    service: &NotificationService,
    request: &HttpRequest,
    notification_id: i64,
) -> ActixResult<HttpResponse> {
    let viewer = match super::extract_viewer(request) {
        Ok(viewer) => viewer,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    let notification = match storage.get_notification_by_id(notification_id).await {
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

    // 详情与列表共用同一份可见性判定，定向之外的用户一律 403
    if !notification.is_visible_to(&viewer) {
        return Ok(HttpResponse::Forbidden().json(ApiResponse::error_empty(
            ErrorCode::NotificationPermissionDenied,
            "You do not have access to this notification",
        )));
    }

    let is_read = match storage
        .find_read_notification_ids(viewer.id, &[notification.id])
        .await
    {
        Ok(ids) => !ids.is_empty(),
        Err(e) => {
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    format!("查询已读状态失败: {e}"),
                )),
            );
        }
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        NotificationDetailResponse {
            notification: NotificationWithReadStatus {
                notification,
                is_read,
            },
        },
        "查询成功",
    )))
}
