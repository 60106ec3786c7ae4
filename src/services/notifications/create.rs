use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::{error, info};

use super::NotificationService;
use crate::middlewares::RequireJWT;
use crate::models::notifications::requests::CreateNotificationRequest;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::dispatch::DispatchQueue;

pub async fn create_notification(
    service: &NotificationService,
    request: &HttpRequest,
    notification_data: CreateNotificationRequest,
) -> ActixResult<HttpResponse> {
    let uid = match RequireJWT::extract_user_id(request) {
        Some(id) => id,
        None => {
            return Ok(HttpResponse::Unauthorized().json(ApiResponse::error_empty(
                ErrorCode::Unauthorized,
                "Unauthorized: missing user id",
            )));
        }
    };
    let storage = service.get_storage(request);

    // 一次性返回全部校验错误
    if let Err(violations) = notification_data.validate() {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::ValidationFailed,
            violations.error_message(),
        )));
    }

    match storage.create_notification(notification_data, uid).await {
        Ok(notification) => {
            info!(
                "Notification {} created by user {}",
                notification.id, uid
            );

            // 新通知会改变一批用户的未读数，未读数键按用户分散无法枚举，
            // 直接清空对象缓存，被顺带清掉的用户缓存会在下次请求回填
            service.get_cache(request).invalidate_all().await;

            // 即发即忘：入队失败只记日志，创建本身已经成功
            if let Err(e) = DispatchQueue::enqueue(notification.id) {
                error!(
                    "Failed to enqueue email dispatch for notification {}: {}",
                    notification.id, e
                );
            }

            Ok(HttpResponse::Created().json(ApiResponse::success(
                notification,
                "Notification created successfully",
            )))
        }
        Err(e) => {
            error!("Failed to create notification: {}", e);
            Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::NotificationCreationFailed,
                    "Failed to create notification",
                )),
            )
        }
    }
}
