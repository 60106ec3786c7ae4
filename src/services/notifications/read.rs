use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::debug;

use super::NotificationService;
use super::list::visible_notifications;
use crate::models::notifications::requests::NotificationListQuery;
use crate::models::notifications::responses::MarkAllReadResponse;
use crate::models::{ApiResponse, ErrorCode};

pub async fn mark_as_read(
    service: &NotificationService,
    request: &HttpRequest,
    notification_id: i64,
) -> ActixResult<HttpResponse> {
    let viewer = match super::extract_viewer(request) {
        Ok(viewer) => viewer,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    // 只校验存在性，过期或已下线的通知仍允许补标已读
    match storage.get_notification_by_id(notification_id).await {
        Ok(Some(_)) => {}
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
    }

    // 幂等：重复标记直接视为成功，首次的 read_at 不被覆盖
    match storage
        .mark_notification_read(notification_id, viewer.id)
        .await
    {
        Ok(newly_marked) => {
            if newly_marked {
                invalidate_unread_count(service, request, viewer.id).await;
            } else {
                debug!(
                    "Notification {} already read by user {}",
                    notification_id, viewer.id
                );
            }
            Ok(HttpResponse::Ok()
                .json(ApiResponse::<()>::success_empty("Notification marked as read")))
        }
        Err(e) => Ok(
            HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                ErrorCode::InternalServerError,
                format!("标记已读失败: {e}"),
            )),
        ),
    }
}

pub async fn mark_all_as_read(
    service: &NotificationService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let viewer = match super::extract_viewer(request) {
        Ok(viewer) => viewer,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    let visible = match visible_notifications(&storage, &viewer, NotificationListQuery::default())
        .await
    {
        Ok(visible) => visible,
        Err(e) => {
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    format!("查询通知列表失败: {e}"),
                )),
            );
        }
    };

    let ids: Vec<i64> = visible.iter().map(|n| n.id).collect();
    match storage.mark_notifications_read_bulk(viewer.id, &ids).await {
        Ok(marked_count) => {
            if marked_count > 0 {
                invalidate_unread_count(service, request, viewer.id).await;
            }
            Ok(HttpResponse::Ok().json(ApiResponse::success(
                MarkAllReadResponse { marked_count },
                "All notifications marked as read",
            )))
        }
        Err(e) => Ok(
            HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                ErrorCode::InternalServerError,
                format!("批量标记已读失败: {e}"),
            )),
        ),
    }
}

async fn invalidate_unread_count(
    service: &NotificationService,
    request: &HttpRequest,
    user_id: i64,
) {
    let cache = service.get_cache(request);
    cache.remove(&format!("unread_count:{user_id}")).await;
}
