use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::debug;

use super::NotificationService;
use super::list::visible_notifications;
use crate::cache::CacheResult;
use crate::config::AppConfig;
use crate::models::notifications::requests::NotificationListQuery;
use crate::models::notifications::responses::UnreadCountResponse;
use crate::models::{ApiResponse, ErrorCode};

pub async fn get_unread_count(
    service: &NotificationService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let viewer = match super::extract_viewer(request) {
        Ok(viewer) => viewer,
        Err(resp) => return Ok(resp),
    };
    let cache = service.get_cache(request);

    // 标记已读和新建通知都会主动失效缓存，TTL 只兜底异常路径
    let cache_key = format!("unread_count:{}", viewer.id);
    if let CacheResult::Found(cached) = cache.get_raw(&cache_key).await {
        if let Ok(count) = cached.parse::<i64>() {
            debug!("Unread count cache hit for user {}", viewer.id);
            return Ok(HttpResponse::Ok().json(ApiResponse::success(
                UnreadCountResponse {
                    unread_count: count,
                },
                "查询成功",
            )));
        }
        cache.remove(&cache_key).await;
    }

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

    let visible_ids: Vec<i64> = visible.iter().map(|n| n.id).collect();
    let read_ids = match storage
        .find_read_notification_ids(viewer.id, &visible_ids)
        .await
    {
        Ok(ids) => ids,
        Err(e) => {
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    format!("查询已读状态失败: {e}"),
                )),
            );
        }
    };

    let unread_count = (visible_ids.len() - read_ids.len()) as i64;

    let config = AppConfig::get();
    cache
        .insert_raw(
            cache_key,
            unread_count.to_string(),
            config.cache.default_ttl,
        )
        .await;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        UnreadCountResponse { unread_count },
        "查询成功",
    )))
}
