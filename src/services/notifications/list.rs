use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::warn;

use super::NotificationService;
use crate::models::common::PaginationInfo;
use crate::models::notifications::entities::Notification;
use crate::models::notifications::requests::{NotificationListQuery, NotificationQueryParams};
use crate::models::notifications::responses::{NotificationListResponse, NotificationWithReadStatus};
use crate::models::users::entities::Viewer;
use crate::models::{ApiResponse, ErrorCode};
use crate::storage::Storage;

const MAX_PAGE_SIZE: i64 = 100;

pub async fn list_notifications(
    service: &NotificationService,
    request: &HttpRequest,
    query: NotificationQueryParams,
) -> ActixResult<HttpResponse> {
    let viewer = match super::extract_viewer(request) {
        Ok(viewer) => viewer,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    let mut visible = match visible_notifications(
        &storage,
        &viewer,
        NotificationListQuery {
            notification_type: query.notification_type,
            priority: query.priority,
        },
    )
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

    if query.unread_only {
        visible.retain(|n| !read_ids.contains(&n.id));
    }

    // 优先级高的在前，同优先级按创建时间倒序
    visible.sort_by(|a, b| {
        b.priority
            .rank()
            .cmp(&a.priority.rank())
            .then(b.created_at.cmp(&a.created_at))
    });

    let page = query.pagination.page.max(1);
    let page_size = query.pagination.size.clamp(1, MAX_PAGE_SIZE);
    let total = visible.len() as i64;
    let total_pages = (total + page_size - 1) / page_size;

    let offset = ((page - 1) * page_size) as usize;
    let page_items: Vec<Notification> = visible
        .into_iter()
        .skip(offset)
        .take(page_size as usize)
        .collect();

    // 本页每条通知曝光一次，计数失败不影响列表返回
    let page_ids: Vec<i64> = page_items.iter().map(|n| n.id).collect();
    if let Err(e) = storage.increment_view_counts(&page_ids).await {
        warn!("Failed to increment view counts: {}", e);
    }

    let items: Vec<NotificationWithReadStatus> = page_items
        .into_iter()
        .map(|notification| {
            let is_read = read_ids.contains(&notification.id);
            NotificationWithReadStatus {
                notification,
                is_read,
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        NotificationListResponse {
            items,
            pagination: PaginationInfo {
                page,
                page_size,
                total,
                total_pages,
            },
        },
        "查询成功",
    )))
}

/// 拉取候选通知并套用可见性判定
///
/// 列表、未读计数与全部已读共用这条路径，保证三者对"可见"
/// 的口径一致。
pub(crate) async fn visible_notifications(
    storage: &std::sync::Arc<dyn Storage>,
    viewer: &Viewer,
    query: NotificationListQuery,
) -> crate::errors::Result<Vec<Notification>> {
    let candidates = storage.list_candidate_notifications(query).await?;
    Ok(candidates
        .into_iter()
        .filter(|n| n.is_visible_to(viewer))
        .collect())
}
