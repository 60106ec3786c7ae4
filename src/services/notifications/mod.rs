//! 通知服务
//!
//! 每个接口对应一个子模块，服务结构体只做依赖装配与方法转发。
//! 存储与缓存默认从 actix app_data 取，测试可注入。

pub mod count;
pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod read;
pub mod stats;
pub mod update;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::cache::ObjectCache;
use crate::middlewares::RequireJWT;
use crate::models::notifications::requests::{
    CreateNotificationRequest, NotificationQueryParams, UpdateNotificationRequest,
};
use crate::models::users::entities::Viewer;
use crate::models::{ApiResponse, ErrorCode};
use crate::storage::Storage;

// 从请求扩展中还原观察者身份，认证中间件缺位时兜底 401
pub(crate) fn extract_viewer(request: &HttpRequest) -> Result<Viewer, HttpResponse> {
    match RequireJWT::extract_user_claims(request) {
        Some(user) => Ok(Viewer::from(&user)),
        None => Err(HttpResponse::Unauthorized().json(ApiResponse::error_empty(
            ErrorCode::Unauthorized,
            "Unauthorized: missing user context",
        ))),
    }
}

pub struct NotificationService {
    storage: Option<Arc<dyn Storage>>,
    cache: Option<Arc<dyn ObjectCache>>,
}

impl NotificationService {
    pub fn new_lazy() -> Self {
        Self {
            storage: None,
            cache: None,
        }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Arc<dyn Storage> {
        if let Some(storage) = &self.storage {
            storage.clone()
        } else {
            request
                .app_data::<actix_web::web::Data<Arc<dyn Storage>>>()
                .expect("Storage not found in app data")
                .get_ref()
                .clone()
        }
    }

    pub(crate) fn get_cache(&self, request: &HttpRequest) -> Arc<dyn ObjectCache> {
        if let Some(cache) = &self.cache {
            cache.clone()
        } else {
            request
                .app_data::<actix_web::web::Data<Arc<dyn ObjectCache>>>()
                .expect("Cache not found in app data")
                .get_ref()
                .clone()
        }
    }

    // 获取对当前用户可见的通知列表
    pub async fn list_notifications(
        &self,
        request: &HttpRequest,
        query: NotificationQueryParams,
    ) -> ActixResult<HttpResponse> {
        list::list_notifications(self, request, query).await
    }

    // 获取单条通知详情
    pub async fn get_notification(
        &self,
        request: &HttpRequest,
        notification_id: i64,
    ) -> ActixResult<HttpResponse> {
        get::get_notification(self, request, notification_id).await
    }

    // 创建通知并触发邮件分发
    pub async fn create_notification(
        &self,
        request: &HttpRequest,
        notification_data: CreateNotificationRequest,
    ) -> ActixResult<HttpResponse> {
        create::create_notification(self, request, notification_data).await
    }

    // 更新通知
    pub async fn update_notification(
        &self,
        request: &HttpRequest,
        notification_id: i64,
        update_data: UpdateNotificationRequest,
    ) -> ActixResult<HttpResponse> {
        update::update_notification(self, request, notification_id, update_data).await
    }

    // 删除通知
    pub async fn delete_notification(
        &self,
        request: &HttpRequest,
        notification_id: i64,
    ) -> ActixResult<HttpResponse> {
        delete::delete_notification(self, request, notification_id).await
    }

    // 标记单条通知已读
    pub async fn mark_as_read(
        &self,
        request: &HttpRequest,
        notification_id: i64,
    ) -> ActixResult<HttpResponse> {
        read::mark_as_read(self, request, notification_id).await
    }

    // 标记全部可见通知已读
    pub async fn mark_all_as_read(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        read::mark_all_as_read(self, request).await
    }

    // 查询未读数量
    pub async fn get_unread_count(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        count::get_unread_count(self, request).await
    }

    // 通知统计概览
    pub async fn get_stats(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        stats::get_stats(self, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::HttpMessage;
    use actix_web::http::StatusCode;
    use async_trait::async_trait;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::cache::CacheResult;
    use crate::entity;
    use crate::models::notifications::entities::{
        Audience, NotificationPriority, NotificationType,
    };
    use crate::models::users::entities::{User, UserProfile, UserRole, UserStatus};
    use crate::storage::sea_orm_storage::SeaOrmStorage;

    #[derive(Default)]
    struct MemoryCache {
        entries: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl ObjectCache for MemoryCache {
        async fn get_raw(&self, key: &str) -> CacheResult<String> {
            match self.entries.lock().unwrap().get(key) {
                Some(value) => CacheResult::Found(value.clone()),
                None => CacheResult::NotFound,
            }
        }

        async fn insert_raw(&self, key: String, value: String, _ttl: u64) {
            self.entries.lock().unwrap().insert(key, value);
        }

        async fn remove(&self, key: &str) {
            self.entries.lock().unwrap().remove(key);
        }

        async fn invalidate_all(&self) {
            self.entries.lock().unwrap().clear();
        }
    }

    // 内存 SQLite 必须单连接，多连接会各自拿到独立的空库
    async fn test_env() -> (NotificationService, SeaOrmStorage, Arc<MemoryCache>) {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let storage = SeaOrmStorage { db };
        let cache = Arc::new(MemoryCache::default());
        let service = NotificationService {
            storage: Some(Arc::new(storage.clone())),
            cache: Some(cache.clone()),
        };
        (service, storage, cache)
    }

    async fn seed_user(storage: &SeaOrmStorage, user: &User) -> i64 {
        let now = chrono::Utc::now().timestamp();
        let model = entity::users::ActiveModel {
            username: Set(user.username.clone()),
            email: Set(user.email.clone()),
            password_hash: Set("x".to_string()),
            role: Set(user.role.to_string()),
            status: Set("active".to_string()),
            department: Set(user.department.clone()),
            semester: Set(user.semester),
            is_email_verified: Set(user.is_email_verified),
            profile_name: Set(Some(user.profile.profile_name.clone())),
            avatar_url: Set(None),
            last_login: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        model.insert(&storage.db).await.unwrap().id
    }

    fn teacher(id: i64) -> User {
        User {
            id,
            username: "prof_lin".to_string(),
            email: "prof_lin@campus.edu".to_string(),
            password_hash: "x".to_string(),
            role: UserRole::Teacher,
            status: UserStatus::Active,
            department: Some("Computer Science".to_string()),
            semester: None,
            is_email_verified: true,
            profile: UserProfile {
                profile_name: "Prof Lin".to_string(),
                avatar_url: None,
            },
            last_login: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn request_for(user: &User) -> HttpRequest {
        let request = actix_web::test::TestRequest::default().to_http_request();
        request.extensions_mut().insert(user.clone());
        request
    }

    fn create_request(title: &str) -> CreateNotificationRequest {
        CreateNotificationRequest {
            title: title.to_string(),
            message: "Please check the portal for the updated schedule.".to_string(),
            notification_type: NotificationType::Academic,
            priority: NotificationPriority::High,
            target_audience: vec![Audience::Students],
            target_departments: vec![],
            target_semesters: vec![],
            expires_at: None,
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn creating_notification_clears_counter_cache() {
        let (service, storage, cache) = test_env().await;
        let mut author = teacher(0);
        author.id = seed_user(&storage, &author).await;

        cache
            .insert_raw("unread_count:7".to_string(), "3".to_string(), 0)
            .await;
        cache
            .insert_raw("unread_count:8".to_string(), "0".to_string(), 0)
            .await;

        let request = request_for(&author);
        let response = service
            .create_notification(&request, create_request("Midterm schedule"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(cache.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_read_accepts_expired_notification() {
        let (service, storage, cache) = test_env().await;
        let mut author = teacher(0);
        author.id = seed_user(&storage, &author).await;

        // 面向学生且已过期，对教师既不匹配也不可见
        let mut req = create_request("Lab safety briefing");
        req.expires_at = Some(chrono::Utc::now() - chrono::Duration::hours(1));
        let notification = storage
            .create_notification_impl(req, author.id)
            .await
            .unwrap();

        let cache_key = format!("unread_count:{}", author.id);
        cache
            .insert_raw(cache_key.clone(), "1".to_string(), 0)
            .await;

        let request = request_for(&author);
        let response = service
            .mark_as_read(&request, notification.id)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!cache.entries.lock().unwrap().contains_key(&cache_key));

        let read_ids = storage
            .find_read_notification_ids_impl(author.id, &[notification.id])
            .await
            .unwrap();
        assert_eq!(read_ids, vec![notification.id]);

        // 重复标记与不存在的通知
        let again = service
            .mark_as_read(&request, notification.id)
            .await
            .unwrap();
        assert_eq!(again.status(), StatusCode::OK);
        let missing = service.mark_as_read(&request, 9999).await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
