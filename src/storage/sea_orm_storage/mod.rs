//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。

mod notification_reads;
mod notifications;
mod users;

use crate::config::AppConfig;
use crate::errors::{CollegeHubError, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
}

impl SeaOrmStorage {
    /// 创建新的 SeaORM 存储实例
    pub async fn new_async() -> Result<Self> {
        let config = AppConfig::get();
        let db_url = Self::build_database_url(&config.database.url)?;

        // 根据数据库类型选择连接方式
        let db = if db_url.starts_with("sqlite://") {
            Self::connect_sqlite(&db_url, config).await?
        } else {
            Self::connect_generic(&db_url, config).await?
        };

        // 运行迁移
        Migrator::up(&db, None)
            .await
            .map_err(|e| CollegeHubError::database_operation(format!("数据库迁移失败: {e}")))?;

        info!("SeaORM 存储初始化完成，数据库: {}", db_url);

        Ok(Self { db })
    }

    /// SQLite 专用连接（WAL + pragma 优化）
    async fn connect_sqlite(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| CollegeHubError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .pragma("cache_size", "-64000")
            .pragma("temp_store", "memory");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.database.pool_size)
            .min_connections(1)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(300))
            .connect_with(opt)
            .await
            .map_err(|e| CollegeHubError::database_connection(format!("SQLite 连接失败: {e}")))?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(config.database.pool_size)
            .min_connections(5)
            .connect_timeout(Duration::from_secs(config.database.timeout))
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        Database::connect(opt)
            .await
            .map_err(|e| CollegeHubError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 从 URL 自动推断数据库类型并构建连接 URL
    fn build_database_url(url: &str) -> Result<String> {
        if url.starts_with("sqlite://") {
            Ok(url.to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") || url == ":memory:" {
            Ok(format!("sqlite://{url}?mode=rwc"))
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(CollegeHubError::database_config(format!(
                "无法从 URL 推断数据库类型: {url}. 支持: sqlite://, postgres://, mysql://, 或 .db/.sqlite 文件路径"
            )))
        }
    }
}

// Storage trait 实现
use crate::models::{
    notifications::{
        entities::Notification,
        requests::{CreateNotificationRequest, NotificationListQuery, UpdateNotificationRequest},
        responses::NotificationStatsResponse,
    },
    users::entities::User,
};
use crate::storage::Storage;
use async_trait::async_trait;

#[async_trait]
impl Storage for SeaOrmStorage {
    // 用户模块
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.get_user_by_id_impl(id).await
    }

    async fn find_notification_recipients(
        &self,
        notification: &Notification,
    ) -> Result<Vec<User>> {
        self.find_notification_recipients_impl(notification).await
    }

    // 通知模块
    async fn create_notification(
        &self,
        req: CreateNotificationRequest,
        created_by: i64,
    ) -> Result<Notification> {
        self.create_notification_impl(req, created_by).await
    }

    async fn get_notification_by_id(&self, id: i64) -> Result<Option<Notification>> {
        self.get_notification_by_id_impl(id).await
    }

    async fn list_candidate_notifications(
        &self,
        query: NotificationListQuery,
    ) -> Result<Vec<Notification>> {
        self.list_candidate_notifications_impl(query).await
    }

    async fn update_notification(
        &self,
        id: i64,
        update: UpdateNotificationRequest,
    ) -> Result<Option<Notification>> {
        self.update_notification_impl(id, update).await
    }

    async fn delete_notification(&self, id: i64) -> Result<bool> {
        self.delete_notification_impl(id).await
    }

    async fn increment_view_counts(&self, ids: &[i64]) -> Result<u64> {
        self.increment_view_counts_impl(ids).await
    }

    async fn notification_stats(&self) -> Result<NotificationStatsResponse> {
        self.notification_stats_impl().await
    }

    // 已读跟踪模块
    async fn mark_notification_read(&self, notification_id: i64, user_id: i64) -> Result<bool> {
        self.mark_notification_read_impl(notification_id, user_id)
            .await
    }

    async fn find_read_notification_ids(
        &self,
        user_id: i64,
        notification_ids: &[i64],
    ) -> Result<Vec<i64>> {
        self.find_read_notification_ids_impl(user_id, notification_ids)
            .await
    }

    async fn mark_notifications_read_bulk(
        &self,
        user_id: i64,
        notification_ids: &[i64],
    ) -> Result<i64> {
        self.mark_notifications_read_bulk_impl(user_id, notification_ids)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity;
    use crate::models::notifications::entities::{
        Audience, Notification, NotificationPriority, NotificationType,
    };
    use crate::models::notifications::requests::{
        CreateNotificationRequest, NotificationListQuery, UpdateNotificationRequest,
    };
    use crate::models::users::entities::UserRole;
    use sea_orm::{ActiveModelTrait, Database, Set};

    // 内存 SQLite 必须单连接，多连接会各自拿到独立的空库
    async fn test_storage() -> SeaOrmStorage {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        SeaOrmStorage { db }
    }

    async fn seed_user(
        storage: &SeaOrmStorage,
        username: &str,
        role: UserRole,
        status: &str,
        department: Option<&str>,
        semester: Option<i32>,
        verified: bool,
    ) -> i64 {
        let now = chrono::Utc::now().timestamp();
        let user = entity::users::ActiveModel {
            username: Set(username.to_string()),
            email: Set(format!("{username}@campus.edu")),
            password_hash: Set("x".to_string()),
            role: Set(role.to_string()),
            status: Set(status.to_string()),
            department: Set(department.map(str::to_string)),
            semester: Set(semester),
            is_email_verified: Set(verified),
            profile_name: Set(Some(username.to_string())),
            avatar_url: Set(None),
            last_login: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        user.insert(&storage.db).await.unwrap().id
    }

    fn create_request(title: &str) -> CreateNotificationRequest {
        CreateNotificationRequest {
            title: title.to_string(),
            message: "Please check the portal for the updated schedule.".to_string(),
            notification_type: NotificationType::Academic,
            priority: NotificationPriority::High,
            target_audience: vec![Audience::Students],
            target_departments: vec!["Computer Science".to_string()],
            target_semesters: vec![3, 4],
            expires_at: None,
            attachments: vec![],
        }
    }

    fn targeted(audience: Vec<Audience>, departments: Vec<&str>, semesters: Vec<i32>) -> Notification {
        Notification {
            id: 1,
            title: "t".repeat(5),
            message: "m".repeat(10),
            notification_type: NotificationType::General,
            priority: NotificationPriority::Medium,
            target_audience: audience,
            target_departments: departments.into_iter().map(str::to_string).collect(),
            target_semesters: semesters,
            created_by: 1,
            is_active: true,
            expires_at: None,
            attachments: vec![],
            view_count: 0,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_and_fetch_roundtrip() {
        let storage = test_storage().await;
        let author = seed_user(
            &storage,
            "prof_sharma",
            UserRole::Teacher,
            "active",
            Some("Computer Science"),
            None,
            true,
        )
        .await;

        let created = storage
            .create_notification_impl(create_request("Midterm schedule"), author)
            .await
            .unwrap();

        let fetched = storage
            .get_notification_by_id_impl(created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.title, "Midterm schedule");
        assert_eq!(fetched.target_audience, vec![Audience::Students]);
        assert_eq!(fetched.target_semesters, vec![3, 4]);
        assert_eq!(fetched.view_count, 0);
        assert!(fetched.is_active);
    }

    #[tokio::test]
    async fn mark_read_is_idempotent() {
        let storage = test_storage().await;
        let author = seed_user(
            &storage,
            "admin1",
            UserRole::Admin,
            "active",
            None,
            None,
            true,
        )
        .await;
        let reader = seed_user(
            &storage,
            "student1",
            UserRole::Student,
            "active",
            Some("Computer Science"),
            Some(3),
            true,
        )
        .await;
        let n = storage
            .create_notification_impl(create_request("Exam notice"), author)
            .await
            .unwrap();

        assert!(storage.mark_notification_read_impl(n.id, reader).await.unwrap());
        assert!(!storage.mark_notification_read_impl(n.id, reader).await.unwrap());

        let read = storage
            .find_read_notification_ids_impl(reader, &[n.id])
            .await
            .unwrap();
        assert_eq!(read, vec![n.id]);
    }

    #[tokio::test]
    async fn bulk_mark_counts_only_new_rows() {
        let storage = test_storage().await;
        let author = seed_user(
            &storage,
            "admin2",
            UserRole::Admin,
            "active",
            None,
            None,
            true,
        )
        .await;
        let reader = seed_user(
            &storage,
            "student2",
            UserRole::Student,
            "active",
            Some("Computer Science"),
            Some(4),
            true,
        )
        .await;

        let mut ids = Vec::new();
        for i in 0..3 {
            let n = storage
                .create_notification_impl(create_request(&format!("Notice {i}")), author)
                .await
                .unwrap();
            ids.push(n.id);
        }

        storage
            .mark_notification_read_impl(ids[0], reader)
            .await
            .unwrap();

        assert_eq!(
            storage
                .mark_notifications_read_bulk_impl(reader, &ids)
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            storage
                .mark_notifications_read_bulk_impl(reader, &ids)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn view_counts_increment_in_bulk() {
        let storage = test_storage().await;
        let author = seed_user(
            &storage,
            "admin3",
            UserRole::Admin,
            "active",
            None,
            None,
            true,
        )
        .await;
        let a = storage
            .create_notification_impl(create_request("First notice"), author)
            .await
            .unwrap();
        let b = storage
            .create_notification_impl(create_request("Second notice"), author)
            .await
            .unwrap();

        assert_eq!(
            storage.increment_view_counts_impl(&[a.id, b.id]).await.unwrap(),
            2
        );
        assert_eq!(storage.increment_view_counts_impl(&[]).await.unwrap(), 0);

        let a = storage
            .get_notification_by_id_impl(a.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(a.view_count, 1);
    }

    #[tokio::test]
    async fn candidate_listing_skips_inactive_and_expired() {
        let storage = test_storage().await;
        let author = seed_user(
            &storage,
            "admin4",
            UserRole::Admin,
            "active",
            None,
            None,
            true,
        )
        .await;

        let active = storage
            .create_notification_impl(create_request("Active notice"), author)
            .await
            .unwrap();
        let deactivated = storage
            .create_notification_impl(create_request("Deactivated notice"), author)
            .await
            .unwrap();
        let expired = storage
            .create_notification_impl(create_request("Expired notice"), author)
            .await
            .unwrap();

        storage
            .update_notification_impl(
                deactivated.id,
                UpdateNotificationRequest {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        storage
            .update_notification_impl(
                expired.id,
                UpdateNotificationRequest {
                    expires_at: Some(chrono::Utc::now() - chrono::Duration::hours(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let candidates = storage
            .list_candidate_notifications_impl(NotificationListQuery::default())
            .await
            .unwrap();
        let ids: Vec<i64> = candidates.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![active.id]);
    }

    #[tokio::test]
    async fn recipients_follow_targeting_rules() {
        let storage = test_storage().await;

        let cse_sem3 = seed_user(
            &storage,
            "cse_sem3",
            UserRole::Student,
            "active",
            Some("Computer Science"),
            Some(3),
            true,
        )
        .await;
        // 学期不匹配
        seed_user(
            &storage,
            "cse_sem5",
            UserRole::Student,
            "active",
            Some("Computer Science"),
            Some(5),
            true,
        )
        .await;
        // 未验证邮箱
        seed_user(
            &storage,
            "cse_unverified",
            UserRole::Student,
            "active",
            Some("Computer Science"),
            Some(3),
            false,
        )
        .await;
        // 非活跃账号
        seed_user(
            &storage,
            "cse_suspended",
            UserRole::Student,
            "suspended",
            Some("Computer Science"),
            Some(3),
            true,
        )
        .await;
        let cse_teacher = seed_user(
            &storage,
            "cse_teacher",
            UserRole::Teacher,
            "active",
            Some("Computer Science"),
            None,
            true,
        )
        .await;

        // 面向学生与教师、CSE 院系、第 3 学期：教师不受学期维度约束
        let notification = targeted(
            vec![Audience::Students, Audience::Teachers],
            vec!["Computer Science"],
            vec![3],
        );
        let recipients = storage
            .find_notification_recipients_impl(&notification)
            .await
            .unwrap();
        let ids: Vec<i64> = recipients.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![cse_sem3, cse_teacher]);

        // 仅面向学生时教师不在收件人里
        let students_only = targeted(vec![Audience::Students], vec!["Computer Science"], vec![3]);
        let recipients = storage
            .find_notification_recipients_impl(&students_only)
            .await
            .unwrap();
        let ids: Vec<i64> = recipients.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![cse_sem3]);
    }
}
