pub mod common;
pub mod notifications;
pub mod users;

pub use common::pagination::{PaginatedResponse, PaginationInfo, PaginationQuery};
pub use common::response::ApiResponse;

/// 应用启动时间，用于运行时诊断
#[derive(Debug, Clone)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

/// 业务错误码
///
/// 序列化进 ApiResponse.code，前端据此区分错误场景。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,

    // 400xx 请求错误
    BadRequest = 40000,
    ValidationFailed = 40001,

    // 401xx 认证错误
    Unauthorized = 40100,

    // 403xx 权限错误
    PermissionDenied = 40300,
    NotificationPermissionDenied = 40301,

    // 404xx 资源不存在
    NotFound = 40400,
    UserNotFound = 40401,
    NotificationNotFound = 40402,

    // 500xx 服务端错误
    InternalServerError = 50000,
    NotificationCreationFailed = 50001,
}
