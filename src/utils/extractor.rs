//! 类型安全的路径参数提取器
//!
//! 直接用 web::Path<i64> 时解析失败会返回 actix 默认错误页，
//! 这里统一替换为 ApiResponse 格式的 400 响应。

use actix_web::{FromRequest, HttpRequest, dev::Payload, error::ErrorBadRequest};
use futures_util::future::{Ready, ready};

use crate::models::{ApiResponse, ErrorCode};

macro_rules! define_safe_i64_extractor {
    ($name:ident, $param:literal, $label:literal) => {
        pub struct $name(pub i64);

        impl FromRequest for $name {
            type Error = actix_web::Error;
            type Future = Ready<Result<Self, Self::Error>>;

            fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
                let result = req
                    .match_info()
                    .get($param)
                    .and_then(|raw| raw.parse::<i64>().ok())
                    .filter(|id| *id > 0)
                    .map($name)
                    .ok_or_else(|| {
                        ErrorBadRequest(
                            serde_json::to_string(&ApiResponse::<()>::error_empty(
                                ErrorCode::BadRequest,
                                concat!("Invalid ", $label, " id in path"),
                            ))
                            .unwrap_or_default(),
                        )
                    });
                ready(result)
            }
        }
    };
}

define_safe_i64_extractor!(SafeNotificationIdI64, "notification_id", "notification");
