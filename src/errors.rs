//! 统一错误处理模块
//!
//! 使用宏自动生成错误类型，支持错误代码和类型名称。

use std::fmt;

/// 定义错误类型的宏
///
/// 自动生成：
/// - enum 定义
/// - code() 方法 - 返回错误代码
/// - error_type() 方法 - 返回错误类型名称
/// - message() 方法 - 返回错误详情
/// - 便捷构造函数
macro_rules! define_collegehub_errors {
    ($(
        $variant:ident($code:literal, $type_name:literal)
    ),* $(,)?) => {
        #[derive(Debug, Clone)]
        pub enum CollegeHubError {
            $($variant(String),)*
        }

        impl CollegeHubError {
            /// 获取错误代码
            pub fn code(&self) -> &'static str {
                match self {
                    $(CollegeHubError::$variant(_) => $code,)*
                }
            }

            /// 获取错误类型名称
            pub fn error_type(&self) -> &'static str {
                match self {
                    $(CollegeHubError::$variant(_) => $type_name,)*
                }
            }

            /// 获取错误详情
            pub fn message(&self) -> &str {
                match self {
                    $(CollegeHubError::$variant(msg) => msg,)*
                }
            }
        }

        // 生成便捷构造函数
        paste::paste! {
            impl CollegeHubError {
                $(
                    pub fn [<$variant:snake>]<T: Into<String>>(msg: T) -> Self {
                        CollegeHubError::$variant(msg.into())
                    }
                )*
            }
        }
    };
}

define_collegehub_errors! {
    CacheConnection("E001", "Cache Connection Error"),
    CachePluginNotFound("E002", "Cache Plugin Not Found"),
    DatabaseConfig("E003", "Database Configuration Error"),
    DatabaseConnection("E004", "Database Connection Error"),
    DatabaseOperation("E005", "Database Operation Error"),
    Validation("E006", "Validation Error"),
    NotFound("E007", "Resource Not Found"),
    Serialization("E008", "Serialization Error"),
    DateParse("E009", "Date Parse Error"),
    Authentication("E010", "Authentication Error"),
    Authorization("E011", "Authorization Error"),
    MailDelivery("E012", "Mail Delivery Error"),
    DispatchQueue("E013", "Dispatch Queue Error"),
}

impl CollegeHubError {
    /// 格式化为彩色输出（用于开发环境）
    #[cfg(debug_assertions)]
    pub fn format_colored(&self) -> String {
        format!(
            "\x1b[1;31m[ERROR]\x1b[0m \x1b[33m{}\x1b[0m \x1b[31m{}\x1b[0m\n  {}",
            self.code(),
            self.error_type(),
            self.message()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for CollegeHubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CollegeHubError {}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for CollegeHubError {
    fn from(err: sea_orm::DbErr) -> Self {
        CollegeHubError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for CollegeHubError {
    fn from(err: std::io::Error) -> Self {
        CollegeHubError::DatabaseConnection(err.to_string())
    }
}

impl From<serde_json::Error> for CollegeHubError {
    fn from(err: serde_json::Error) -> Self {
        CollegeHubError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for CollegeHubError {
    fn from(err: chrono::ParseError) -> Self {
        CollegeHubError::DateParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CollegeHubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CollegeHubError::cache_connection("test").code(), "E001");
        assert_eq!(CollegeHubError::validation("test").code(), "E006");
        assert_eq!(CollegeHubError::mail_delivery("test").code(), "E012");
        assert_eq!(CollegeHubError::dispatch_queue("test").code(), "E013");
    }

    #[test]
    fn test_error_types() {
        assert_eq!(
            CollegeHubError::validation("test").error_type(),
            "Validation Error"
        );
        assert_eq!(
            CollegeHubError::mail_delivery("test").error_type(),
            "Mail Delivery Error"
        );
    }

    #[test]
    fn test_error_message() {
        let err = CollegeHubError::validation("Invalid input");
        assert_eq!(err.message(), "Invalid input");
    }

    #[test]
    fn test_format_simple() {
        let err = CollegeHubError::not_found("Notification 42 not found");
        let formatted = err.format_simple();
        assert!(formatted.contains("Resource Not Found"));
        assert!(formatted.contains("Notification 42"));
    }
}
