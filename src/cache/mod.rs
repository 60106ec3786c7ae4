//! 缓存模块
//!
//! 缓存后端以插件形式注册，启动时按配置的 cache.cache_type 选取。
//! 新增后端只需实现 ObjectCache 并用 declare_object_cache_plugin!
//! 声明即可，无需改动装配代码。

pub mod object_cache;
pub mod register;
pub mod traits;

use std::sync::Arc;

pub use traits::{CacheResult, ObjectCache};

use crate::config::AppConfig;
use crate::errors::{CollegeHubError, Result};

/// 声明缓存插件并在进程启动时注册到全局注册表
#[macro_export]
macro_rules! declare_object_cache_plugin {
    ($name:expr, $plugin:ident) => {
        paste::paste! {
            #[ctor::ctor]
            fn [<__register_object_cache_ $plugin:snake>]() {
                $crate::cache::register::register_object_cache_plugin(
                    $name,
                    std::sync::Arc::new(|| {
                        Box::pin(async {
                            let cache = <$plugin>::new()
                                .map_err($crate::errors::CollegeHubError::cache_connection)?;
                            Ok(Box::new(cache) as Box<dyn $crate::cache::ObjectCache>)
                        })
                    }),
                );
            }
        }
    };
}

/// 按配置构建缓存实例
pub async fn create_cache() -> Result<Arc<dyn ObjectCache>> {
    let config = AppConfig::get();
    let cache_type = config.cache.cache_type.as_str();

    register::debug_object_cache_registry();

    let constructor = register::get_object_cache_plugin(cache_type).ok_or_else(|| {
        CollegeHubError::cache_plugin_not_found(format!(
            "Cache plugin '{cache_type}' is not registered"
        ))
    })?;

    let cache = constructor().await?;
    tracing::info!("Cache backend initialized: {}", cache_type);
    Ok(Arc::from(cache))
}
