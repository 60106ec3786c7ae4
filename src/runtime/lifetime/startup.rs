use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::ObjectCache;
use crate::services::dispatch::{DispatchQueue, LogMailer};
use crate::storage::Storage;

pub struct StartupContext {
    pub storage: Arc<dyn Storage>,
    pub cache: Arc<dyn ObjectCache>,
}

/// 准备服务器启动的上下文
/// 包括存储、缓存和邮件分发后台任务
pub async fn prepare_server_startup() -> StartupContext {
    if cfg!(debug_assertions) {
        crate::cache::register::debug_object_cache_registry();
        debug!("Debug mode: Cache registry is enabled");
    }

    let storage = crate::storage::create_storage()
        .await
        .expect("Failed to create storage backend");
    warn!("Storage backend initialized and migrations completed");

    let cache = crate::cache::create_cache()
        .await
        .expect("Failed to create cache");
    warn!("Cache backend initialized");

    // 邮件分发后台任务，通知创建后的 fan-out 都走这条队列
    DispatchQueue::start(storage.clone(), Arc::new(LogMailer));
    warn!("Notification dispatch worker started");

    StartupContext { storage, cache }
}
