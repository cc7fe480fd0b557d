//! 题库缓存 - 业务能力层
//!
//! 只负责快照的整体读写，不关心快照从哪里来

use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{AppResult, StorageError};
use crate::infrastructure::KeyValueStore;
use crate::models::CorpusSnapshot;

/// 快照在本地存储中的键
pub const CACHE_KEY: &str = "cachedQuestions";

/// 题库缓存
///
/// 写入总是整体覆盖，读者不会看到半新半旧的快照。
#[derive(Clone)]
pub struct CorpusCacheStore {
    store: Arc<dyn KeyValueStore>,
}

impl CorpusCacheStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// 读取快照
    ///
    /// 不存在返回 None；数据无法解析时返回 `StorageError::Corrupt`
    pub async fn read(&self) -> AppResult<Option<CorpusSnapshot>> {
        let Some(raw) = self.store.get(CACHE_KEY).await? else {
            debug!("缓存未命中");
            return Ok(None);
        };

        let snapshot: CorpusSnapshot =
            serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
                key: CACHE_KEY.to_string(),
                source,
            })?;

        debug!(
            "缓存命中: 第 {} 代, {} 道题目",
            snapshot.generation,
            snapshot.len()
        );
        Ok(Some(snapshot))
    }

    /// 整体写入快照
    pub async fn write(&self, snapshot: &CorpusSnapshot) -> AppResult<()> {
        let raw = serde_json::to_string(snapshot)?;
        self.store.put(CACHE_KEY, &raw).await?;
        info!(
            "💾 已缓存第 {} 代题库快照 ({} 道题目)",
            snapshot.generation,
            snapshot.len()
        );
        Ok(())
    }

    /// 使缓存失效
    pub async fn invalidate(&self) -> AppResult<()> {
        self.store.remove(CACHE_KEY).await?;
        info!("🗑️ 题库缓存已失效");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryKvStore;

    #[tokio::test]
    async fn write_read_invalidate() {
        let store = CorpusCacheStore::new(Arc::new(MemoryKvStore::new()));
        assert!(store.read().await.unwrap().is_none());

        let snapshot = CorpusSnapshot::new(3, Vec::new());
        store.write(&snapshot).await.unwrap();
        assert_eq!(store.read().await.unwrap(), Some(snapshot));

        store.invalidate().await.unwrap();
        assert!(store.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn garbage_is_reported_as_corrupt() {
        let kv = Arc::new(MemoryKvStore::new());
        kv.put(CACHE_KEY, "{not json").await.unwrap();
        let store = CorpusCacheStore::new(kv);

        let err = store.read().await.unwrap_err();
        assert!(err.is_corrupt_cache());
    }
}
