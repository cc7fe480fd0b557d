//! 本地持久化层 - 基础设施层
//!
//! 只暴露"按键读写字符串"的能力，不认识 Question / Snapshot

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::fs;
use tracing::debug;

use crate::error::{AppResult, StorageError};

/// 通用键值持久化
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 读取键，不存在时返回 None
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// 整体覆盖写入
    async fn put(&self, key: &str, value: &str) -> AppResult<()>;

    /// 删除键，不存在时视为成功
    async fn remove(&self, key: &str) -> AppResult<()>;
}

/// 文件键值存储
///
/// 每个键一个 `<key>.json` 文件。写入先落临时文件再 rename，
/// 读者只会看到完整的旧值或完整的新值。
pub struct FileKvStore {
    dir: PathBuf,
    tmp_counter: AtomicU64,
}

impl FileKvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tmp_counter: AtomicU64::new(0),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl KeyValueStore for FileKvStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed {
                key: key.to_string(),
                source: Box::new(e),
            }
            .into()),
        }
    }

    async fn put(&self, key: &str, value: &str) -> AppResult<()> {
        let write_failed = |e: std::io::Error| StorageError::WriteFailed {
            key: key.to_string(),
            source: Box::new(e),
        };

        fs::create_dir_all(&self.dir).await.map_err(write_failed)?;

        let seq = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp_path = self.dir.join(format!(".{}.{}.tmp", key, seq));
        fs::write(&tmp_path, value).await.map_err(write_failed)?;
        fs::rename(&tmp_path, self.path_for(key))
            .await
            .map_err(write_failed)?;

        debug!("写入 {} ({} 字节)", key, value.len());
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed {
                key: key.to_string(),
                source: Box::new(e),
            }
            .into()),
        }
    }
}

/// 内存键值存储（测试与嵌入使用）
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> AppResult<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.entries().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn file_store_put_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::new(dir.path().join("cache"));

        assert_eq!(store.get("cachedQuestions").await.unwrap(), None);

        assert_ok!(store.put("cachedQuestions", "{\"v\":1}").await);
        assert_ok!(store.put("cachedQuestions", "{\"v\":2}").await);
        assert_eq!(
            store.get("cachedQuestions").await.unwrap().as_deref(),
            Some("{\"v\":2}")
        );

        assert_ok!(store.remove("cachedQuestions").await);
        assert_ok!(store.remove("cachedQuestions").await);
        assert_eq!(store.get("cachedQuestions").await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_store_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::new(dir.path());
        store.put("examQuestionOrder", "[]").await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["examQuestionOrder.json".to_string()]);
    }

    #[tokio::test]
    async fn memory_store_overwrites() {
        let store = MemoryKvStore::new();
        store.put("k", "a").await.unwrap();
        store.put("k", "b").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("b"));
        store.remove("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }
}
