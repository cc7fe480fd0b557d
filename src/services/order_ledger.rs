//! 考试顺序账本 - 业务能力层
//!
//! 记录本次考试抽到的题目 id 及顺序。页面刷新后按原顺序还原，
//! 不允许重新抽题。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::AppResult;
use crate::infrastructure::KeyValueStore;
use crate::models::Category;

/// 账本在本地存储中的键
pub const LEDGER_KEY: &str = "examQuestionOrder";

/// 一次考试的题目顺序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub category: Category,
    pub question_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

pub struct SessionOrderLedger {
    store: Arc<dyn KeyValueStore>,
}

impl SessionOrderLedger {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// 保存本次考试的题目顺序
    pub async fn persist(&self, category: &Category, ordered_ids: &[String]) -> AppResult<()> {
        let entry = LedgerEntry {
            category: category.clone(),
            question_ids: ordered_ids.to_vec(),
            created_at: Utc::now(),
        };
        let raw = serde_json::to_string(&entry)?;
        self.store.put(LEDGER_KEY, &raw).await?;
        info!("📝 已记录类别 {} 的考试顺序 ({} 道题目)", category, ordered_ids.len());
        Ok(())
    }

    /// 当前考试的题目顺序
    ///
    /// 账本内容损坏时视为不存在。
    pub async fn current_order(&self) -> AppResult<Option<LedgerEntry>> {
        let Some(raw) = self.store.get(LEDGER_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                warn!("⚠️ 考试顺序记录已损坏，忽略: {}", e);
                Ok(None)
            }
        }
    }

    /// 清除考试顺序（考试结束）
    pub async fn clear(&self) -> AppResult<()> {
        self.store.remove(LEDGER_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryKvStore;

    #[tokio::test]
    async fn persist_and_restore_order() {
        let ledger = SessionOrderLedger::new(Arc::new(MemoryKvStore::new()));
        assert!(ledger.current_order().await.unwrap().is_none());

        let category = Category::normalize("A-I").unwrap();
        let ids = vec!["q3".to_string(), "q1".to_string(), "q2".to_string()];
        ledger.persist(&category, &ids).await.unwrap();

        let entry = ledger.current_order().await.unwrap().unwrap();
        assert_eq!(entry.category, category);
        assert_eq!(entry.question_ids, ids);

        ledger.clear().await.unwrap();
        assert!(ledger.current_order().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_entry_reads_as_absent() {
        let kv = Arc::new(MemoryKvStore::new());
        kv.put(LEDGER_KEY, "[1,2").await.unwrap();
        let ledger = SessionOrderLedger::new(kv);
        assert!(ledger.current_order().await.unwrap().is_none());
    }
}
