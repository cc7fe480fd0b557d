/// 远程题库接口
///
/// 只提供"全量读取"和"订阅变更"两种能力
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::QuestionRecord;

/// 变更类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// 远程题库变更事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// 变更的题目 id，无法确定时为 None
    pub question_id: Option<String>,
}

/// 变更事件流，丢弃接收端即结束远程订阅
pub type ChangeStream = mpsc::UnboundedReceiver<ChangeEvent>;

/// 远程题库
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// 数据源名称（用于日志和错误信息）
    fn name(&self) -> &str;

    /// 全量读取题库
    async fn fetch_all(&self) -> AppResult<Vec<QuestionRecord>>;

    /// 订阅题库的新增/修改/删除事件
    async fn subscribe(&self) -> AppResult<ChangeStream>;
}

/// 内存题库
///
/// 可在运行期修改，每次修改都会通知所有订阅者。
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<RepositoryState>,
}

#[derive(Default)]
struct RepositoryState {
    records: BTreeMap<String, QuestionRecord>,
    listeners: Vec<mpsc::UnboundedSender<ChangeEvent>>,
    offline: bool,
    fetch_count: usize,
}

impl RepositoryState {
    fn emit(&mut self, event: ChangeEvent) {
        self.listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用初始题目创建
    pub fn with_records(records: impl IntoIterator<Item = QuestionRecord>) -> Self {
        let repository = Self::new();
        {
            let mut state = repository.state();
            for record in records {
                state.records.insert(record.id.clone(), record);
            }
        }
        repository
    }

    fn state(&self) -> MutexGuard<'_, RepositoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 新增或修改题目
    pub fn upsert(&self, record: QuestionRecord) -> ChangeKind {
        let mut state = self.state();
        let id = record.id.clone();
        let kind = match state.records.insert(id.clone(), record) {
            Some(_) => ChangeKind::Modified,
            None => ChangeKind::Added,
        };
        debug!("内存题库 {:?}: {}", kind, id);
        state.emit(ChangeEvent {
            kind,
            question_id: Some(id),
        });
        kind
    }

    /// 删除题目，返回是否存在
    pub fn remove(&self, id: &str) -> bool {
        let mut state = self.state();
        if state.records.remove(id).is_none() {
            return false;
        }
        debug!("内存题库 Removed: {}", id);
        state.emit(ChangeEvent {
            kind: ChangeKind::Removed,
            question_id: Some(id.to_string()),
        });
        true
    }

    /// 模拟仓库离线
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// 全量读取次数
    pub fn fetch_count(&self) -> usize {
        self.state().fetch_count
    }

    /// 仍然存活的订阅数量
    pub fn listener_count(&self) -> usize {
        let mut state = self.state();
        state.listeners.retain(|tx| !tx.is_closed());
        state.listeners.len()
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_all(&self) -> AppResult<Vec<QuestionRecord>> {
        let mut state = self.state();
        if state.offline {
            return Err(AppError::repository_offline("内存题库已离线"));
        }
        state.fetch_count += 1;
        Ok(state.records.values().cloned().collect())
    }

    async fn subscribe(&self) -> AppResult<ChangeStream> {
        let mut state = self.state();
        if state.offline {
            return Err(AppError::repository_offline("内存题库已离线"));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.listeners.push(tx);
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> QuestionRecord {
        QuestionRecord {
            id: id.to_string(),
            topic: None,
            category: "AI".to_string(),
            prompt: format!("Pregunta {}", id),
            alternatives: [
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "d".to_string(),
            ],
            answer: "a".to_string(),
            image: None,
            rationale: None,
        }
    }

    #[tokio::test]
    async fn mutations_reach_subscribers() {
        let repository = InMemoryRepository::with_records([record("q1")]);
        let mut stream = repository.subscribe().await.unwrap();

        assert_eq!(repository.upsert(record("q2")), ChangeKind::Added);
        assert_eq!(repository.upsert(record("q2")), ChangeKind::Modified);
        assert!(repository.remove("q1"));
        assert!(!repository.remove("missing"));

        let kinds: Vec<ChangeKind> = [
            stream.recv().await.unwrap(),
            stream.recv().await.unwrap(),
            stream.recv().await.unwrap(),
        ]
        .iter()
        .map(|e| e.kind)
        .collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Added, ChangeKind::Modified, ChangeKind::Removed]
        );
        assert!(stream.try_recv().is_err());

        let records = repository.fetch_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "q2");
    }

    #[tokio::test]
    async fn dropped_stream_is_pruned() {
        let repository = InMemoryRepository::new();
        let stream = repository.subscribe().await.unwrap();
        assert_eq!(repository.listener_count(), 1);
        drop(stream);
        assert_eq!(repository.listener_count(), 0);
    }

    #[tokio::test]
    async fn offline_repository_is_unavailable() {
        let repository = InMemoryRepository::new();
        repository.set_offline(true);
        assert!(matches!(
            repository.fetch_all().await,
            Err(AppError::RepositoryUnavailable(_))
        ));
        assert!(matches!(
            repository.subscribe().await,
            Err(AppError::RepositoryUnavailable(_))
        ));
    }
}
