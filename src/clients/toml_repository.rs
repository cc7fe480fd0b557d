/// 文件题库
///
/// 从 TOML 文件读取全量题目，通过轮询文件修改时间发现变更
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::clients::question_repository::{ChangeEvent, ChangeKind, ChangeStream, QuestionRepository};
use crate::error::{AppError, AppResult};
use crate::models::{load_corpus_file, QuestionRecord};

pub struct TomlFileRepository {
    path: PathBuf,
    name: String,
    poll_interval: Duration,
}

impl TomlFileRepository {
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        let path = path.into();
        Self {
            name: format!("toml:{}", path.display()),
            path,
            poll_interval,
        }
    }
}

async fn modified_time(path: &Path) -> std::io::Result<SystemTime> {
    tokio::fs::metadata(path).await?.modified()
}

#[async_trait]
impl QuestionRepository for TomlFileRepository {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_all(&self) -> AppResult<Vec<QuestionRecord>> {
        let records = load_corpus_file(&self.path)
            .await
            .map_err(|e| AppError::repository_fetch_failed(self.name.as_str(), e))?;
        info!("📚 {} 读取到 {} 道题目", self.name, records.len());
        Ok(records)
    }

    async fn subscribe(&self) -> AppResult<ChangeStream> {
        let mut last_modified = modified_time(&self.path)
            .await
            .map_err(|e| AppError::repository_subscribe_failed(self.name.as_str(), e))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let path = self.path.clone();
        let mut ticker = tokio::time::interval(self.poll_interval);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tx.closed() => {
                        debug!("文件题库订阅已关闭: {}", path.display());
                        break;
                    }
                    _ = ticker.tick() => {
                        let modified = match modified_time(&path).await {
                            Ok(modified) => modified,
                            Err(e) => {
                                warn!("⚠️ 无法读取题库文件状态 {}: {}", path.display(), e);
                                continue;
                            }
                        };
                        if modified == last_modified {
                            continue;
                        }
                        last_modified = modified;
                        let event = ChangeEvent {
                            kind: ChangeKind::Modified,
                            question_id: None,
                        };
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepositoryError;

    const CORPUS: &str = r#"
        [[questions]]
        id = "q-001"
        topic = "Señales"
        category = "AI"
        prompt = "¿Qué indica la señal?"
        alternatives = ["a) Pare", "b) Ceda", "c) Siga", "d) Ninguna"]
        answer = "a"
    "#;

    #[tokio::test]
    async fn fetches_records_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questionnaire.toml");
        std::fs::write(&path, CORPUS).unwrap();

        let repository = TomlFileRepository::new(&path, Duration::from_millis(20));
        let records = repository.fetch_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "q-001");
    }

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let repository =
            TomlFileRepository::new(dir.path().join("missing.toml"), Duration::from_millis(20));
        assert!(matches!(
            repository.fetch_all().await,
            Err(AppError::RepositoryUnavailable(RepositoryError::FetchFailed { .. }))
        ));
        assert!(matches!(
            repository.subscribe().await,
            Err(AppError::RepositoryUnavailable(RepositoryError::SubscribeFailed { .. }))
        ));
    }

    #[tokio::test]
    async fn file_change_emits_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questionnaire.toml");
        std::fs::write(&path, CORPUS).unwrap();

        let repository = TomlFileRepository::new(&path, Duration::from_millis(20));
        let mut stream = repository.subscribe().await.unwrap();

        // 修改时间精度可能较粗，直接把修改时间往后推
        let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), stream.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.kind, ChangeKind::Modified);
        assert!(event.question_id.is_none());
    }
}
