use crate::models::question::QuestionRecord;
use crate::models::quota_rule::QuotaRules;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// 题库 TOML 文件结构
///
/// ```toml
/// [[questions]]
/// id = "q-001"
/// topic = "Señales"
/// category = "A-I"
/// prompt = "..."
/// alternatives = ["a) ...", "b) ...", "c) ...", "d) ..."]
/// answer = "a"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusFile {
    #[serde(default)]
    pub questions: Vec<QuestionRecord>,
}

/// 从 TOML 文件加载全部题目记录
pub async fn load_corpus_file(toml_file_path: &Path) -> Result<Vec<QuestionRecord>> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取题库文件: {}", toml_file_path.display()))?;

    let corpus: CorpusFile = toml::from_str(&content)
        .with_context(|| format!("无法解析题库文件: {}", toml_file_path.display()))?;

    tracing::debug!(
        "从 {} 加载 {} 道题目",
        toml_file_path.display(),
        corpus.questions.len()
    );

    Ok(corpus.questions)
}

/// 从 TOML 文件加载配额规则
pub async fn load_quota_rules(toml_file_path: &Path) -> Result<QuotaRules> {
    if !toml_file_path.exists() {
        anyhow::bail!("配额规则文件不存在: {}", toml_file_path.display());
    }

    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取配额规则文件: {}", toml_file_path.display()))?;

    let rules: QuotaRules = toml::from_str(&content)
        .with_context(|| format!("无法解析配额规则文件: {}", toml_file_path.display()))?;

    tracing::info!(
        "已加载配额规则: {} 个别名类别, {} 个拆分类别族",
        rules.aliases.len(),
        rules.split.len()
    );

    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn loads_corpus_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [[questions]]
            id = "q-001"
            topic = "Señales"
            category = "A-I"
            prompt = "¿Qué indica la señal?"
            alternatives = ["a) Pare", "b) Ceda", "c) Siga", "d) Ninguna"]
            answer = "a"

            [[questions]]
            id = "q-002"
            category = "BII-A"
            prompt = "Velocidad máxima en zona urbana"
            alternatives = ["a) 30", "b) 60", "c) 80", "d) 100"]
            answer = "b"
            "#
        )
        .unwrap();

        let records = load_corpus_file(file.path()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].topic.as_deref(), Some("Señales"));
        assert!(records[1].topic.is_none());
    }

    #[tokio::test]
    async fn missing_rules_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_quota_rules(&dir.path().join("nope.toml")).await;
        assert!(result.is_err());
    }
}
