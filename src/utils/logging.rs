/// 日志工具模块
///
/// 提供日志初始化和输出的辅助函数
use std::collections::BTreeMap;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::{Category, Question};

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug / info。重复调用不会报错。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 题库抽题引擎启动");
    info!("📚 题库文件: {}", config.corpus_file);
    info!("💾 缓存目录: {}", config.cache_dir);
    info!("📊 每套题目数量: {}", config.quota_size);
    info!("{}", "=".repeat(60));
}

/// 记录一套考试题目的概况
///
/// 按题目实际所属的类别统计，别名类别会显示为被借用的题库。
///
/// # 参数
/// - `category`: 考试类别
/// - `questions`: 排好序的题目
pub fn log_exam_summary(category: &Category, questions: &[Question]) {
    info!(
        "✓ 类别 {} 共 {} 道题目 ({}; {} 个主题)",
        category.display_name(),
        questions.len(),
        composition(questions),
        topic_count(questions)
    );
}

/// 各类别题目数量，如 `AI 20, AIIB 20`
fn composition(questions: &[Question]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for question in questions {
        *counts.entry(question.category.as_str()).or_default() += 1;
    }
    counts
        .iter()
        .map(|(category, count)| format!("{} {}", category, count))
        .collect::<Vec<_>>()
        .join(", ")
}

fn topic_count(questions: &[Question]) -> usize {
    let mut topics: Vec<&str> = questions.iter().map(|q| q.topic.as_str()).collect();
    topics.dedup();
    topics.len()
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_text("señal", 3), "señ...");
        assert_eq!(truncate_text("pare", 10), "pare");
    }

    fn question(id: &str, category: &str, topic: &str) -> Question {
        Question {
            id: id.to_string(),
            topic: topic.to_string(),
            category: Category::normalize(category).unwrap(),
            prompt: "¿...?".to_string(),
            alternatives: [
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "d".to_string(),
            ],
            answer_token: "YQ==".to_string(),
            image: None,
            rationale: None,
        }
    }

    #[test]
    fn alias_exam_is_counted_by_drawn_pool() {
        let exam = vec![
            question("q1", "BIIA", "Normas"),
            question("q2", "BIIA", "Normas"),
            question("q3", "BIIA", "Señales"),
        ];
        assert_eq!(composition(&exam), "BIIA 3");
        assert_eq!(topic_count(&exam), 2);

        let split = vec![question("q1", "AI", "Normas"), question("q2", "AIIB", "Normas")];
        assert_eq!(composition(&split), "AI 1, AIIB 1");
        log_exam_summary(&Category::normalize("BIIB").unwrap(), &exam);
    }

    #[test]
    fn init_twice_is_harmless() {
        init(false);
        init(true);
    }
}
