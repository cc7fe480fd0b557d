use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::category::Category;

/// 缺失主题时使用的占位主题
pub const UNSPECIFIED_TOPIC: &str = "unspecified";

/// 远程题库返回的原始题目记录
///
/// 答案为明文，主题和类别可能缺失或未规范化。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default)]
    pub category: String,
    pub prompt: String,
    pub alternatives: [String; 4],
    /// 正确答案标记（明文，例如 "a"）
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// 答案依据
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl QuestionRecord {
    /// 转换为缓存中的题目
    ///
    /// `answer_token` 为编码后的答案；类别规范化后为空时返回 None。
    pub fn into_question(self, answer_token: String) -> Option<Question> {
        let category = Category::normalize(&self.category)?;
        let topic = self
            .topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNSPECIFIED_TOPIC.to_string());

        Some(Question {
            id: self.id,
            topic,
            category,
            prompt: self.prompt,
            alternatives: self.alternatives,
            answer_token,
            image: self.image.filter(|i| !i.trim().is_empty()),
            rationale: self.rationale,
        })
    }
}

/// 缓存中的题目
///
/// 答案以编码令牌形式保存，抽题器只读不写。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub topic: String,
    pub category: Category,
    pub prompt: String,
    pub alternatives: [String; 4],
    pub answer_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl Question {
    /// 图片文件名
    ///
    /// 图片引用形如 `"12.senal.png"`，去掉开头的序号部分。
    pub fn image_file_name(&self) -> Option<String> {
        let image = self.image.as_deref()?;
        let (_, file_name) = image.split_once('.')?;
        let file_name = file_name.trim();
        if file_name.is_empty() {
            None
        } else {
            Some(file_name.to_string())
        }
    }

    /// 是否有选项是图片
    pub fn has_image_alternative(&self) -> bool {
        self.alternatives.iter().any(|a| is_image_alternative(a))
    }
}

/// 选项文本是否为图片引用
pub fn is_image_alternative(alternative: &str) -> bool {
    alternative.to_lowercase().ends_with(".png")
}

/// 题库快照
///
/// 每次远程变更都整体替换，从不增量修补。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusSnapshot {
    /// 版本号，每次刷新加一
    pub generation: u64,
    /// 最近一次刷新时间
    pub refreshed_at: DateTime<Utc>,
    pub questions: Vec<Question>,
}

impl CorpusSnapshot {
    pub fn new(generation: u64, questions: Vec<Question>) -> Self {
        Self {
            generation,
            refreshed_at: Utc::now(),
            questions,
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// 按 id 查找题目
    pub fn find(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// 每个类别的题目数量
    pub fn category_counts(&self) -> BTreeMap<&Category, usize> {
        let mut counts = BTreeMap::new();
        for question in &self.questions {
            *counts.entry(&question.category).or_insert(0) += 1;
        }
        counts
    }
}
