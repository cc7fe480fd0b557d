//! 配额抽题 - 业务能力层
//!
//! 从快照中按类别策略抽出固定数量的题目，再按主题分组排序。
//!
//! 两个步骤互相独立：
//! - `draw`：随机、不放回地抽取
//! - `arrange_by_topic`：按主题名升序分组，确定性
//!
//! 抽题器只读快照，从不修改题目。

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::models::{Category, CategoryClass, CorpusSnapshot, Question, QuotaRules};

/// 从候选题目中随机、不放回地抽取最多 `count` 道
///
/// 返回顺序即抽取顺序。
pub fn draw<'a, R, I>(pool: I, count: usize, rng: &mut R) -> Vec<&'a Question>
where
    R: Rng + ?Sized,
    I: IntoIterator<Item = &'a Question>,
{
    let mut candidates: Vec<&Question> = pool.into_iter().collect();
    let (chosen, _) = candidates.partial_shuffle(rng, count);
    chosen.to_vec()
}

/// 按主题分组，主题名升序排列后展开
///
/// 同一主题内保持原有顺序。
pub fn arrange_by_topic(questions: Vec<Question>) -> Vec<Question> {
    let mut groups: BTreeMap<String, Vec<Question>> = BTreeMap::new();
    for question in questions {
        groups
            .entry(question.topic.clone())
            .or_default()
            .push(question);
    }
    groups.into_values().flatten().collect()
}

/// 配额抽题器
#[derive(Debug, Clone)]
pub struct QuotaSampler {
    rules: QuotaRules,
    quota_size: usize,
}

impl QuotaSampler {
    pub fn new(rules: QuotaRules, quota_size: usize) -> Self {
        Self { rules, quota_size }
    }

    /// 为类别抽出一套考试题目
    ///
    /// 题目不足时结果可能少于配额；没有任何可抽题目时返回空列表。
    pub fn sample<R: Rng + ?Sized>(
        &self,
        corpus: &CorpusSnapshot,
        category: &Category,
        rng: &mut R,
    ) -> Vec<Question> {
        let drawn = match self.rules.classify(category) {
            CategoryClass::Baseline => self.draw_baseline(corpus, category, rng),
            CategoryClass::Alias { pool } => {
                debug!("类别 {} 使用别名题库 {}", category, pool);
                draw(pool_of(corpus, pool), self.quota_size, rng)
            }
            CategoryClass::Split { base } => self.draw_split(corpus, category, base, rng),
        };

        debug!(
            "类别 {} 抽取 {}/{} 道题目 (题库共 {} 道)",
            category,
            drawn.len(),
            self.quota_size,
            corpus.len()
        );

        arrange_by_topic(drawn.into_iter().cloned().collect())
    }

    /// 本类别优先，不足时从其他所有类别补足
    ///
    /// 题库中完全没有本类别的题目时返回空列表，不用其他类别凑数。
    fn draw_baseline<'a, R: Rng + ?Sized>(
        &self,
        corpus: &'a CorpusSnapshot,
        category: &Category,
        rng: &mut R,
    ) -> Vec<&'a Question> {
        let mut selected = draw(pool_of(corpus, category), self.quota_size, rng);
        if selected.is_empty() {
            debug!("题库中没有类别 {} 的题目", category);
            return selected;
        }

        let missing = self.quota_size.saturating_sub(selected.len());
        if missing > 0 {
            let others = corpus.questions.iter().filter(|q| &q.category != category);
            let fill = draw(others, missing, rng);
            debug!(
                "类别 {} 只有 {} 道题目，从其他类别补充 {} 道",
                category,
                selected.len(),
                fill.len()
            );
            selected.extend(fill);
        }

        selected
    }

    /// 一半本类别（不足时用基础类别补足），一半基础类别
    fn draw_split<'a, R: Rng + ?Sized>(
        &self,
        corpus: &'a CorpusSnapshot,
        category: &Category,
        base: &Category,
        rng: &mut R,
    ) -> Vec<&'a Question> {
        let own_quota = self.quota_size / 2;
        let base_quota = self.quota_size - own_quota;

        let mut selected = draw(pool_of(corpus, category), own_quota, rng);
        let missing = own_quota.saturating_sub(selected.len());
        if missing > 0 {
            debug!(
                "类别 {} 只有 {} 道题目，从基础类别 {} 补充",
                category,
                selected.len(),
                base
            );
            selected.extend(draw(pool_of(corpus, base), missing, rng));
        }

        let taken: HashSet<&str> = selected.iter().map(|q| q.id.as_str()).collect();
        let base_pool = pool_of(corpus, base).filter(|q| !taken.contains(q.id.as_str()));
        let base_part = draw(base_pool, base_quota, rng);
        selected.extend(base_part);

        selected
    }
}

fn pool_of<'a>(
    corpus: &'a CorpusSnapshot,
    category: &Category,
) -> impl Iterator<Item = &'a Question> + 'a {
    let category = category.clone();
    corpus
        .questions
        .iter()
        .filter(move |q| q.category == category)
}
