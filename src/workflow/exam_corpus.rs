//! 考试题库门面 - 流程层
//!
//! 其他子系统唯一调用的入口。
//!
//! 流程顺序：
//! 1. 读缓存（未命中或已损坏 → 全量读取并订阅）
//! 2. 有本类别的考试顺序记录 → 按原顺序还原
//! 3. 否则按配额抽题 → 记录顺序
//!
//! 答案只在校验时经过解码。

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::clients::{CategoryProvider, QuestionRepository};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::KeyValueStore;
use crate::models::{Category, CorpusSnapshot, Question, QuotaRules};
use crate::services::{
    AnswerCodec, ChangeFeedSubscriber, CorpusCacheStore, QuotaSampler, SessionOrderLedger,
    SubscriptionHandle,
};
use crate::utils::logging::log_exam_summary;

/// 考试题库门面
///
/// - 缓存优先，未命中时才访问远程题库
/// - 持有唯一的订阅句柄，`teardown` 或丢弃时取消
/// - 只读快照，从不写入
pub struct ExamCorpus {
    cache: CorpusCacheStore,
    ledger: SessionOrderLedger,
    sampler: QuotaSampler,
    feed: ChangeFeedSubscriber,
    codec: AnswerCodec,
    subscription: Mutex<Option<SubscriptionHandle>>,
    generation: Arc<watch::Sender<u64>>,
}

impl ExamCorpus {
    /// 创建门面
    pub fn new(
        config: &Config,
        rules: QuotaRules,
        repository: Arc<dyn QuestionRepository>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let codec = AnswerCodec::new();
        let cache = CorpusCacheStore::new(store.clone());
        let (generation, _) = watch::channel(0);

        Self {
            feed: ChangeFeedSubscriber::new(repository, cache.clone(), codec),
            ledger: SessionOrderLedger::new(store),
            sampler: QuotaSampler::new(rules, config.quota_size),
            cache,
            codec,
            subscription: Mutex::new(None),
            generation: Arc::new(generation),
        }
    }

    fn subscription_slot(&self) -> MutexGuard<'_, Option<SubscriptionHandle>> {
        self.subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 门面观察到的最新快照版本号
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    /// 当前是否有有效的远程订阅
    pub fn is_subscribed(&self) -> bool {
        self.subscription_slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_cancelled())
    }

    /// 获取某类别的考试题目
    ///
    /// 同一场考试内重复调用得到相同的题目和顺序。
    pub async fn get_exam_questions(&self, category: &str) -> AppResult<Vec<Question>> {
        let category = Category::normalize(category).ok_or(AppError::NoActiveCategory)?;
        let snapshot = self.load_snapshot().await?;

        if let Some(entry) = self.ledger.current_order().await? {
            if entry.category == category {
                let restored = resolve_order(&snapshot, &entry.question_ids);
                if !restored.is_empty() {
                    info!(
                        "♻️ 还原类别 {} 的考试 ({}/{} 道题目)",
                        category,
                        restored.len(),
                        entry.question_ids.len()
                    );
                    return Ok(restored);
                }
                warn!("⚠️ 考试记录中的题目已全部不存在，重新抽题");
            } else {
                info!(
                    "考试记录属于类别 {}，为类别 {} 开始新考试",
                    entry.category, category
                );
            }
        }

        self.sample_and_persist(&snapshot, &category).await
    }

    /// 按当前用户的类别获取考试题目
    pub async fn get_exam_questions_for_user(
        &self,
        provider: &dyn CategoryProvider,
    ) -> AppResult<Vec<Question>> {
        let category = provider
            .active_category()
            .await?
            .ok_or(AppError::NoActiveCategory)?;
        self.get_exam_questions(&category).await
    }

    /// 开始新的一次考试（丢弃旧的顺序记录并重新抽题）
    pub async fn start_new_exam(&self, category: &str) -> AppResult<Vec<Question>> {
        let category = Category::normalize(category).ok_or(AppError::NoActiveCategory)?;
        self.ledger.clear().await?;
        let snapshot = self.load_snapshot().await?;
        self.sample_and_persist(&snapshot, &category).await
    }

    /// 考试的第一道题
    pub async fn initial_question(&self, category: &str) -> AppResult<Option<Question>> {
        Ok(self.get_exam_questions(category).await?.into_iter().next())
    }

    /// 校验答案
    ///
    /// 比较用户选项的首字母（不区分大小写）。令牌损坏时视为答错。
    pub fn check_answer(&self, question: &Question, user_choice: &str) -> bool {
        let marker = match self.codec.decode(&question.answer_token) {
            Ok(marker) => marker,
            Err(e) => {
                warn!("⚠️ 题目 {} 无法校验: {}", question.id, e);
                return false;
            }
        };

        match (first_letter(&marker), first_letter(user_choice)) {
            (Some(expected), Some(chosen)) => expected == chosen,
            _ => false,
        }
    }

    /// 按 id 从当前快照重新解析题目后校验答案
    pub async fn verify_answer(&self, question_id: &str, user_choice: &str) -> AppResult<bool> {
        let snapshot = self.load_snapshot().await?;
        match snapshot.find(question_id) {
            Some(question) => Ok(self.check_answer(question, user_choice)),
            None => {
                warn!("⚠️ 题目 {} 已不在题库中，无法校验", question_id);
                Ok(false)
            }
        }
    }

    /// 计算得分（百分制，保留两位小数）
    ///
    /// # 参数
    /// - `questions`: 本次考试的题目
    /// - `answers`: 题目 id → 用户选项
    pub fn score(&self, questions: &[Question], answers: &HashMap<String, String>) -> f64 {
        if questions.is_empty() {
            return 0.0;
        }

        let correct = questions
            .iter()
            .filter(|q| {
                answers
                    .get(&q.id)
                    .is_some_and(|choice| self.check_answer(q, choice))
            })
            .count();

        let score = correct as f64 / questions.len() as f64 * 100.0;
        (score * 100.0).round() / 100.0
    }

    /// 结束考试，清除顺序记录
    pub async fn finish_exam(&self) -> AppResult<()> {
        self.ledger.clear().await?;
        info!("🏁 考试结束，已清除顺序记录");
        Ok(())
    }

    /// 使本地缓存失效，下次调用会重新拉取
    pub async fn invalidate_cache(&self) -> AppResult<()> {
        self.cache.invalidate().await
    }

    /// 取消远程订阅，可重复调用
    pub fn teardown(&self) {
        if let Some(handle) = self.subscription_slot().take() {
            handle.cancel();
        }
        self.feed.cancel_active();
    }

    /// 读取快照：缓存命中直接返回，未命中或损坏时全量读取并订阅
    async fn load_snapshot(&self) -> AppResult<CorpusSnapshot> {
        match self.cache.read().await {
            Ok(Some(snapshot)) => return Ok(snapshot),
            Ok(None) => debug!("缓存为空，从远程题库读取"),
            Err(e) if e.is_corrupt_cache() => {
                warn!("⚠️ 本地缓存已损坏，重新拉取: {}", e);
                self.cache.invalidate().await?;
            }
            Err(e) => return Err(e),
        }

        let generation = self.generation.clone();
        let (handle, snapshot) = self
            .feed
            .fetch_and_subscribe(move |snapshot| {
                publish_generation(&generation, snapshot.generation);
            })
            .await?;
        *self.subscription_slot() = Some(handle);

        publish_generation(&self.generation, snapshot.generation);
        Ok(snapshot)
    }

    async fn sample_and_persist(
        &self,
        snapshot: &CorpusSnapshot,
        category: &Category,
    ) -> AppResult<Vec<Question>> {
        let exam = {
            let mut rng = StdRng::from_entropy();
            self.sampler.sample(snapshot, category, &mut rng)
        };

        if exam.is_empty() {
            warn!("⚠️ 类别 {} 没有可抽取的题目", category);
            return Err(AppError::empty_category(category.as_str()));
        }

        let ids: Vec<String> = exam.iter().map(|q| q.id.clone()).collect();
        self.ledger.persist(category, &ids).await?;
        log_exam_summary(category, &exam);

        Ok(exam)
    }
}

impl Drop for ExamCorpus {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// 按记录的顺序从快照中取回题目，已删除的题目跳过
fn resolve_order(snapshot: &CorpusSnapshot, ids: &[String]) -> Vec<Question> {
    let by_id: HashMap<&str, &Question> = snapshot
        .questions
        .iter()
        .map(|q| (q.id.as_str(), q))
        .collect();

    let mut seen = HashSet::new();
    let mut restored = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id.as_str()) {
            continue;
        }
        match by_id.get(id.as_str()) {
            Some(question) => restored.push((*question).clone()),
            None => warn!("⚠️ 题目 {} 已从题库删除，跳过", id),
        }
    }
    restored
}

/// 只向前推进版本号，后台刷新先到时不会被初始快照覆盖
fn publish_generation(sender: &watch::Sender<u64>, generation: u64) {
    sender.send_if_modified(|current| {
        if generation > *current {
            *current = generation;
            true
        } else {
            false
        }
    });
}

fn first_letter(text: &str) -> Option<char> {
    text.trim().chars().next().map(|c| c.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, token: &str) -> Question {
        Question {
            id: id.to_string(),
            topic: "Normas".to_string(),
            category: Category::normalize("AI").unwrap(),
            prompt: "¿...?".to_string(),
            alternatives: [
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "d".to_string(),
            ],
            answer_token: token.to_string(),
            image: None,
            rationale: None,
        }
    }

    #[test]
    fn resolve_keeps_order_and_skips_missing() {
        let snapshot = CorpusSnapshot::new(
            1,
            vec![question("q1", ""), question("q2", ""), question("q3", "")],
        );
        let ids: Vec<String> = ["q3", "gone", "q1", "q3"].iter().map(|s| s.to_string()).collect();
        let restored: Vec<String> = resolve_order(&snapshot, &ids)
            .into_iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(restored, vec!["q3", "q1"]);
    }

    #[test]
    fn generation_never_moves_backwards() {
        let (sender, mut receiver) = watch::channel(0);
        publish_generation(&sender, 2);
        assert!(receiver.has_changed().unwrap());
        assert_eq!(*receiver.borrow_and_update(), 2);

        publish_generation(&sender, 1);
        publish_generation(&sender, 2);
        assert!(!receiver.has_changed().unwrap());
        assert_eq!(*receiver.borrow(), 2);
    }

    #[test]
    fn first_letter_is_case_insensitive() {
        assert_eq!(first_letter(" B) Ceda"), Some('b'));
        assert_eq!(first_letter(""), None);
    }
}
