//! 题库变更订阅 - 业务能力层
//!
//! 首次调用时全量读取远程题库写入缓存，之后每收到一次远程变更
//! 就重新全量读取并整体替换缓存，然后通知回调。
//!
//! 同一时刻只有一个订阅，新订阅会先取消旧订阅。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::clients::{ChangeStream, QuestionRepository};
use crate::error::AppResult;
use crate::models::{CorpusSnapshot, Question};
use crate::services::answer_codec::AnswerCodec;
use crate::services::cache_store::CorpusCacheStore;

/// 订阅句柄
///
/// `cancel()` 可重复调用，第二次起为空操作。丢弃句柄不会取消订阅。
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    id: u64,
    token: CancellationToken,
}

impl SubscriptionHandle {
    fn new(id: u64) -> Self {
        Self {
            id,
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// 取消订阅
    pub fn cancel(&self) {
        if self.token.is_cancelled() {
            return;
        }
        self.token.cancel();
        info!("🔕 已取消题库订阅 #{}", self.id);
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// 题库变更订阅器
///
/// 唯一会写入快照的组件。
pub struct ChangeFeedSubscriber {
    repository: Arc<dyn QuestionRepository>,
    cache: CorpusCacheStore,
    codec: AnswerCodec,
    active: Mutex<Option<SubscriptionHandle>>,
    next_id: AtomicU64,
    latest_generation: Arc<AtomicU64>,
}

impl ChangeFeedSubscriber {
    pub fn new(
        repository: Arc<dyn QuestionRepository>,
        cache: CorpusCacheStore,
        codec: AnswerCodec,
    ) -> Self {
        Self {
            repository,
            cache,
            codec,
            active: Mutex::new(None),
            next_id: AtomicU64::new(1),
            latest_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn active_slot(&self) -> MutexGuard<'_, Option<SubscriptionHandle>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 全量读取并订阅远程变更
    ///
    /// 返回订阅句柄和刚写入缓存的快照。之后每次远程变更都会整体替换快照并调用 `on_change`。
    pub async fn fetch_and_subscribe<F>(
        &self,
        on_change: F,
    ) -> AppResult<(SubscriptionHandle, CorpusSnapshot)>
    where
        F: Fn(&CorpusSnapshot) + Send + Sync + 'static,
    {
        self.cancel_active();

        // 先订阅再读取，读取期间发生的变更不会丢失
        let stream = self.repository.subscribe().await?;
        let snapshot = refresh(
            self.repository.as_ref(),
            &self.cache,
            &self.codec,
            &self.latest_generation,
        )
        .await?;

        let handle = SubscriptionHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        info!(
            "🔔 已订阅题库 {} (订阅 #{}, 当前第 {} 代, {} 道题目)",
            self.repository.name(),
            handle.id,
            snapshot.generation,
            snapshot.len()
        );

        tokio::spawn(run_feed(
            self.repository.clone(),
            self.cache.clone(),
            self.codec,
            self.latest_generation.clone(),
            stream,
            handle.clone(),
            on_change,
        ));

        *self.active_slot() = Some(handle.clone());
        Ok((handle, snapshot))
    }

    /// 取消当前订阅（如果有）
    pub fn cancel_active(&self) {
        if let Some(handle) = self.active_slot().take() {
            handle.cancel();
        }
    }

    /// 当前仍然有效的订阅
    pub fn active(&self) -> Option<SubscriptionHandle> {
        self.active_slot()
            .as_ref()
            .filter(|handle| !handle.is_cancelled())
            .cloned()
    }
}

/// 后台任务：等待变更事件，全量刷新缓存
async fn run_feed<F>(
    repository: Arc<dyn QuestionRepository>,
    cache: CorpusCacheStore,
    codec: AnswerCodec,
    latest_generation: Arc<AtomicU64>,
    mut stream: ChangeStream,
    handle: SubscriptionHandle,
    on_change: F,
) where
    F: Fn(&CorpusSnapshot) + Send + Sync + 'static,
{
    let token = handle.token.clone();

    loop {
        let event = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            event = stream.recv() => event,
        };

        let Some(event) = event else {
            warn!("⚠️ 题库变更流已关闭 (订阅 #{})", handle.id);
            break;
        };

        info!(
            "🔄 检测到题库变更 {:?} {}，正在刷新缓存",
            event.kind,
            event.question_id.as_deref().unwrap_or("-")
        );

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = refresh(repository.as_ref(), &cache, &codec, &latest_generation) => result,
        };

        match result {
            Ok(snapshot) => on_change(&snapshot),
            Err(e) => error!("❌ 刷新题库缓存失败，保留旧快照: {}", e),
        }
    }

    debug!("订阅 #{} 的后台任务结束", handle.id);
}

/// 全量读取远程题库，编码答案后整体写入缓存
///
/// 版本号取缓存中的版本与本进程见过的最大版本中较大者加一，缓存失效后也不会回退。
async fn refresh(
    repository: &dyn QuestionRepository,
    cache: &CorpusCacheStore,
    codec: &AnswerCodec,
    latest_generation: &AtomicU64,
) -> AppResult<CorpusSnapshot> {
    let records = repository.fetch_all().await?;
    let total = records.len();

    let questions: Vec<Question> = records
        .into_iter()
        .filter_map(|record| {
            let id = record.id.clone();
            let token = codec.encode(&record.answer);
            let question = record.into_question(token);
            if question.is_none() {
                warn!("⚠️ 题目 {} 缺少类别，已忽略", id);
            }
            question
        })
        .collect();

    let previous = match cache.read().await {
        Ok(snapshot) => snapshot.map(|s| s.generation).unwrap_or(0),
        Err(e) => {
            warn!("⚠️ 旧缓存不可读，版本号从头开始: {}", e);
            0
        }
    };

    let generation = previous.max(latest_generation.load(Ordering::SeqCst)) + 1;
    let snapshot = CorpusSnapshot::new(generation, questions);
    if snapshot.len() < total {
        debug!("{} 道题目中有 {} 道被忽略", total, total - snapshot.len());
    }
    for (category, count) in snapshot.category_counts() {
        debug!("  类别 {}: {} 道", category, count);
    }

    cache.write(&snapshot).await?;
    latest_generation.fetch_max(generation, Ordering::SeqCst);
    Ok(snapshot)
}
