use crate::clients::{StaticCategoryProvider, TomlFileRepository};
use crate::config::Config;
use crate::infrastructure::FileKvStore;
use crate::models::{load_quota_rules, QuotaRules};
use crate::utils::logging::{log_startup, truncate_text};
use crate::workflow::ExamCorpus;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 应用主结构
///
/// 把文件题库、本地缓存目录和配置中的考试类别接到门面上，
/// 用于在本地跑一遍抽题流程。
pub struct App {
    corpus: ExamCorpus,
    provider: StaticCategoryProvider,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;
        log_startup(&config);

        let rules = match &config.quota_rules_file {
            Some(path) => load_quota_rules(Path::new(path)).await?,
            None => QuotaRules::default(),
        };

        let repository = Arc::new(TomlFileRepository::new(
            &config.corpus_file,
            Duration::from_millis(config.poll_interval_ms),
        ));
        let store = Arc::new(FileKvStore::new(&config.cache_dir));
        let corpus = ExamCorpus::new(&config, rules, repository, store);

        Ok(Self {
            corpus,
            provider: StaticCategoryProvider::new(config.exam_category.clone()),
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let questions = self
            .corpus
            .get_exam_questions_for_user(&self.provider)
            .await
            .context("无法生成考试题目")?;

        for (index, question) in questions.iter().enumerate() {
            let marker = if question.has_image_alternative() || question.image.is_some() {
                " 🖼️"
            } else {
                ""
            };
            info!(
                "{:>2}. [{}] {}{}",
                index + 1,
                question.topic,
                truncate_text(&question.prompt, 60),
                marker
            );
        }

        self.corpus.teardown();
        Ok(())
    }
}
