use crate::error::{AppError, AppResult};

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 本地持久化目录（语料快照与考试顺序）
    pub cache_dir: String,
    /// 本地题库 TOML 文件
    pub corpus_file: String,
    /// 配额规则 TOML 文件，不设置时使用内置规则
    pub quota_rules_file: Option<String>,
    /// 每次考试抽取的题目数量
    pub quota_size: usize,
    /// 文件题库的变更轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 当前会话的考试类别（由上层会话提供）
    pub exam_category: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: ".exam_cache".to_string(),
            corpus_file: "questionnaire.toml".to_string(),
            quota_rules_file: None,
            quota_size: 40,
            poll_interval_ms: 2000,
            exam_category: None,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            cache_dir: std::env::var("CACHE_DIR").unwrap_or(default.cache_dir),
            corpus_file: std::env::var("CORPUS_FILE").unwrap_or(default.corpus_file),
            quota_rules_file: std::env::var("QUOTA_RULES_FILE").ok().or(default.quota_rules_file),
            quota_size: std::env::var("QUOTA_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.quota_size),
            poll_interval_ms: std::env::var("POLL_INTERVAL_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.poll_interval_ms),
            exam_category: std::env::var("EXAM_CATEGORY").ok().or(default.exam_category),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }

    /// 校验配置取值
    pub fn validate(&self) -> AppResult<()> {
        if self.quota_size == 0 {
            return Err(AppError::invalid_config("QUOTA_SIZE", self.quota_size, "必须大于 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(AppError::invalid_config(
                "POLL_INTERVAL_MS",
                self.poll_interval_ms,
                "必须大于 0",
            ));
        }
        Ok(())
    }
}
