use thiserror::Error;

/// 应用程序错误类型
///
/// 每一种失败都是独立可区分的分支，调用方可以据此区分
/// "网络不可用"、"该用户没有题目" 与 "本地缓存损坏"。
#[derive(Debug, Error)]
pub enum AppError {
    /// 远程题库读取或订阅失败（本层不重试，由调用方决定策略）
    #[error("题库仓库不可用: {0}")]
    RepositoryUnavailable(#[from] RepositoryError),
    /// 抽题结果为空
    #[error("类别 {category} 没有可抽取的题目")]
    EmptyCategory { category: String },
    /// 答案令牌损坏，无法校验
    #[error("答案令牌损坏: '{token}'")]
    CorruptToken { token: String },
    /// 无法确定当前用户的考试类别
    #[error("无法确定当前用户的考试类别")]
    NoActiveCategory,
    /// 本地存储错误
    #[error("本地存储错误: {0}")]
    Storage(#[from] StorageError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 远程题库错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// 全量读取失败
    #[error("读取题库失败 ({source_name}): {source}")]
    FetchFailed {
        source_name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 建立变更订阅失败
    #[error("订阅题库变更失败 ({source_name}): {source}")]
    SubscribeFailed {
        source_name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 仓库当前不可达
    #[error("题库暂时不可达: {reason}")]
    Offline { reason: String },
}

/// 本地存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 读取失败
    #[error("读取键 {key} 失败: {source}")]
    ReadFailed {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入失败
    #[error("写入键 {key} 失败: {source}")]
    WriteFailed {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 删除失败
    #[error("删除键 {key} 失败: {source}")]
    DeleteFailed {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 已存数据无法解析（缓存损坏）
    #[error("键 {key} 的数据已损坏: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// JSON 序列化失败
    #[error("JSON 序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置项取值非法
    #[error("配置项 {name} 取值非法: '{value}' ({reason})")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Storage(StorageError::Serialize(err))
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Storage(StorageError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: err,
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建题库读取失败错误
    pub fn repository_fetch_failed(
        source_name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        AppError::RepositoryUnavailable(RepositoryError::FetchFailed {
            source_name: source_name.into(),
            source: source.into(),
        })
    }

    /// 创建题库订阅失败错误
    pub fn repository_subscribe_failed(
        source_name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        AppError::RepositoryUnavailable(RepositoryError::SubscribeFailed {
            source_name: source_name.into(),
            source: source.into(),
        })
    }

    /// 创建题库离线错误
    pub fn repository_offline(reason: impl Into<String>) -> Self {
        AppError::RepositoryUnavailable(RepositoryError::Offline {
            reason: reason.into(),
        })
    }

    /// 创建类别为空错误
    pub fn empty_category(category: impl Into<String>) -> Self {
        AppError::EmptyCategory {
            category: category.into(),
        }
    }

    /// 创建答案令牌损坏错误
    pub fn corrupt_token(token: impl Into<String>) -> Self {
        AppError::CorruptToken {
            token: token.into(),
        }
    }

    /// 创建配置取值非法错误
    pub fn invalid_config(
        name: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        AppError::Config(ConfigError::InvalidValue {
            name: name.into(),
            value: value.to_string(),
            reason: reason.into(),
        })
    }

    /// 是否是本地缓存损坏（应当使缓存失效并强制重新拉取）
    pub fn is_corrupt_cache(&self) -> bool {
        matches!(self, AppError::Storage(StorageError::Corrupt { .. }))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_storage_is_detected() {
        let source = serde_json::from_str::<u32>("not json").unwrap_err();
        let err = AppError::Storage(StorageError::Corrupt {
            key: "cachedQuestions".to_string(),
            source,
        });
        assert!(err.is_corrupt_cache());
        assert!(!AppError::NoActiveCategory.is_corrupt_cache());
    }

    #[test]
    fn repository_errors_convert_into_unavailable() {
        let err: AppError = RepositoryError::Offline {
            reason: "断网".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::RepositoryUnavailable(_)));
        assert!(err.to_string().contains("断网"));
    }

    #[test]
    fn repository_constructors_keep_source_name() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = AppError::repository_subscribe_failed("toml:corpus.toml", io);
        assert!(matches!(
            err,
            AppError::RepositoryUnavailable(RepositoryError::SubscribeFailed { ref source_name, .. })
                if source_name == "toml:corpus.toml"
        ));

        let err = AppError::repository_fetch_failed("toml:corpus.toml", anyhow::anyhow!("坏文件"));
        assert!(err.to_string().contains("坏文件"));
    }
}
