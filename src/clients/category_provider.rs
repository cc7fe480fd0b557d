/// 用户会话上下文接口
///
/// 提供当前用户的考试类别，本层不负责身份识别
use async_trait::async_trait;

use crate::error::AppResult;

#[async_trait]
pub trait CategoryProvider: Send + Sync {
    /// 当前用户的考试类别，无法确定时返回 None
    async fn active_category(&self) -> AppResult<Option<String>>;
}

/// 固定类别（来自配置或测试）
#[derive(Debug, Clone, Default)]
pub struct StaticCategoryProvider {
    category: Option<String>,
}

impl StaticCategoryProvider {
    pub fn new(category: Option<String>) -> Self {
        Self { category }
    }
}

#[async_trait]
impl CategoryProvider for StaticCategoryProvider {
    async fn active_category(&self) -> AppResult<Option<String>> {
        Ok(self
            .category
            .as_ref()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()))
    }
}
