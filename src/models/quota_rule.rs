//! 配额规则
//!
//! 类别 → 抽题策略的静态映射，运行期不可修改。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::category::Category;

/// 拆分类别族：一半来自本类别，一半来自基础类别
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitFamily {
    pub base: Category,
    pub members: Vec<Category>,
}

/// 配额规则表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaRules {
    /// 别名类别 → 实际抽题的类别
    #[serde(default)]
    pub aliases: BTreeMap<Category, Category>,
    #[serde(default)]
    pub split: Vec<SplitFamily>,
}

/// 类别所属的抽题策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryClass<'a> {
    /// 普通类别：本类别不足时从其他类别补足
    Baseline,
    /// 别名类别：全部题目来自指定类别
    Alias { pool: &'a Category },
    /// 拆分类别：一半本类别（不足时用基础类别补足），一半基础类别
    Split { base: &'a Category },
}

impl QuotaRules {
    /// 判断类别的抽题策略
    pub fn classify(&self, category: &Category) -> CategoryClass<'_> {
        if let Some(pool) = self.aliases.get(category) {
            return CategoryClass::Alias { pool };
        }

        self.split
            .iter()
            .find(|family| family.members.contains(category))
            .map(|family| CategoryClass::Split { base: &family.base })
            .unwrap_or(CategoryClass::Baseline)
    }
}

impl Default for QuotaRules {
    fn default() -> Self {
        let aliases = [("BIIB", "BIIA"), ("BIIC", "BIIA")]
            .iter()
            .filter_map(|(alias, pool)| {
                Some((Category::normalize(alias)?, Category::normalize(pool)?))
            })
            .collect();

        let split = Category::normalize("AI")
            .map(|base| SplitFamily {
                base,
                members: ["AIIA", "AIIB", "AIIIA", "AIIIB", "AIIIC"]
                    .iter()
                    .filter_map(|name| Category::normalize(name))
                    .collect(),
            })
            .into_iter()
            .collect();

        Self { aliases, split }
    }
}
