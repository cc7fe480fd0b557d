use phf::phf_map;
use serde::{Deserialize, Serialize};

/// 规范类别名 → 带连字符的展示名
static HYPHENATED: phf::Map<&'static str, &'static str> = phf_map! {
    "AI" => "A-I",
    "AIIA" => "AII-A",
    "AIIB" => "AII-B",
    "AIIIA" => "AIII-A",
    "AIIIB" => "AIII-B",
    "AIIIC" => "AIII-C",
    "BIIA" => "BII-A",
    "BIIB" => "BII-B",
    "BIIC" => "BII-C",
};

/// 考试类别（驾照等级）
///
/// 内部统一使用规范形式：大写字母数字，去掉连字符与空白。
/// `"B-II-B"`、`"bii-b"`、`"BII B"` 都规范为 `"BIIB"`。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Category(String);

impl Category {
    /// 规范化类别名，规范化后为空时返回 None
    pub fn normalize(raw: &str) -> Option<Self> {
        let canonical: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if canonical.is_empty() {
            None
        } else {
            Some(Self(canonical))
        }
    }

    /// 规范形式
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 带连字符的形式，未知类别原样返回
    pub fn hyphenated(&self) -> &str {
        HYPHENATED.get(self.0.as_str()).copied().unwrap_or(self.0.as_str())
    }

    /// 展示名，例如 `AI` → `(A) I`，`BIIB` → `(B) IIb`
    pub fn display_name(&self) -> String {
        let name = self.0.as_str();
        if name == "AI" {
            return "(A) I".to_string();
        }
        if name.len() < 3 {
            return name.to_string();
        }

        let letter = &name[..1];
        let roman = &name[1..name.len() - 1];
        let last = name[name.len() - 1..].to_ascii_lowercase();
        format!("({}) {}{}", letter, roman, last)
    }
}

impl TryFrom<String> for Category {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::normalize(&raw).ok_or_else(|| format!("无效的类别: '{}'", raw))
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.0
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_separators_and_case() {
        for raw in ["B-II-B", "bii-b", "BII B", "BIIB", " BII-B "] {
            assert_eq!(Category::normalize(raw).unwrap().as_str(), "BIIB");
        }
        assert!(Category::normalize(" - ").is_none());
        assert!(Category::normalize("").is_none());
    }

    #[test]
    fn hyphenated_form() {
        assert_eq!(Category::normalize("AI").unwrap().hyphenated(), "A-I");
        assert_eq!(Category::normalize("aiiic").unwrap().hyphenated(), "AIII-C");
        assert_eq!(Category::normalize("X").unwrap().hyphenated(), "X");
    }

    #[test]
    fn deserialize_normalizes() {
        let category: Category = serde_json::from_str("\"bii-c\"").unwrap();
        assert_eq!(category.as_str(), "BIIC");
        assert!(serde_json::from_str::<Category>("\"-\"").is_err());
        assert_eq!(serde_json::to_string(&category).unwrap(), "\"BIIC\"");
    }

    #[test]
    fn display_name() {
        assert_eq!(Category::normalize("AI").unwrap().display_name(), "(A) I");
        assert_eq!(Category::normalize("BIIB").unwrap().display_name(), "(B) IIb");
        assert_eq!(Category::normalize("AIIIC").unwrap().display_name(), "(A) IIIc");
        assert_eq!(Category::normalize("B").unwrap().display_name(), "B");
    }
}
