pub mod category;
pub mod loaders;
pub mod question;
pub mod quota_rule;

pub use category::Category;
pub use loaders::{load_corpus_file, load_quota_rules};
pub use question::{is_image_alternative, CorpusSnapshot, Question, QuestionRecord, UNSPECIFIED_TOPIC};
pub use quota_rule::{CategoryClass, QuotaRules, SplitFamily};
