pub mod toml_loader;

pub use toml_loader::{load_corpus_file, load_quota_rules};
