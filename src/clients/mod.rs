pub mod category_provider;
pub mod question_repository;
pub mod toml_repository;

pub use category_provider::{CategoryProvider, StaticCategoryProvider};
pub use question_repository::{
    ChangeEvent, ChangeKind, ChangeStream, InMemoryRepository, QuestionRepository,
};
pub use toml_repository::TomlFileRepository;
