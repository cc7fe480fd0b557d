pub mod exam_corpus;

pub use exam_corpus::ExamCorpus;
