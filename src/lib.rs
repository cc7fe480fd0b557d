//! # Exam Question Bank
//!
//! 驾照考试题库的本地缓存、变更同步与配额抽题引擎
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 本地键值持久化，只暴露读写能力
//!
//! ### ② 外部接口层（Clients）
//! - `clients/` - 远程题库（全量读取 + 变更订阅）与用户类别上下文
//!
//! ### ③ 业务能力层（Services）
//! - `AnswerCodec` - 答案编解码
//! - `CorpusCacheStore` - 题库快照整体读写
//! - `ChangeFeedSubscriber` - 远程变更订阅，唯一的快照写入者
//! - `QuotaSampler` - 按类别配额抽题并按主题排序
//! - `SessionOrderLedger` - 记录本场考试的题目顺序
//!
//! ### ④ 流程层（Workflow）
//! - `ExamCorpus` - 门面：缓存或拉取 → 订阅 → 抽题 → 记录顺序
//!
//! ## 模块结构

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Category, CorpusSnapshot, Question, QuestionRecord, QuotaRules};
pub use workflow::ExamCorpus;
