pub mod answer_codec;
pub mod cache_store;
pub mod change_feed;
pub mod order_ledger;
pub mod quota_sampler;

pub use answer_codec::AnswerCodec;
pub use cache_store::CorpusCacheStore;
pub use change_feed::{ChangeFeedSubscriber, SubscriptionHandle};
pub use order_ledger::{LedgerEntry, SessionOrderLedger};
pub use quota_sampler::{arrange_by_topic, draw, QuotaSampler};
