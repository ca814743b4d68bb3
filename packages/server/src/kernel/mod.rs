//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod redis_store;
pub mod store;
pub mod test_dependencies;
pub mod traits;

pub use deps::{LoggingSmsService, ServerDeps, SystemClock, TwilioAdapter};
pub use redis_store::RedisStore;
pub use store::{begin_with_deadline, with_deadline, StoreError};
pub use test_dependencies::{InMemoryKeyValueStore, MockClock, MockSmsService, SentSms};
pub use traits::*;
