//! Client-side cache of control-plane records, kept fresh by on-demand and
//! scheduled revalidation.

pub mod cache;
pub mod dependencies;
pub mod forwarders;
pub mod store;
pub mod subscription;

pub use cache::{CacheEntry, EntryStatus};
pub use dependencies::DependencyMap;
pub use forwarders::Forwarders;
pub use store::{Settled, SubscribeConfig, Synchronizer};
pub use subscription::Subscription;
