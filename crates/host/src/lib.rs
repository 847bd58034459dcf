//! Host-side whitelist management for the NFT auction client

pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod notify;
pub mod query;
pub mod registry;
pub mod retry;
pub mod rpc;
pub mod store;

pub use cache::{CachedWhitelist, LocalCache};
pub use config::{Config, ContentMode, PinataConfig, RegistryMode};
pub use content::{ContentStore, MemoryContentStore, PinataStore};
pub use error::{Result, WhitelistError};
pub use notify::{Notification, NotificationStatus, Notifier};
pub use query::{AuctionQuery, AuctionReader, FetchDispatcher, QueryResult, RpcAuctionReader};
pub use registry::{MemoryRootRegistry, RootRegistry, RpcRootRegistry};
pub use retry::RetryPolicy;
pub use rpc::RpcClient;
pub use store::{StoreState, StoreStatus, WhitelistStore};
