pub mod cache;
pub mod persistent_cache;
pub mod ping_log;
pub mod repository;
pub mod settings;
pub mod traits;

pub use cache::{CacheEntry, CacheStats, MemoryCacheStore};
pub use persistent_cache::FileCacheStore;
pub use ping_log::{FilePingLog, MemoryPingLog};
pub use repository::{JsonFileRepository, MemoryRepository};
pub use settings::{
    FileSettingsStore, MemorySettingsStore, PublicationSettings, CATEGORY_FILTER_KEY,
    ENABLE_PING_KEY, PUBLICATION_NAME_KEY,
};
pub use traits::{CacheStore, ContentRepository, PingLog, SettingsStore};
