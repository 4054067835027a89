pub mod redis;
pub mod supabase;

pub use redis::create_redis_client;
pub use redis::Cache;
pub use redis::CacheKey;
pub use redis::CacheWriterHandle;
pub use supabase::{LibraryStore, ListQuery, SupabaseStore};
