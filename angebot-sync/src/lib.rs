pub mod classify;
pub mod config;
pub mod notion;
pub mod retry;
pub mod supabase;

pub use config::SyncConfig;
pub use notion::NotionStore;
pub use supabase::SupabaseStore;
