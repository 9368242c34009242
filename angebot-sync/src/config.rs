use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    pub supabase: SupabaseConfig,
    pub notion: NotionConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_table")]
    pub table: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotionConfig {
    pub api_key: String,
    pub database_id: String,
    #[serde(default = "default_notion_base")]
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_attempts")]
    pub retry_attempts: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            retry_attempts: default_attempts(),
        }
    }
}

fn default_table() -> String {
    "angebote".to_string()
}

fn default_notion_base() -> String {
    "https://api.notion.com/v1".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_attempts() -> u32 {
    3
}

impl SyncConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // E.g. `ANGEBOT_SUPABASE__API_KEY=...`
            .add_source(config::Environment::with_prefix("ANGEBOT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
