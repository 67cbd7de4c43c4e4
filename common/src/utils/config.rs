use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Copy, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    #[default]
    OpenAI,
    Hashed,
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub openai_api_key: String,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    pub pinecone_api_key: String,
    pub pinecone_environment: String,
    #[serde(default = "default_pinecone_cloud")]
    pub pinecone_cloud: String,
    #[serde(default = "default_pinecone_controller_url")]
    pub pinecone_controller_url: String,
    pub index_name: String,
    #[serde(default = "default_index_ready_timeout_secs")]
    pub index_ready_timeout_secs: u64,
    #[serde(default = "default_index_poll_interval_ms")]
    pub index_poll_interval_ms: u64,
    #[serde(default = "default_documents_dir")]
    pub documents_dir: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default)]
    pub embedding_backend: EmbeddingBackend,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,
    #[serde(default = "default_completion_model")]
    pub completion_model: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: usize,
    #[serde(default = "default_query_top_k")]
    pub query_top_k: usize,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_pinecone_cloud() -> String {
    "aws".to_string()
}

fn default_pinecone_controller_url() -> String {
    "https://api.pinecone.io".to_string()
}

const fn default_index_ready_timeout_secs() -> u64 {
    180
}

const fn default_index_poll_interval_ms() -> u64 {
    2_000
}

fn default_documents_dir() -> String {
    "./documents".to_string()
}

const fn default_http_port() -> u16 {
    3000
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

const fn default_embedding_dimensions() -> u32 {
    1536
}

fn default_completion_model() -> String {
    "gpt-4o-mini".to_string()
}

const fn default_chunk_size() -> usize {
    1000
}

const fn default_upsert_batch_size() -> usize {
    100
}

const fn default_query_top_k() -> usize {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_base_url: default_base_url(),
            pinecone_api_key: String::new(),
            pinecone_environment: String::new(),
            pinecone_cloud: default_pinecone_cloud(),
            pinecone_controller_url: default_pinecone_controller_url(),
            index_name: String::new(),
            index_ready_timeout_secs: default_index_ready_timeout_secs(),
            index_poll_interval_ms: default_index_poll_interval_ms(),
            documents_dir: default_documents_dir(),
            http_port: default_http_port(),
            embedding_backend: EmbeddingBackend::default(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            completion_model: default_completion_model(),
            chunk_size: default_chunk_size(),
            upsert_batch_size: default_upsert_batch_size(),
            query_top_k: default_query_top_k(),
        }
    }
}

/// Loads configuration from an optional `config` file and the process environment.
///
/// Environment variables use bare names (`OPENAI_API_KEY`, `PINECONE_API_KEY`, `INDEX_NAME`, ...).
/// These are secrets; they are only ever read server side.
pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
