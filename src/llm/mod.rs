pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use traits::LlmClient;

use crate::config::AppConfig;

/// 从配置创建 LLM 客户端（显式构造一次，由调用方注入 Agent，不使用全局单例）
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let api_key = std::env::var(&cfg.llm.api_key_env).ok();
    Arc::new(OpenAiClient::new(
        cfg.llm.base_url.as_deref(),
        &cfg.llm.model,
        api_key.as_deref(),
    ))
}
