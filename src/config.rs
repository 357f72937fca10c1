//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `DULO__*` 覆盖（双下划线表示嵌套，如 `DULO__LLM__MODEL=gemini-2.5-pro`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub tools: ToolsSection,
    pub chat: ChatSection,
    pub crawler: CrawlerSection,
    pub server: ServerSection,
}

/// [app] 段：应用名
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端标识：gemini / openai，仅作日志展示；实际路由由 base_url 决定
    pub provider: String,
    pub model: String,
    /// OpenAI 兼容端点；默认指向 Gemini 的兼容端点
    pub base_url: Option<String>,
    /// API Key 所在环境变量名
    pub api_key_env: String,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            base_url: Some("https://generativelanguage.googleapis.com/v1beta/openai/".to_string()),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

/// [llm.timeouts] 段：单次补全请求超时（秒）；超时重试一次后报 LlmTimeout
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 30 }
    }
}

/// [tools] 段：单次工具调用超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    pub tool_timeout_secs: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self { tool_timeout_secs: 10 }
    }
}

/// [chat] 段：历史窗口与单回合最大工具步数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatSection {
    /// 注入 prompt 的最近对话回合数
    pub history_turns: usize,
    /// 单回合内 plan -> tool 的最大步数，防止死循环
    pub max_agent_steps: usize,
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            history_turns: 10,
            max_agent_steps: 8,
        }
    }
}

/// [crawler] 段：学校门户爬虫服务地址与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerSection {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for CrawlerSection {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9000".to_string(),
            timeout_secs: 15,
        }
    }
}

/// [server] 段：监听端口
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// 从 config 目录加载配置，环境变量 DULO__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 DULO__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("DULO")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.chat.history_turns, 10);
        assert_eq!(cfg.chat.max_agent_steps, 8);
        assert_eq!(cfg.llm.timeouts.request, 30);
        assert!(cfg.llm.base_url.unwrap().contains("openai"));
    }
}
