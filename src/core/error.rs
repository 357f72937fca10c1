//! Agent 错误类型
//!
//! 正常流程内的失败（NotFound / Validation / 模型输出不合格式）在 Core Agent 回合内
//! 被吸收为 Observation 或回退信封，最终以自然语言面向用户。能以错误形式上抛的只有
//! 基础设施失败（LLM 重试后仍失败）与存储访问失败。

use thiserror::Error;

use crate::store::StoreError;

/// Agent 运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 存储层错误（NotFound / Validation / Conflict 的分类在 StoreError 侧）
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("Tool execution failed: {0}")]
    ToolFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    /// 模型选择了不存在的工具
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    /// 补全请求超时（含一次重试）
    #[error("LLM timeout after retry")]
    LlmTimeout,

    #[error("Template error: {0}")]
    Template(String),
}
