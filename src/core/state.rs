//! 回合状态：一次用户请求在编排图中流转的共享可变状态
//!
//! 生命周期 = 单个请求；绝不跨请求或跨用户复用。messages 在回合内只追加不回改。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::envelope::TemplateName;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 注入 prompt 的历史回合摘要：提问 + 当时的回复文本
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub query: String,
    pub message: String,
}

/// 编排图状态（对应一次 /api/chat 调用）
#[derive(Debug)]
pub struct TurnState {
    pub user_id: i64,
    pub query: String,
    /// 最近 N 回合历史，最新在前；仅作上下文，核心不修改
    pub message_history: Vec<HistoryTurn>,
    /// 本回合累积的角色消息（system / user / assistant），只追加
    pub messages: Vec<Message>,
    pub data: Option<Value>,
    pub render_html: bool,
    pub template_name: Option<TemplateName>,
    pub html: Option<String>,
}

impl TurnState {
    pub fn new(user_id: i64, query: impl Into<String>, history: Vec<HistoryTurn>) -> Self {
        Self {
            user_id,
            query: query.into(),
            message_history: history,
            messages: Vec::new(),
            data: None,
            render_html: false,
            template_name: None,
            html: None,
        }
    }
}
