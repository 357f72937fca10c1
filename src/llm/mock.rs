//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 按脚本顺序返回预设回复，便于驱动「多步工具调用 -> 最终信封」的确定性测试；
//! 脚本耗尽后返回一个安全的最终信封，避免测试悬死在 Agent 循环里。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::Message;
use crate::llm::LlmClient;

/// Mock 客户端：依次弹出脚本化回复
#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<String>>,
}

impl MockLlmClient {
    pub fn scripted(replies: Vec<impl Into<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
        }
    }

    pub fn push(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(reply.into());
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
        let next = self.replies.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| {
            r#"{"message": "(mock replies exhausted)", "data": null, "render_html": false}"#
                .to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_in_script_order_then_safe_envelope() {
        let mock = MockLlmClient::scripted(vec!["one", "two"]);
        assert_eq!(mock.complete(&[]).await.unwrap(), "one");
        assert_eq!(mock.complete(&[]).await.unwrap(), "two");
        assert!(mock.complete(&[]).await.unwrap().contains("exhausted"));
    }
}
