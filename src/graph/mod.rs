//! 编排图：START -> core -> (条件 render) -> END
//!
//! 只有两个节点，无循环无重试——重试与恢复全部下沉到两个 Agent 内部。
//! 分支条件：render_html == true 且 data != null 时才执行昂贵的 render 阶段。
//! 状态对象按请求作用域在两个 Agent 之间流转。

use serde::Serialize;
use serde_json::Value;

use crate::agent::{CoreAgent, RenderAgent};
use crate::core::{AgentError, HistoryTurn, Message, TurnState};

/// 一个回合的最终结果（HTTP 层原样序列化）
#[derive(Debug, Serialize)]
pub struct TurnOutcome {
    pub message: String,
    pub data: Option<Value>,
    pub render_html: bool,
    pub html: Option<String>,
}

/// 两节点编排图
pub struct AgentGraph {
    core: CoreAgent,
    render: RenderAgent,
}

impl AgentGraph {
    pub fn new(core: CoreAgent, render: RenderAgent) -> Self {
        Self { core, render }
    }

    /// core -> 分支 -> (render) -> END；history 只经显式参数传入
    pub async fn run(
        &self,
        user_id: i64,
        query: &str,
        history: Vec<HistoryTurn>,
    ) -> Result<TurnOutcome, AgentError> {
        let mut state = TurnState::new(user_id, query, history);

        // core 节点
        let envelope = self.core.run(&mut state).await?;
        state
            .messages
            .push(Message::assistant(envelope.message.clone()));
        state.data = envelope.data;
        state.render_html = envelope.render_html;
        state.template_name = envelope.template_name;

        // 条件边
        if should_render(&state) {
            let data = state.data.as_ref().unwrap();
            // 渲染失败(None)即「无视觉输出」：文本响应照常返回
            state.html = self
                .render
                .run(&state.query, data, state.template_name)
                .await;
        }

        Ok(TurnOutcome {
            message: envelope.message,
            data: state.data,
            render_html: state.render_html,
            html: state.html,
        })
    }
}

/// 分支条件：render_html && data != null
fn should_render(state: &TurnState) -> bool {
    state.render_html && state.data.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_branch_requires_flag_and_data() {
        let mut state = TurnState::new(1, "q", Vec::new());
        assert!(!should_render(&state));

        state.render_html = true;
        assert!(!should_render(&state));

        state.data = Some(serde_json::json!({"schedules": {}}));
        assert!(should_render(&state));

        state.render_html = false;
        assert!(!should_render(&state));
    }
}
