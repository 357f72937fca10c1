//! Core Agent：自然语言 -> 行动转换的单一入口
//!
//! Plan -> (Tool Call -> Observation)* -> 最终信封。分支与排序交给模型的工具选择策略，
//! 但信封的解析、校验与回退全部是确定性普通代码：换模型不换契约。
//! 工具失败以 Observation 喂回模型，让它向用户道歉/追问，绝不以系统错误形式外泄。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::agent::prompts::{build_system_prompt, build_user_prompt};
use crate::core::{
    parse_planner_output, AgentEnvelope, AgentError, Message, PlannerOutput, TurnState,
};
use crate::llm::LlmClient;
use crate::tools::ToolExecutor;

/// 步数上限命中时返回的消息
const MAX_STEPS_MESSAGE: &str = "요청을 끝까지 처리하지 못했습니다. 조금 더 구체적으로 다시 요청해 주세요.";

/// Core Agent：LLM + 工具执行器 + 超时/步数策略
pub struct CoreAgent {
    llm: Arc<dyn LlmClient>,
    executor: ToolExecutor,
    request_timeout: Duration,
    max_steps: usize,
}

impl CoreAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        executor: ToolExecutor,
        request_timeout_secs: u64,
        max_steps: usize,
    ) -> Self {
        Self {
            llm,
            executor,
            request_timeout: Duration::from_secs(request_timeout_secs),
            max_steps,
        }
    }

    pub fn tool_specs(&self) -> Vec<(String, String, serde_json::Value)> {
        self.executor.tool_specs()
    }

    /// 执行一个回合：prompt/观察/回复累积进 state.messages，返回校验后的信封
    pub async fn run(&self, state: &mut TurnState) -> Result<AgentEnvelope, AgentError> {
        let today = chrono::Local::now().date_naive();
        let system = build_system_prompt(&self.executor.tool_specs(), today);
        state.messages.push(Message::system(system));
        state
            .messages
            .push(Message::system(format!("사용자 ID: {}", state.user_id)));
        state.messages.push(Message::user(build_user_prompt(
            &state.query,
            &state.message_history,
        )));

        for step in 0..self.max_steps {
            let output = self.complete_with_retry(&state.messages).await?;
            state.messages.push(Message::assistant(output.clone()));

            match parse_planner_output(&output) {
                PlannerOutput::ToolCall(call) => {
                    tracing::debug!(step, tool = %call.tool, "core agent tool call");
                    let observation = match self.executor.execute(&call.tool, call.args).await {
                        Ok(content) => content,
                        // 失败同样作为 Observation：让模型向用户解释或追问
                        Err(e) => serde_json::json!({"error": e.to_string()}).to_string(),
                    };
                    state.messages.push(Message::user(format!(
                        "Observation from {}: {}",
                        call.tool, observation
                    )));
                }
                PlannerOutput::Envelope(envelope) => {
                    return Ok(envelope.normalized());
                }
                PlannerOutput::Plain(text) => {
                    // 不合格式的输出：原文包进 message 安全返回
                    tracing::warn!("core agent output not parseable as envelope, falling back");
                    return Ok(AgentEnvelope::fallback(text));
                }
            }
        }

        tracing::warn!(max_steps = self.max_steps, "core agent hit step limit");
        Ok(AgentEnvelope::fallback(MAX_STEPS_MESSAGE))
    }

    /// 补全调用：超时重试一次，其余错误立即转 LlmError
    async fn complete_with_retry(&self, messages: &[Message]) -> Result<String, AgentError> {
        for attempt in 0..2 {
            match timeout(self.request_timeout, self.llm.complete(messages)).await {
                Ok(Ok(text)) => return Ok(text),
                Ok(Err(e)) => return Err(AgentError::LlmError(e)),
                Err(_) => {
                    tracing::warn!(attempt, "llm completion timed out");
                }
            }
        }
        Err(AgentError::LlmTimeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TemplateName;
    use crate::llm::MockLlmClient;
    use crate::portal::StubPortal;
    use crate::store::{MemoryStore, Store, UserProfile};
    use crate::tools::{default_registry, ToolExecutor};
    use serde_json::json;

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store
            .seed_user(UserProfile {
                id: 1,
                email: "stu@smu.ac.kr".to_string(),
                student_id: "202012345".to_string(),
            })
            .await;
        Arc::new(store)
    }

    fn agent_with(store: Arc<MemoryStore>, replies: Vec<&str>) -> CoreAgent {
        let registry = default_registry(store, Arc::new(StubPortal));
        CoreAgent::new(
            Arc::new(MockLlmClient::scripted(replies)),
            ToolExecutor::new(registry, 5),
            5,
            8,
        )
    }

    #[tokio::test]
    async fn tool_call_then_envelope() {
        let store = seeded_store().await;
        store
            .create_schedule(
                1,
                crate::store::NewSchedule {
                    title: "축구하기".to_string(),
                    scheduled_date: chrono::NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let agent = agent_with(
            store,
            vec![
                r#"{"tool": "list_schedules", "args": {"user_id": 1, "scheduled_date": "2026-08-07"}}"#,
                r#"{"message": "내일 일정입니다.", "data": {"schedules": [{"id": 2, "title": "축구하기", "scheduled_date": "2026-08-07"}]}, "render_html": true, "template_name": "schedule_list"}"#,
            ],
        );
        let mut state = TurnState::new(1, "내일 일정 알려줘", Vec::new());
        let envelope = agent.run(&mut state).await.unwrap();

        assert_eq!(envelope.message, "내일 일정입니다.");
        assert!(envelope.render_html);
        assert_eq!(envelope.template_name, Some(TemplateName::ScheduleList));
        // 归一化：扁平数组被按日期分组
        let data = envelope.data.unwrap();
        assert!(data["schedules"]["2026-08-07"].is_array());
        // 消息日志：system*2 + user + assistant(tool call) + observation + assistant(final)
        assert_eq!(state.messages.len(), 6);
        assert!(state.messages[4].content.starts_with("Observation from list_schedules:"));
    }

    #[tokio::test]
    async fn malformed_output_becomes_fallback_envelope() {
        let store = seeded_store().await;
        let agent = agent_with(store, vec!["죄송해요, 무슨 말씀인지 잘 모르겠어요."]);
        let mut state = TurnState::new(1, "???", Vec::new());
        let envelope = agent.run(&mut state).await.unwrap();
        assert_eq!(envelope.message, "죄송해요, 무슨 말씀인지 잘 모르겠어요.");
        assert!(envelope.data.is_none());
        assert!(!envelope.render_html);
    }

    #[tokio::test]
    async fn unknown_tool_is_fed_back_as_observation() {
        let store = seeded_store().await;
        let agent = agent_with(
            store,
            vec![
                r#"{"tool": "fly_to_moon", "args": {}}"#,
                r#"{"message": "그 작업은 지원하지 않아요.", "data": null, "render_html": false}"#,
            ],
        );
        let mut state = TurnState::new(1, "달에 데려다줘", Vec::new());
        let envelope = agent.run(&mut state).await.unwrap();
        assert_eq!(envelope.message, "그 작업은 지원하지 않아요.");
        let observation = &state.messages[4].content;
        assert!(observation.contains("error"));
        assert!(observation.contains("fly_to_moon"));
    }

    #[tokio::test]
    async fn step_limit_returns_safe_envelope() {
        let store = seeded_store().await;
        let replies: Vec<&str> = std::iter::repeat(r#"{"tool": "list_tag", "args": {"user_id": 1}}"#)
            .take(10)
            .collect();
        let agent = agent_with(store, replies);
        let mut state = TurnState::new(1, "태그 보여줘", Vec::new());
        let envelope = agent.run(&mut state).await.unwrap();
        assert_eq!(envelope.message, MAX_STEPS_MESSAGE);
        assert!(envelope.data.is_none());
    }

    #[tokio::test]
    async fn compound_dates_merge_without_duplicates() {
        let store = seeded_store().await;
        for d in ["2026-08-01", "2026-08-03", "2026-08-10"] {
            store
                .create_schedule(
                    1,
                    crate::store::NewSchedule {
                        title: format!("{d} 일정"),
                        scheduled_date: chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap(),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }
        // 模型按提示逐日调用后合并（最终 data 为扁平数组，由归一化分组）
        let final_envelope = json!({
            "message": "요청하신 세 날짜의 일정입니다.",
            "data": {"schedules": [
                {"id": 2, "title": "2026-08-01 일정", "scheduled_date": "2026-08-01"},
                {"id": 3, "title": "2026-08-03 일정", "scheduled_date": "2026-08-03"},
                {"id": 4, "title": "2026-08-10 일정", "scheduled_date": "2026-08-10"},
                {"id": 3, "title": "2026-08-03 일정", "scheduled_date": "2026-08-03"},
            ]},
            "render_html": true,
            "template_name": "schedule_list"
        })
        .to_string();
        let agent = agent_with(
            store,
            vec![
                r#"{"tool": "list_schedules", "args": {"user_id": 1, "scheduled_date": "2026-08-01"}}"#,
                r#"{"tool": "list_schedules", "args": {"user_id": 1, "scheduled_date": "2026-08-03"}}"#,
                r#"{"tool": "list_schedules", "args": {"user_id": 1, "scheduled_date": "2026-08-10"}}"#,
                final_envelope.as_str(),
            ],
        );
        let mut state = TurnState::new(1, "1일, 3일, 10일 일정 조회해줘", Vec::new());
        let envelope = agent.run(&mut state).await.unwrap();
        let schedules = &envelope.data.unwrap()["schedules"];
        let dates: Vec<&String> = schedules.as_object().unwrap().keys().collect();
        assert_eq!(dates, ["2026-08-01", "2026-08-03", "2026-08-10"]);
        // 去重：8-03 只剩一条
        assert_eq!(schedules["2026-08-03"].as_array().unwrap().len(), 1);
    }
}
