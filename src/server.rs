//! HTTP 层
//!
//! POST /api/chat 同步执行一个回合（调用 graph -> 结果写入对话记录）。
//! 认证/令牌签发归网关：user_id 视为已验证值直接信任。
//! 正常流程内的工具失败都在 Agent 内化为自然语言，这里的 5xx 只会是
//! 基础设施故障（LLM 重试后仍失败等）。

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::{AgentError, HistoryTurn};
use crate::graph::AgentGraph;
use crate::store::Store;

pub struct AppState {
    pub graph: AgentGraph,
    pub store: Arc<dyn Store>,
    /// 注入 prompt 的最近对话回合数
    pub history_turns: usize,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat", post(api_chat).get(api_chat_history))
        .route("/api/health", get(|| async { "OK" }))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    user_id: i64,
    query: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    message: String,
    data: Option<Value>,
    render_html: bool,
    html: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    user_id: i64,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct HistoryItem {
    id: i64,
    query: String,
    answer: Value,
    created_at: String,
}

/// POST /api/chat：{"user_id", "query"} -> {"message", "data", "render_html", "html"}
async fn api_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "query is required".to_string()));
    }

    // 请求级追踪 id（与对话记录 id 无关）
    let request_id = uuid::Uuid::new_v4();
    tracing::info!(%request_id, user_id = req.user_id, "chat turn started");

    let history = load_history(&state, req.user_id).await?;
    let outcome = state
        .graph
        .run(req.user_id, query, history)
        .await
        .map_err(map_agent_err)?;

    let response = ChatResponse {
        message: outcome.message,
        data: outcome.data,
        render_html: outcome.render_html,
        html: outcome.html,
    };
    let answer = serde_json::to_value(&response).unwrap_or(json!(null));
    if let Err(e) = state.store.append_chat_turn(req.user_id, query, answer).await {
        // 记录失败不阻塞响应
        tracing::warn!(error = %e, "failed to persist chat turn");
    }

    Ok(Json(response))
}

/// GET /api/chat?user_id=&limit=：已存对话记录（最新在前）
async fn api_chat_history(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryItem>>, (StatusCode, String)> {
    let turns = state
        .store
        .recent_chat_turns(q.user_id, q.limit.unwrap_or(50))
        .await
        .map_err(|e| map_agent_err(AgentError::from(e)))?;
    let items = turns
        .into_iter()
        .map(|t| HistoryItem {
            id: t.id,
            query: t.query,
            answer: t.answer,
            created_at: t.created_at.to_rfc3339(),
        })
        .collect();
    Ok(Json(items))
}

async fn load_history(
    state: &AppState,
    user_id: i64,
) -> Result<Vec<HistoryTurn>, (StatusCode, String)> {
    let turns = state
        .store
        .recent_chat_turns(user_id, state.history_turns)
        .await
        .map_err(|e| map_agent_err(AgentError::from(e)))?;
    Ok(turns
        .into_iter()
        .map(|t| HistoryTurn {
            query: t.query,
            message: t
                .answer
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
        .collect())
}

fn map_agent_err(e: AgentError) -> (StatusCode, String) {
    match e {
        AgentError::LlmTimeout | AgentError::LlmError(_) => {
            (StatusCode::BAD_GATEWAY, e.to_string())
        }
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}
