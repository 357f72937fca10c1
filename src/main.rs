//! Dulo API 服务入口
//!
//! 启动: cargo run
//! 组件全部在这里显式构造并注入（LLM / Store / Portal / Agent / Graph），无模块级单例。

use std::sync::Arc;

use dulo::agent::{CoreAgent, RenderAgent};
use dulo::config::load_config;
use dulo::graph::AgentGraph;
use dulo::llm::create_llm_from_config;
use dulo::portal::HttpPortal;
use dulo::server::{router, AppState};
use dulo::store::{MemoryStore, Store, StudyRoutine, UserProfile};
use dulo::tools::{default_registry, ToolExecutor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dulo::observability::init();

    let cfg = load_config(None).unwrap_or_default();

    // 内存存储：开发/演示用；接生产库时替换为同 trait 的实现
    let memory = MemoryStore::new();
    seed_demo_user(&memory).await;
    let store: Arc<dyn Store> = Arc::new(memory);

    let portal = Arc::new(HttpPortal::new(
        cfg.crawler.base_url.clone(),
        cfg.crawler.timeout_secs,
    ));

    let llm = create_llm_from_config(&cfg);
    let registry = default_registry(store.clone(), portal);
    let executor = ToolExecutor::new(registry, cfg.tools.tool_timeout_secs);

    let core = CoreAgent::new(
        llm.clone(),
        executor,
        cfg.llm.timeouts.request,
        cfg.chat.max_agent_steps,
    );
    let render = RenderAgent::new(llm, cfg.llm.timeouts.request);
    let graph = AgentGraph::new(core, render);

    let state = Arc::new(AppState {
        graph,
        store,
        history_turns: cfg.chat.history_turns,
    });
    let app = router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cfg.server.port));
    tracing::info!(model = %cfg.llm.model, "Dulo API: http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// 演示用户（id=1）种子数据：内存存储为空时任何工具都无从操作
async fn seed_demo_user(store: &MemoryStore) {
    store
        .seed_user(UserProfile {
            id: 1,
            email: "demo@smu.ac.kr".to_string(),
            student_id: "202012345".to_string(),
        })
        .await;
    store
        .seed_study_routine(
            1,
            StudyRoutine {
                weeks_before_exam: 2,
                review_type: "SAMEDAY".to_string(),
            },
        )
        .await;
    tracing::info!("seeded demo user (id=1)");
}
