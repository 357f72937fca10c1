//! 编排图集成测试
//!
//! MemoryStore + StubPortal + 脚本化 Mock LLM 驱动完整 core -> render 流程，不依赖网络。

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dulo::agent::{CoreAgent, RenderAgent};
    use dulo::core::HistoryTurn;
    use dulo::graph::AgentGraph;
    use dulo::llm::MockLlmClient;
    use dulo::portal::StubPortal;
    use dulo::store::{MemoryStore, NewSchedule, NewTimeTable, Store, UserProfile, Weekday};
    use dulo::tools::{default_registry, ToolExecutor, TIMETABLE_COLORS};

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

    /// core 与 render 共享同一个 Mock：脚本按调用顺序消费
    fn graph_with(store: Arc<MemoryStore>, replies: Vec<&str>) -> AgentGraph {
        let llm = Arc::new(MockLlmClient::scripted(replies));
        let registry = default_registry(store, Arc::new(StubPortal));
        let core = CoreAgent::new(llm.clone(), ToolExecutor::new(registry, 5), 5, 8);
        let render = RenderAgent::new(llm, 5);
        AgentGraph::new(core, render)
    }

    #[tokio::test]
    async fn tomorrow_without_schedules_returns_text_only_envelope() {
        let store = seeded_store().await;
        let graph = graph_with(
            store,
            vec![
                r#"{"tool": "list_schedules", "args": {"user_id": 1, "scheduled_date": "2026-08-07"}}"#,
                r#"{"message": "내일은 등록된 일정이 없습니다.", "data": null, "render_html": false}"#,
            ],
        );

        let outcome = graph.run(1, "내일 일정 알려줘", Vec::new()).await.unwrap();

        assert_eq!(outcome.message, "내일은 등록된 일정이 없습니다.");
        assert!(outcome.data.is_none());
        assert!(!outcome.render_html);
        assert!(outcome.html.is_none());
    }

    #[tokio::test]
    async fn schedule_listing_renders_grouped_html() {
        let store = seeded_store().await;
        store
            .create_schedule(
                1,
                NewSchedule {
                    title: "축구하기".to_string(),
                    scheduled_date: chrono::NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
                    tags: vec!["운동".to_string()],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let graph = graph_with(
            store,
            vec![
                r#"{"tool": "list_schedules", "args": {"user_id": 1, "scheduled_date": "2026-08-07"}}"#,
                // 模型返回扁平数组也会被归一化按日期分组
                r#"{"message": "내일 일정입니다.", "data": {"schedules": [{"id": 2, "title": "축구하기", "is_completed": false, "tags": ["운동"], "scheduled_date": "2026-08-07"}]}, "render_html": true, "template_name": "schedule_list"}"#,
                // render 阶段 LLM 输出崩坏时由确定性变换恢复
                "garbage output",
            ],
        );

        let outcome = graph.run(1, "내일 일정 알려줘", Vec::new()).await.unwrap();

        assert!(outcome.render_html);
        let data = outcome.data.as_ref().unwrap();
        assert!(data["schedules"]["2026-08-07"].is_array());
        let html = outcome.html.expect("render stage should produce html");
        assert!(html.contains("2026-08-07"));
        assert!(html.contains("축구하기"));
    }

    #[tokio::test]
    async fn timetable_flow_renders_cells_with_palette_colors() {
        let store = seeded_store().await;
        store
            .create_timetable(
                1,
                NewTimeTable {
                    subject: "CS".to_string(),
                    day_of_week: Weekday::Thu,
                    start_time: chrono::NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
                    end_time: chrono::NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
                },
            )
            .await
            .unwrap();

        let graph = graph_with(
            store,
            vec![
                r#"{"tool": "list_timetable", "args": {"user_id": 1}}"#,
                // 模型放入原始形态的行也按同一规则变换
                r#"{"message": "회원님의 시간표 목록입니다.", "data": {"timetables": [{"subject": "CS", "day_of_week": "thu", "start_time": "12:00:00", "end_time": "15:00:00"}]}, "render_html": true, "template_name": "timetable_list"}"#,
                "not json either",
            ],
        );

        let outcome = graph.run(1, "시간표 보여줘", Vec::new()).await.unwrap();

        let html = outcome.html.expect("timetable html");
        assert!(html.contains("CS"));
        assert!(html.contains("data-col=\"5\""));
        assert!(html.contains(TIMETABLE_COLORS[0]));
    }

    #[tokio::test]
    async fn render_failure_degrades_to_text_only() {
        let store = seeded_store().await;
        let graph = graph_with(
            store,
            vec![
                // data 形状三种模板都解释不了：render 为 None
                r#"{"message": "정리했습니다.", "data": {"mystery": []}, "render_html": true}"#,
                "garbage",
            ],
        );

        let outcome = graph.run(1, "아무거나", Vec::new()).await.unwrap();
        assert_eq!(outcome.message, "정리했습니다.");
        assert!(outcome.render_html);
        assert!(outcome.html.is_none());
    }

    #[tokio::test]
    async fn history_is_threaded_into_the_turn() {
        let store = seeded_store().await;
        let graph = graph_with(
            store,
            vec![r#"{"message": "네, 이어서 도와드릴게요.", "data": null, "render_html": false}"#],
        );
        let history = vec![HistoryTurn {
            query: "내일 일정 알려줘".to_string(),
            message: "내일은 등록된 일정이 없습니다.".to_string(),
        }];
        let outcome = graph.run(1, "그럼 하나 추가해줘", history).await.unwrap();
        assert_eq!(outcome.message, "네, 이어서 도와드릴게요.");
    }

    #[tokio::test]
    async fn import_tools_report_sync_in_progress() {
        let store = seeded_store().await;
        let graph = graph_with(
            store,
            vec![
                r#"{"tool": "import_timetable", "args": {"user_id": 1}}"#,
                r#"{"message": "학사 시스템 연동이 실행 중입니다. 잠시 후 시간표에서 확인해 주세요.", "data": null, "render_html": false}"#,
            ],
        );
        let outcome = graph.run(1, "샘물에서 시간표 가져와줘", Vec::new()).await.unwrap();
        assert!(outcome.message.contains("실행 중"));
        assert!(outcome.html.is_none());
    }
}
