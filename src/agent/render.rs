//! Render Agent：面向展示的二次变换
//!
//! 仅当 core 阶段置起 render_html 时运行。模板上下文的生成交给 LLM，但结果按类型
//! 校验，校验不过就用同一规则的确定性变换恢复；再失败则返回 None——只丢视觉输出，
//! 文本响应照常返回，绝不升级为请求失败。课表 的变换规则与 list_timetable 工具
//! 共享同一实现。

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;

use minijinja::Environment;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::timeout;

use crate::agent::prompts::build_render_prompt;
use crate::core::{group_schedules_by_date, AgentError, Message, TemplateName};
use crate::llm::LlmClient;
use crate::tools::transform_timetable_values;

/// 按标签分组视图的一组：name/color 取自标签记录原值 + 所属日程列表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagGroup {
    pub name: String,
    pub color: String,
    pub schedules: Vec<TagSchedule>,
}

/// 标签组内的日程：只保留标题与完成标记
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSchedule {
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
}

/// Render Agent：LLM 变换 + 类型校验 + 确定性恢复 + 模板渲染
pub struct RenderAgent {
    llm: Arc<dyn LlmClient>,
    request_timeout: Duration,
}

impl RenderAgent {
    pub fn new(llm: Arc<dyn LlmClient>, request_timeout_secs: u64) -> Self {
        Self {
            llm,
            request_timeout: Duration::from_secs(request_timeout_secs),
        }
    }

    /// 变换 + 渲染；一切失败都折叠为 None（调用侧按「无视觉输出」处理）
    pub async fn run(
        &self,
        query: &str,
        data: &Value,
        template_name: Option<TemplateName>,
    ) -> Option<String> {
        let template = match template_name.or_else(|| infer_template(data)) {
            Some(t) => t,
            None => {
                tracing::warn!("render skipped: no template resolvable from data");
                return None;
            }
        };

        let context = match self.generate_context(query, data, template).await {
            Some(ctx) => ctx,
            None => {
                tracing::warn!(template = template.as_str(), "llm context rejected, using deterministic transform");
                fallback_context(data, template)?
            }
        };

        match render_template(template, &context) {
            Ok(html) => Some(html),
            Err(e) => {
                tracing::warn!(error = %e, "template rendering failed");
                None
            }
        }
    }

    /// 请 LLM 生成上下文，只有通过类型校验才采纳
    async fn generate_context(
        &self,
        query: &str,
        data: &Value,
        template: TemplateName,
    ) -> Option<Value> {
        let prompt = build_render_prompt(query, data, template);
        let messages = [Message::user(prompt)];
        let output = match timeout(self.request_timeout, self.llm.complete(&messages)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "render llm call failed");
                return None;
            }
            Err(_) => {
                tracing::warn!("render llm call timed out");
                return None;
            }
        };
        let parsed = extract_json(&output)?;
        validate_context(&parsed, template)
    }
}

/// template_name 缺失时按 data 形状推断（timetables 优先，tags+schedules 视为标签视图）
fn infer_template(data: &Value) -> Option<TemplateName> {
    let obj = data.as_object()?;
    if obj.contains_key("timetables") {
        return Some(TemplateName::TimetableList);
    }
    if obj.contains_key("tags") {
        return Some(TemplateName::TagList);
    }
    if obj.contains_key("schedules") {
        return Some(TemplateName::ScheduleList);
    }
    None
}

fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

/// 生成结果的结构校验：通过则返回规范化上下文，否则 None
fn validate_context(value: &Value, template: TemplateName) -> Option<Value> {
    match template {
        TemplateName::ScheduleList => {
            let schedules = value.get("schedules")?.as_object()?;
            for rows in schedules.values() {
                rows.as_array()?;
            }
            Some(json!({ "schedules": schedules }))
        }
        TemplateName::TagList => {
            let groups: Vec<TagGroup> =
                serde_json::from_value(value.get("tags")?.clone()).ok()?;
            Some(json!({ "tags": groups }))
        }
        TemplateName::TimetableList => {
            let rows = value.get("timetables")?.as_array()?;
            let cells = transform_timetable_values(rows).ok()?;
            Some(json!({ "timetables": cells }))
        }
    }
}

/// 确定性恢复变换：LLM 输出不可用时，直接从原始 data 构造上下文
fn fallback_context(data: &Value, template: TemplateName) -> Option<Value> {
    match template {
        TemplateName::ScheduleList => {
            let schedules = data.get("schedules")?;
            let grouped = match schedules {
                Value::Object(map) => map.clone(),
                Value::Array(rows) => group_schedules_by_date(rows),
                _ => return None,
            };
            Some(json!({ "schedules": grouped }))
        }
        TemplateName::TagList => {
            let tags = data.get("tags")?.as_array()?;
            let rows = flatten_schedules(data.get("schedules"));
            let mut groups = Vec::with_capacity(tags.len());
            for tag in tags {
                let name = tag.get("name")?.as_str()?.to_string();
                let color = tag.get("color")?.as_str()?.to_string();
                let schedules = rows
                    .iter()
                    .filter(|row| {
                        row.get("tags")
                            .and_then(Value::as_array)
                            .is_some_and(|t| t.iter().any(|v| v.as_str() == Some(name.as_str())))
                    })
                    .map(|row| TagSchedule {
                        title: row
                            .get("title")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        is_completed: row
                            .get("is_completed")
                            .and_then(Value::as_bool)
                            .unwrap_or(false),
                    })
                    .collect();
                groups.push(TagGroup {
                    name,
                    color,
                    schedules,
                });
            }
            Some(json!({ "tags": groups }))
        }
        TemplateName::TimetableList => {
            let rows = data.get("timetables")?.as_array()?;
            let cells = transform_timetable_values(rows).ok()?;
            Some(json!({ "timetables": cells }))
        }
    }
}

/// 把按日期分组或扁平数组的日程摊平成行列表
fn flatten_schedules(schedules: Option<&Value>) -> Vec<Value> {
    match schedules {
        Some(Value::Array(rows)) => rows.clone(),
        Some(Value::Object(map)) => {
            let grouped: BTreeMap<&String, &Value> = map.iter().collect();
            grouped
                .values()
                .filter_map(|v| v.as_array())
                .flatten()
                .cloned()
                .collect()
        }
        _ => Vec::new(),
    }
}

fn template_env() -> &'static Environment<'static> {
    static ENV: OnceLock<Environment<'static>> = OnceLock::new();
    ENV.get_or_init(|| {
        let mut env = Environment::new();
        env.add_template(
            "schedule_list",
            include_str!("../../templates/schedule_list.html"),
        )
        .expect("schedule_list template");
        env.add_template("tag_list", include_str!("../../templates/tag_list.html"))
            .expect("tag_list template");
        env.add_template(
            "timetable_list",
            include_str!("../../templates/timetable_list.html"),
        )
        .expect("timetable_list template");
        env
    })
}

fn render_template(template: TemplateName, context: &Value) -> Result<String, AgentError> {
    let env = template_env();
    let tmpl = env
        .get_template(template.as_str())
        .map_err(|e| AgentError::Template(e.to_string()))?;
    tmpl.render(context)
        .map_err(|e| AgentError::Template(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::tools::TIMETABLE_COLORS;

    fn agent_with(replies: Vec<&str>) -> RenderAgent {
        RenderAgent::new(Arc::new(MockLlmClient::scripted(replies)), 5)
    }

    #[tokio::test]
    async fn timetable_raw_entry_is_transformed_per_rules() {
        // LLM 输出离谱时，确定性变换仍按规则处理
        let agent = agent_with(vec!["이건 JSON이 아닙니다"]);
        let data = json!({"timetables": [{
            "subject": "CS", "day_of_week": "thu",
            "start_time": "12:00:00", "end_time": "15:00:00",
        }]});
        let html = agent
            .run("시간표 보여줘", &data, Some(TemplateName::TimetableList))
            .await
            .unwrap();
        assert!(html.contains("CS"));
        assert!(html.contains(TIMETABLE_COLORS[0]));
        // col=5(thu)，12~15 时
        assert!(html.contains("data-col=\"5\""));
        assert!(html.contains("12"));
    }

    #[tokio::test]
    async fn tag_grouping_allows_schedule_under_multiple_tags() {
        let agent = agent_with(vec!["not json"]);
        let data = json!({
            "tags": [
                {"name": "전공", "color": "#24B0C9"},
                {"name": "과제", "color": "#FF3C6A"},
            ],
            "schedules": {
                "2026-08-07": [
                    {"title": "운영체제 과제", "is_completed": false, "tags": ["전공", "과제"]},
                    {"title": "동아리 모임", "is_completed": true, "tags": []},
                ]
            }
        });
        let html = agent
            .run("태그별로 보여줘", &data, Some(TemplateName::TagList))
            .await
            .unwrap();
        // 两个标签都包含同一条日程
        assert_eq!(html.matches("운영체제 과제").count(), 2);
        assert!(html.contains("#24B0C9"));
        assert!(html.contains("#FF3C6A"));
        assert!(!html.contains("동아리 모임"));
    }

    #[tokio::test]
    async fn valid_llm_context_is_adopted() {
        let context = json!({
            "tags": [{"name": "전공", "color": "#24B0C9", "schedules": [
                {"title": "운영체제 과제", "is_completed": false}
            ]}]
        })
        .to_string();
        let agent = agent_with(vec![context.as_str()]);
        let data = json!({"tags": [{"name": "전공", "color": "#24B0C9"}], "schedules": []});
        let html = agent
            .run("태그별로 보여줘", &data, Some(TemplateName::TagList))
            .await
            .unwrap();
        assert!(html.contains("운영체제 과제"));
    }

    #[tokio::test]
    async fn schedule_list_passes_grouped_data_through() {
        let agent = agent_with(vec!["garbage"]);
        let data = json!({"schedules": {
            "2026-08-07": [{"id": 1, "title": "축구하기", "is_completed": false, "tags": ["운동"]}]
        }});
        let html = agent
            .run("내일 일정", &data, Some(TemplateName::ScheduleList))
            .await
            .unwrap();
        assert!(html.contains("2026-08-07"));
        assert!(html.contains("축구하기"));
    }

    #[tokio::test]
    async fn unresolvable_data_yields_none() {
        let agent = agent_with(vec!["garbage"]);
        // 课表行完全不可解析：LLM 与恢复变换都失败 -> None
        let data = json!({"timetables": [{"nonsense": true}]});
        assert!(agent
            .run("시간표", &data, Some(TemplateName::TimetableList))
            .await
            .is_none());
        // 模板无从推断
        let data = json!({"something": []});
        assert!(agent.run("?", &data, None).await.is_none());
    }

    #[test]
    fn template_inference_prefers_timetables() {
        assert_eq!(
            infer_template(&json!({"timetables": [], "schedules": {}})),
            Some(TemplateName::TimetableList)
        );
        assert_eq!(
            infer_template(&json!({"tags": [], "schedules": {}})),
            Some(TemplateName::TagList)
        );
        assert_eq!(
            infer_template(&json!({"schedules": {}})),
            Some(TemplateName::ScheduleList)
        );
    }
}
