//! 响应信封与模型输出解析
//!
//! Core Agent 的输出契约：模型要么返回 JSON Tool Call（{"tool": "...", "args": {...}}），
//! 要么返回最终信封（{"message", "data", "render_html", "template_name"}）。
//! 解析、校验与回退全部是确定性普通代码，模型可替换而契约不变。

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 展示模板：封闭枚举，Render Agent 只认这三种
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateName {
    ScheduleList,
    TagList,
    TimetableList,
}

impl TemplateName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateName::ScheduleList => "schedule_list",
            TemplateName::TagList => "tag_list",
            TemplateName::TimetableList => "timetable_list",
        }
    }

    /// 宽容解析：模型偶尔会带 .html 后缀或用复数形式
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().trim_end_matches(".html");
        match s {
            "schedule_list" | "schedules_list" => Some(TemplateName::ScheduleList),
            "tag_list" | "tags_list" => Some(TemplateName::TagList),
            "timetable_list" | "timetables_list" => Some(TemplateName::TimetableList),
            _ => None,
        }
    }
}

/// 工具返回的统一信封；list_timetable 会额外携带渲染提示供模型采纳
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolReply {
    pub message: String,
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_html: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_name: Option<TemplateName>,
}

impl ToolReply {
    pub fn new(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            message: message.into(),
            data,
            render_html: None,
            template_name: None,
        }
    }

    /// 序列化为 Observation 字符串（工具契约：Result<String, String> 的 Ok 值）
    pub fn into_json(self) -> String {
        serde_json::to_string(&self).unwrap_or_else(|_| "null".to_string())
    }
}

/// Core Agent 对外的结构化响应
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentEnvelope {
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub render_html: bool,
    #[serde(default)]
    pub template_name: Option<TemplateName>,
}

impl AgentEnvelope {
    /// 回退信封：模型输出无法解析时，把原文放进 message，绝不报系统错误
    pub fn fallback(text: impl Into<String>) -> Self {
        Self {
            message: text.into(),
            data: None,
            render_html: false,
            template_name: None,
        }
    }

    /// 确定性归一化：
    /// - data.schedules 若是扁平数组，在代码侧按日期分组（并按 id 去重）
    /// - data 为空时强制 render_html = false（纯确认/报错不渲染）
    pub fn normalized(mut self) -> Self {
        if let Some(Value::Object(ref mut map)) = self.data {
            if let Some(Value::Array(items)) = map.get("schedules").cloned() {
                map.insert(
                    "schedules".to_string(),
                    Value::Object(group_schedules_by_date(&items)),
                );
            }
        }
        if self.data.is_none() {
            self.render_html = false;
        }
        self
    }
}

/// 模型返回的 Tool Call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: Value,
}

/// 规划输出：工具调用 / 最终信封 / 无法解析的纯文本
#[derive(Debug, Clone)]
pub enum PlannerOutput {
    ToolCall(ToolCall),
    Envelope(AgentEnvelope),
    Plain(String),
}

fn json_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").unwrap())
}

/// 提取模型输出中的 JSON 块：优先 ```json 围栏，其次首尾大括号切片
fn extract_json_block(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if let Some(cap) = json_fence_re().captures(trimmed) {
        return Some(cap[1].trim().to_string());
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].to_string())
}

/// 解析模型输出：
/// - 含 "tool" 键的对象 -> ToolCall
/// - 含 "message" 键的对象 -> AgentEnvelope（template_name 宽容解析，非法值按 None 处理）
/// - 其余 -> Plain（调用方转回退信封）
pub fn parse_planner_output(text: &str) -> PlannerOutput {
    let Some(json_str) = extract_json_block(text) else {
        return PlannerOutput::Plain(text.trim().to_string());
    };
    let Ok(value) = serde_json::from_str::<Value>(&json_str) else {
        return PlannerOutput::Plain(text.trim().to_string());
    };
    let Some(obj) = value.as_object() else {
        return PlannerOutput::Plain(text.trim().to_string());
    };

    if let Some(tool) = obj.get("tool").and_then(Value::as_str) {
        if !tool.is_empty() {
            return PlannerOutput::ToolCall(ToolCall {
                tool: tool.to_string(),
                args: obj.get("args").cloned().unwrap_or(Value::Object(Default::default())),
            });
        }
    }

    if let Some(message) = obj.get("message").and_then(Value::as_str) {
        let data = match obj.get("data") {
            None | Some(Value::Null) => None,
            Some(v) => Some(v.clone()),
        };
        let render_html = obj.get("render_html").and_then(Value::as_bool).unwrap_or(false);
        let template_name = obj
            .get("template_name")
            .and_then(Value::as_str)
            .and_then(TemplateName::parse);
        return PlannerOutput::Envelope(AgentEnvelope {
            message: message.to_string(),
            data,
            render_html,
            template_name,
        });
    }

    PlannerOutput::Plain(text.trim().to_string())
}

/// 按 scheduled_date 分组（BTreeMap 保证日期有序），同 id 条目只保留首个
pub fn group_schedules_by_date(items: &[Value]) -> serde_json::Map<String, Value> {
    let mut grouped: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    let mut seen_ids: Vec<i64> = Vec::new();

    for item in items {
        if let Some(id) = item.get("id").and_then(Value::as_i64) {
            if seen_ids.contains(&id) {
                continue;
            }
            seen_ids.push(id);
        }
        let date = item
            .get("scheduled_date")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        grouped.entry(date).or_default().push(item.clone());
    }

    grouped
        .into_iter()
        .map(|(date, rows)| (date, Value::Array(rows)))
        .collect()
}
