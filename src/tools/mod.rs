//! 工具箱
//!
//! 固定目录的领域操作，全部实现 Tool trait 并注册进 ToolRegistry；
//! Core Agent 只通过 ToolExecutor 调用（超时 + 审计）。

pub mod executor;
pub mod registry;
pub mod schedule;
pub mod schema;
pub mod tag;
pub mod timetable;
pub mod user;

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;

pub use executor::ToolExecutor;
pub use registry::{Tool, ToolRegistry};
pub use schedule::{
    CreateScheduleTool, DeleteScheduleTool, ImportSchedulesTool, ListSchedulesTool,
    UpdateScheduleTool,
};
pub use schema::tool_call_schema_json;
pub use tag::{CreateTagTool, DeleteTagTool, ListTagTool, UpdateTagTool};
pub use timetable::{
    transform_timetable_values, transform_timetables, CreateTimeTableTool, DeleteTimeTableTool,
    ImportTimeTableTool, ListTimeTableTool, TimetableCell, UpdateTimeTableTool, TIMETABLE_COLORS,
};
pub use user::{GetStudyRoutineTool, GetUserInfoTool, GetUserScoreTool};

use crate::portal::Portal;
use crate::store::{Store, StoreError};

/// 注册全部领域工具（用户 / 日程 / 标签 / 课表）
pub fn default_registry(store: Arc<dyn Store>, portal: Arc<dyn Portal>) -> ToolRegistry {
    let mut tools = ToolRegistry::new();

    tools.register(GetUserInfoTool::new(store.clone()));
    tools.register(GetStudyRoutineTool::new(store.clone()));
    tools.register(GetUserScoreTool::new(store.clone()));

    tools.register(CreateScheduleTool::new(store.clone()));
    tools.register(ListSchedulesTool::new(store.clone()));
    tools.register(UpdateScheduleTool::new(store.clone()));
    tools.register(DeleteScheduleTool::new(store.clone()));
    tools.register(ImportSchedulesTool::new(portal.clone()));

    tools.register(CreateTagTool::new(store.clone()));
    tools.register(ListTagTool::new(store.clone()));
    tools.register(UpdateTagTool::new(store.clone()));
    tools.register(DeleteTagTool::new(store.clone()));

    tools.register(CreateTimeTableTool::new(store.clone()));
    tools.register(ListTimeTableTool::new(store.clone()));
    tools.register(UpdateTimeTableTool::new(store.clone()));
    tools.register(DeleteTimeTableTool::new(store));
    tools.register(ImportTimeTableTool::new(portal));

    tools
}

/// 把 JSON 参数解析为类型化参数结构；失败信息回传模型（模型据此向用户追问）
pub(crate) fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, String> {
    serde_json::from_value(args).map_err(|e| format!("invalid arguments: {e}"))
}

/// ISO 日期解析；格式错误原样告知模型，引导其向用户再确认
pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("날짜는 YYYY-MM-DD 형식이어야 합니다: {s}"))
}

pub(crate) fn parse_date_opt(s: Option<&str>) -> Result<Option<NaiveDate>, String> {
    s.map(parse_date).transpose()
}

/// 存储错误 -> 面向模型的说明文本
pub(crate) fn map_store_err(e: StoreError) -> String {
    match e {
        StoreError::NotFound(what) => format!("찾을 수 없습니다: {what}"),
        StoreError::Validation(what) => format!("요청 값이 올바르지 않습니다: {what}"),
        StoreError::Conflict(what) => format!("시간이 겹칩니다: {what}"),
    }
}
