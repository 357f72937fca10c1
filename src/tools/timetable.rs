//! 课表工具：创建 / 查询 / 修改 / 删除 / 学事同步
//!
//! list_timetable 直接产出渲染就绪形态：星期 -> sun=1..sat=7、HH:MM[:SS] -> 小数小时、
//! 颜色按「首次出现的科目名顺序」在 5 色盘内循环（单次响应内稳定，不落库）。
//! 同形变换被 Render Agent 复用，两处规则必须一致。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveTime, Timelike};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::{TemplateName, ToolReply};
use crate::portal::Portal;
use crate::store::{NewTimeTable, Store, StoreError, TimeTableChanges, TimeTableEntry, Weekday};
use crate::tools::schema::params_schema;
use crate::tools::{map_store_err, parse_args, Tool};

/// 课表单元格颜色盘（前景/背景/边框 class，前端约定值）
pub const TIMETABLE_COLORS: [&str; 5] = [
    "bg-[#E6FEFF] border-[#24B0C9] text-[#24B0C9]",
    "bg-[#FFBABE] border-[#FF3C6A] text-[#FF3C6A]",
    "bg-[#FFDDBA] border-[#FF7A3C] text-[#FF7A3C]",
    "bg-[#FFE7BA] border-[#D78D03] text-[#D78D03]",
    "bg-[#E9EFFF] border-[#5272E9] text-[#5272E9]",
];

/// 渲染用课表单元格
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableCell {
    pub name: String,
    pub col: u8,
    pub start_hour: f64,
    pub end_hour: f64,
    /// 缺失时由变换阶段补齐
    #[serde(default)]
    pub color: String,
}

/// 解析 "HH:MM" 或 "HH:MM:SS"
pub fn parse_time_str(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| format!("시간은 HH:MM 또는 HH:MM:SS 형식이어야 합니다: {s}"))
}

/// HH:MM[:SS] -> 小数小时（秒忽略）
pub fn time_to_hours(t: NaiveTime) -> f64 {
    t.hour() as f64 + t.minute() as f64 / 60.0
}

/// 存储实体 -> 渲染单元格：颜色按科目名首次出现顺序循环取色
pub fn transform_timetables(entries: &[TimeTableEntry]) -> Vec<TimetableCell> {
    let mut color_order: Vec<String> = Vec::new();
    entries
        .iter()
        .map(|e| {
            let color = color_for_subject(&mut color_order, &e.subject);
            TimetableCell {
                name: e.subject.clone(),
                col: e.day_of_week.col(),
                start_hour: time_to_hours(e.start_time),
                end_hour: time_to_hours(e.end_time),
                color,
            }
        })
        .collect()
}

/// 原始 JSON 行 -> 渲染单元格：Render Agent 的回退路径。
/// 已是单元格形态（name/col/..）的行校验后直接采用；原始形态（subject/day_of_week/..）按同一规则变换。
pub fn transform_timetable_values(rows: &[Value]) -> Result<Vec<TimetableCell>, String> {
    let mut color_order: Vec<String> = Vec::new();
    let mut cells = Vec::with_capacity(rows.len());
    for row in rows {
        if let Ok(mut cell) = serde_json::from_value::<TimetableCell>(row.clone()) {
            if cell.color.is_empty() {
                cell.color = color_for_subject(&mut color_order, &cell.name);
            } else {
                remember_subject(&mut color_order, &cell.name);
            }
            cells.push(cell);
            continue;
        }
        let subject = row
            .get("subject")
            .and_then(Value::as_str)
            .ok_or_else(|| format!("시간표 행을 해석할 수 없습니다: {row}"))?;
        let day = row
            .get("day_of_week")
            .and_then(Value::as_str)
            .and_then(Weekday::parse)
            .ok_or_else(|| format!("요일을 해석할 수 없습니다: {row}"))?;
        let start = parse_time_str(
            row.get("start_time")
                .and_then(Value::as_str)
                .ok_or_else(|| format!("start_time이 없습니다: {row}"))?,
        )?;
        let end = parse_time_str(
            row.get("end_time")
                .and_then(Value::as_str)
                .ok_or_else(|| format!("end_time이 없습니다: {row}"))?,
        )?;
        let color = color_for_subject(&mut color_order, subject);
        cells.push(TimetableCell {
            name: subject.to_string(),
            col: day.col(),
            start_hour: time_to_hours(start),
            end_hour: time_to_hours(end),
            color,
        });
    }
    Ok(cells)
}

fn remember_subject(order: &mut Vec<String>, subject: &str) {
    if !order.iter().any(|s| s == subject) {
        order.push(subject.to_string());
    }
}

fn color_for_subject(order: &mut Vec<String>, subject: &str) -> String {
    let idx = match order.iter().position(|s| s == subject) {
        Some(idx) => idx,
        None => {
            order.push(subject.to_string());
            order.len() - 1
        }
    };
    TIMETABLE_COLORS[idx % TIMETABLE_COLORS.len()].to_string()
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CreateTimeTableArgs {
    /// 사용자 id (필수)
    user_id: i64,
    /// 과목명 (필수); 과목명이 같으면 같은 수업으로 간주
    subject: String,
    /// 요일: mon, tue, wed, thu, fri, sat, sun (필수)
    day_of_week: String,
    /// 시작 시간, HH:MM 형식 (필수)
    start_time: String,
    /// 종료 시간, HH:MM 형식 (필수)
    end_time: String,
}

/// create_timetable：创建课表（时间段重叠由存储层拒绝）
pub struct CreateTimeTableTool {
    store: Arc<dyn Store>,
}

impl CreateTimeTableTool {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateTimeTableTool {
    fn name(&self) -> &str {
        "create_timetable"
    }

    fn description(&self) -> &str {
        "시간표를 생성하는 함수입니다. 모든 매개변수가 필수값이며, 없으면 사용자에게 물어보세요. \
         같은 요일에 시간이 겹치는 수업이 있으면 생성되지 않고 겹치는 수업 정보가 반환되므로 \
         이를 사용자에게 설명하세요. 과목명은 중복될 수 있습니다."
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<CreateTimeTableArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: CreateTimeTableArgs = parse_args(args)?;
        let day = Weekday::parse(&args.day_of_week)
            .ok_or_else(|| format!("요일은 mon..sun 중 하나여야 합니다: {}", args.day_of_week))?;
        let input = NewTimeTable {
            subject: args.subject,
            day_of_week: day,
            start_time: parse_time_str(&args.start_time)?,
            end_time: parse_time_str(&args.end_time)?,
        };
        match self.store.create_timetable(args.user_id, input).await {
            Ok(entry) => {
                let reply = ToolReply::new(
                    "생성된 시간표입니다.",
                    Some(serde_json::to_value(entry).map_err(|e| e.to_string())?),
                );
                Ok(reply.into_json())
            }
            // 重叠不是错误而是提示对象：以消息返回，不创建
            Err(StoreError::Conflict(detail)) => Ok(ToolReply::new(
                format!("같은 시간대에 겹치는 수업이 있어 생성하지 않았습니다: {detail}"),
                None,
            )
            .into_json()),
            Err(e) => Err(map_store_err(e)),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ListTimeTableArgs {
    /// 사용자 id (필수)
    user_id: i64,
}

/// list_timetable：课表列表查询（直接返回渲染就绪形态）
pub struct ListTimeTableTool {
    store: Arc<dyn Store>,
}

impl ListTimeTableTool {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListTimeTableTool {
    fn name(&self) -> &str {
        "list_timetable"
    }

    fn description(&self) -> &str {
        "사용자 id를 받아 해당 사용자의 시간표 목록을 렌더링용 데이터 형태로 반환합니다. \
         반환된 data와 렌더링 힌트(render_html, template_name)를 최종 응답에 그대로 사용할 수 있습니다."
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<ListTimeTableArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: ListTimeTableArgs = parse_args(args)?;
        let entries = self
            .store
            .list_timetable(args.user_id)
            .await
            .map_err(map_store_err)?;
        let cells = transform_timetables(&entries);
        let mut reply = ToolReply::new(
            "회원님의 시간표 목록입니다.",
            Some(json!({ "timetables": cells })),
        );
        reply.render_html = Some(true);
        reply.template_name = Some(TemplateName::TimetableList);
        Ok(reply.into_json())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct UpdateTimeTableArgs {
    /// 사용자 id (필수)
    user_id: i64,
    /// 수정할 시간표 id (필수)
    timetable_id: i64,
    /// 과목명
    #[serde(default)]
    subject: Option<String>,
    /// 요일: mon..sun
    #[serde(default)]
    day_of_week: Option<String>,
    /// 시작 시간 (HH:MM)
    #[serde(default)]
    start_time: Option<String>,
    /// 종료 시간 (HH:MM)
    #[serde(default)]
    end_time: Option<String>,
}

/// update_timetable：修改课表
pub struct UpdateTimeTableTool {
    store: Arc<dyn Store>,
}

impl UpdateTimeTableTool {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateTimeTableTool {
    fn name(&self) -> &str {
        "update_timetable"
    }

    fn description(&self) -> &str {
        "시간표를 수정하는 함수입니다. 사용자 id와 시간표 id를 받아 전달된 필드만 수정합니다. \
         수정 결과가 다른 수업과 겹치면 수정되지 않고 겹치는 수업 정보가 반환됩니다."
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<UpdateTimeTableArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: UpdateTimeTableArgs = parse_args(args)?;
        let day = match args.day_of_week.as_deref() {
            Some(s) => Some(
                Weekday::parse(s)
                    .ok_or_else(|| format!("요일은 mon..sun 중 하나여야 합니다: {s}"))?,
            ),
            None => None,
        };
        let changes = TimeTableChanges {
            subject: args.subject,
            day_of_week: day,
            start_time: args.start_time.as_deref().map(parse_time_str).transpose()?,
            end_time: args.end_time.as_deref().map(parse_time_str).transpose()?,
        };
        match self
            .store
            .update_timetable(args.user_id, args.timetable_id, changes)
            .await
        {
            Ok(entry) => {
                let reply = ToolReply::new(
                    "수정된 시간표입니다.",
                    Some(serde_json::to_value(entry).map_err(|e| e.to_string())?),
                );
                Ok(reply.into_json())
            }
            Err(StoreError::Conflict(detail)) => Ok(ToolReply::new(
                format!("같은 시간대에 겹치는 수업이 있어 수정하지 않았습니다: {detail}"),
                None,
            )
            .into_json()),
            Err(e) => Err(map_store_err(e)),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct DeleteTimeTableArgs {
    /// 삭제할 시간표 id (필수)
    timetable_id: i64,
}

/// delete_timetable：删除课表
pub struct DeleteTimeTableTool {
    store: Arc<dyn Store>,
}

impl DeleteTimeTableTool {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DeleteTimeTableTool {
    fn name(&self) -> &str {
        "delete_timetable"
    }

    fn description(&self) -> &str {
        "시간표를 삭제하는 함수입니다. 시간표 id를 받아 해당 시간표를 삭제합니다. \
         먼저 list_timetable로 사용자의 시간표가 맞는지 확인한 후 호출하세요."
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<DeleteTimeTableArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: DeleteTimeTableArgs = parse_args(args)?;
        self.store
            .delete_timetable(args.timetable_id)
            .await
            .map_err(map_store_err)?;
        Ok(ToolReply::new("시간표가 삭제되었습니다.", None).into_json())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ImportTimeTableArgs {
    /// 사용자 id (필수)
    user_id: i64,
}

/// import_timetable：触发学事系统课表同步（异步）
pub struct ImportTimeTableTool {
    portal: Arc<dyn Portal>,
}

impl ImportTimeTableTool {
    pub fn new(portal: Arc<dyn Portal>) -> Self {
        Self { portal }
    }
}

#[async_trait]
impl Tool for ImportTimeTableTool {
    fn name(&self) -> &str {
        "import_timetable"
    }

    fn description(&self) -> &str {
        "크롤링 서비스를 호출하여 사용자의 시간표를 가져오는 함수입니다. \
         비동기이므로 바로 시간표가 반영되지 않을 수 있습니다. '연동이 실행 중'이라고 안내하세요."
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<ImportTimeTableArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: ImportTimeTableArgs = parse_args(args)?;
        let ack = self.portal.trigger_timetable_sync(args.user_id).await?;
        Ok(ToolReply::new("학사 시스템 연동이 실행되었습니다.", Some(ack)).into_json())
    }
}
