//! 日程工具：创建 / 查询 / 修改 / 删除 / 学事同步
//!
//! 查询无结果时返回字面量 "null"（与出错可区分）；多日期请求由 Core Agent 拆成多次调用后
//! 自行合并——单次调用只回答一个日期或一个闭区间。

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::core::ToolReply;
use crate::portal::Portal;
use crate::store::{NewSchedule, ScheduleChanges, Store};
use crate::tools::schema::params_schema;
use crate::tools::{map_store_err, parse_args, parse_date, parse_date_opt, Tool};

#[derive(Debug, Deserialize, JsonSchema)]
struct CreateScheduleArgs {
    /// 사용자 id (필수)
    user_id: i64,
    /// 일정의 제목 (필수)
    title: String,
    /// 일정 날짜, YYYY-MM-DD 형식의 문자열 (필수)
    scheduled_date: String,
    /// 일정의 내용
    #[serde(default)]
    content: Option<String>,
    /// 태그 이름 리스트 (["태그이름1", "태그이름2", ..])
    #[serde(default)]
    tags: Option<Vec<String>>,
    /// 마감 날짜, YYYY-MM-DD 형식의 문자열
    #[serde(default)]
    deadline: Option<String>,
    /// 완료 여부
    #[serde(default)]
    is_completed: Option<bool>,
}

/// create_schedule：创建日程（含标签关联处理，整体原子）
pub struct CreateScheduleTool {
    store: Arc<dyn Store>,
}

impl CreateScheduleTool {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateScheduleTool {
    fn name(&self) -> &str {
        "create_schedule"
    }

    fn description(&self) -> &str {
        "일정을 생성하는 함수입니다. 사용자 id를 받아 해당 사용자의 일정을 생성합니다. \
         user_id, title, scheduled_date는 필수이며, 필수값이 없으면 호출하지 말고 사용자에게 물어보세요. \
         tags에 있는 태그는 이미 존재하면 재사용하고 없으면 새로 만듭니다."
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<CreateScheduleArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: CreateScheduleArgs = parse_args(args)?;
        let input = NewSchedule {
            title: args.title,
            content: args.content,
            scheduled_date: parse_date(&args.scheduled_date)?,
            deadline: parse_date_opt(args.deadline.as_deref())?,
            is_completed: args.is_completed.unwrap_or(false),
            tags: args.tags.unwrap_or_default(),
        };
        let schedule = self
            .store
            .create_schedule(args.user_id, input)
            .await
            .map_err(map_store_err)?;
        let reply = ToolReply::new(
            "일정이 생성되었습니다.",
            Some(serde_json::to_value(schedule).map_err(|e| e.to_string())?),
        );
        Ok(reply.into_json())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ListSchedulesArgs {
    /// 사용자 id (필수)
    user_id: i64,
    /// 일정 날짜, YYYY-MM-DD 형식의 문자열 (필수)
    scheduled_date: String,
    /// 마감 날짜(YYYY-MM-DD); 지정 시 [scheduled_date, deadline] 범위 조회
    #[serde(default)]
    deadline: Option<String>,
    /// 태그 이름으로 추가 필터
    #[serde(default)]
    tag_name: Option<String>,
}

/// list_schedules：日程列表查询（单日或闭区间）
pub struct ListSchedulesTool {
    store: Arc<dyn Store>,
}

impl ListSchedulesTool {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListSchedulesTool {
    fn name(&self) -> &str {
        "list_schedules"
    }

    fn description(&self) -> &str {
        "일정 목록 조회 함수입니다. user_id, scheduled_date는 필수입니다. \
         scheduled_date가 명시되지 않은 경우 사용자에게 날짜 명시를 요구하세요. \
         하루 일정만 조회하고 싶은 경우 deadline을 생략, 여러 날짜의 일정을 조회하고 싶을 때 deadline을 지정합니다. \
         \"1일, 3일, 10일 일정 조회해줘\"와 같은 요청은 본 함수를 세 번 호출한 후 결과를 취합하세요. \
         결과가 없으면 null을 반환합니다(오류가 아님)."
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<ListSchedulesArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: ListSchedulesArgs = parse_args(args)?;
        let from = parse_date(&args.scheduled_date)?;
        let to = parse_date_opt(args.deadline.as_deref())?;
        let schedules = self
            .store
            .list_schedules(args.user_id, from, to, args.tag_name.as_deref())
            .await
            .map_err(map_store_err)?;
        if schedules.is_empty() {
            // 「无结果」信号：与出错可区分的 null
            return Ok("null".to_string());
        }
        let reply = ToolReply::new(
            "확인된 일정 목록입니다.",
            Some(serde_json::to_value(schedules).map_err(|e| e.to_string())?),
        );
        Ok(reply.into_json())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct UpdateScheduleArgs {
    /// 사용자 id (필수)
    user_id: i64,
    /// 수정할 일정 id (필수)
    schedule_id: i64,
    /// 일정의 제목
    #[serde(default)]
    title: Option<String>,
    /// 일정의 내용
    #[serde(default)]
    content: Option<String>,
    /// 일정 날짜 (YYYY-MM-DD)
    #[serde(default)]
    scheduled_date: Option<String>,
    /// 태그 이름 리스트; 지정 시 기존 태그를 전부 대체
    #[serde(default)]
    tags: Option<Vec<String>>,
    /// 마감 날짜 (YYYY-MM-DD)
    #[serde(default)]
    deadline: Option<String>,
    /// 완료 여부
    #[serde(default)]
    is_completed: Option<bool>,
}

/// update_schedule：修改日程（先验所有权再变更）
pub struct UpdateScheduleTool {
    store: Arc<dyn Store>,
}

impl UpdateScheduleTool {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateScheduleTool {
    fn name(&self) -> &str {
        "update_schedule"
    }

    fn description(&self) -> &str {
        "일정을 수정하는 함수입니다. 사용자 id와 일정 id를 받아 해당 일정이 사용자의 것인지 확인한 후 수정합니다. \
         전달된 필드만 변경됩니다. tags가 있다면 기존 태그들은 모두 사라지고 tags로 바뀝니다. \
         기존 태그를 유지하며 추가/삭제하려면 먼저 일정을 조회해 태그를 확인한 뒤 원하는 전체 태그 리스트를 전달하세요. \
         예: 태그1이 연결된 일정에 태그2를 추가 -> 조회로 태그1 확인 -> tags=[\"태그1\",\"태그2\"] 전달."
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<UpdateScheduleArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: UpdateScheduleArgs = parse_args(args)?;
        let changes = ScheduleChanges {
            title: args.title,
            content: args.content,
            scheduled_date: parse_date_opt(args.scheduled_date.as_deref())?,
            deadline: parse_date_opt(args.deadline.as_deref())?,
            is_completed: args.is_completed,
            tags: args.tags,
        };
        let schedule = self
            .store
            .update_schedule(args.user_id, args.schedule_id, changes)
            .await
            .map_err(map_store_err)?;
        let reply = ToolReply::new(
            "일정이 수정되었습니다.",
            Some(serde_json::to_value(schedule).map_err(|e| e.to_string())?),
        );
        Ok(reply.into_json())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct DeleteScheduleArgs {
    /// 삭제할 일정 id (필수)
    schedule_id: i64,
}

/// delete_schedule：删除日程（所有权由先行查询确认）
pub struct DeleteScheduleTool {
    store: Arc<dyn Store>,
}

impl DeleteScheduleTool {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DeleteScheduleTool {
    fn name(&self) -> &str {
        "delete_schedule"
    }

    fn description(&self) -> &str {
        "일정을 삭제하는 함수입니다. 일정 id를 받아 해당 일정을 삭제합니다. \
         반드시 먼저 일정을 조회해 사용자의 일정이 맞는지 확인한 후 호출하세요."
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<DeleteScheduleArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: DeleteScheduleArgs = parse_args(args)?;
        self.store
            .delete_schedule(args.schedule_id)
            .await
            .map_err(map_store_err)?;
        Ok(ToolReply::new("일정이 삭제되었습니다.", None).into_json())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ImportArgs {
    /// 사용자 id (필수)
    user_id: i64,
}

/// import_schedules：触发学事系统日程同步（异步，只返回受理确认）
pub struct ImportSchedulesTool {
    portal: Arc<dyn Portal>,
}

impl ImportSchedulesTool {
    pub fn new(portal: Arc<dyn Portal>) -> Self {
        Self { portal }
    }
}

#[async_trait]
impl Tool for ImportSchedulesTool {
    fn name(&self) -> &str {
        "import_schedules"
    }

    fn description(&self) -> &str {
        "크롤링 서비스를 호출하여 학사 시스템 일정을 가져오는 함수입니다. \
         비동기이므로 완료가 아니라 '연동이 실행 중'이라고 안내하세요. \
         같은 대화 안에서 가져온 일정이 바로 조회된다고 가정하면 안 됩니다."
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<ImportArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: ImportArgs = parse_args(args)?;
        let ack = self.portal.trigger_schedule_sync(args.user_id).await?;
        Ok(ToolReply::new("학사 시스템 연동이 실행되었습니다.", Some(ack)).into_json())
    }
}
