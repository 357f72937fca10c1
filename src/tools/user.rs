//! 用户查询工具：档案 / 学习例程 / 分数
//!
//! 均为只读；查无此人时返回礼貌提示信封而非错误（模型据此向用户解释）。

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::ToolReply;
use crate::store::Store;
use crate::tools::schema::params_schema;
use crate::tools::{map_store_err, parse_args, Tool};

#[derive(Debug, Deserialize, JsonSchema)]
struct UserIdArgs {
    /// 사용자 id (필수)
    user_id: i64,
}

/// get_user_info：用户信息查询
pub struct GetUserInfoTool {
    store: Arc<dyn Store>,
}

impl GetUserInfoTool {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetUserInfoTool {
    fn name(&self) -> &str {
        "get_user_info"
    }

    fn description(&self) -> &str {
        "사용자 정보를 조회하는 함수입니다. user_id는 필수입니다."
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<UserIdArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: UserIdArgs = parse_args(args)?;
        let user = self.store.get_user(args.user_id).await.map_err(map_store_err)?;
        let reply = match user {
            Some(profile) => ToolReply::new(
                "확인된 사용자 정보입니다.",
                Some(json!({"email": profile.email, "student_id": profile.student_id})),
            ),
            None => ToolReply::new("사용자를 찾을 수 없습니다.", None),
        };
        Ok(reply.into_json())
    }
}

/// get_user_study_routine：学习例程查询
pub struct GetStudyRoutineTool {
    store: Arc<dyn Store>,
}

impl GetStudyRoutineTool {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetStudyRoutineTool {
    fn name(&self) -> &str {
        "get_user_study_routine"
    }

    fn description(&self) -> &str {
        "사용자 학습 루틴 정보를 조회하는 함수입니다. \
         반환 값 중 weeks_before_exam은 시험 기간을 시험 몇 주 전으로 여기는지에 대한 정보입니다. \
         review_type은 사용자의 복습 타입으로 \"SAMEDAY\"일 경우 학습 당일 복습, \
         그 외 \"MON\", \"TUE\", \"WED\" 등 요일 영어명 앞 세 글자의 조합일 경우 해당 요일에 복습하는 타입입니다."
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<UserIdArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: UserIdArgs = parse_args(args)?;
        let routine = self
            .store
            .get_study_routine(args.user_id)
            .await
            .map_err(map_store_err)?;
        let reply = match routine {
            Some(routine) => ToolReply::new(
                "확인된 사용자 학습 루틴 정보입니다.",
                Some(json!({
                    "시험 기간": format!("시험 시작 {}주 전", routine.weeks_before_exam),
                    "복습 유형": routine.review_type,
                })),
            ),
            None => ToolReply::new("학습 루틴 정보를 찾을 수 없습니다.", None),
        };
        Ok(reply.into_json())
    }
}

/// get_user_score：分数历史查询（最新一条即当前分数）
pub struct GetUserScoreTool {
    store: Arc<dyn Store>,
}

impl GetUserScoreTool {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetUserScoreTool {
    fn name(&self) -> &str {
        "get_user_score"
    }

    fn description(&self) -> &str {
        "사용자 점수 정보를 조회하는 함수입니다. 가장 최근 점수 정보가 현재 점수입니다."
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<UserIdArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: UserIdArgs = parse_args(args)?;
        let scores = self
            .store
            .list_scores(args.user_id)
            .await
            .map_err(map_store_err)?;
        let reply = ToolReply::new(
            "확인된 사용자 점수 정보입니다.",
            Some(serde_json::to_value(scores).map_err(|e| e.to_string())?),
        );
        Ok(reply.into_json())
    }
}
