//! 标签工具：创建 / 查询 / 改名 / 删除
//!
//! 创建是幂等的（同名已存在则原样返回）；颜色由存储层按调色盘顺序分配，创建后不变。

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::core::ToolReply;
use crate::store::Store;
use crate::tools::schema::params_schema;
use crate::tools::{map_store_err, parse_args, Tool};

#[derive(Debug, Deserialize, JsonSchema)]
struct CreateTagArgs {
    /// 사용자 id (필수)
    user_id: i64,
    /// 태그 이름 (필수)
    name: String,
}

/// create_tag：创建标签，同名已存在则返回原记录
pub struct CreateTagTool {
    store: Arc<dyn Store>,
}

impl CreateTagTool {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateTagTool {
    fn name(&self) -> &str {
        "create_tag"
    }

    fn description(&self) -> &str {
        "사용자 id와 태그 이름을 받아 태그를 생성하거나, 이미 존재하는 태그일 경우 이를 반환하는 함수입니다."
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<CreateTagArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: CreateTagArgs = parse_args(args)?;
        let tag = self
            .store
            .get_or_create_tag(args.user_id, &args.name)
            .await
            .map_err(map_store_err)?;
        let reply = ToolReply::new(
            "태그가 생성되었습니다.",
            Some(serde_json::to_value(tag).map_err(|e| e.to_string())?),
        );
        Ok(reply.into_json())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ListTagArgs {
    /// 사용자 id (필수)
    user_id: i64,
}

/// list_tag：标签列表查询
pub struct ListTagTool {
    store: Arc<dyn Store>,
}

impl ListTagTool {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListTagTool {
    fn name(&self) -> &str {
        "list_tag"
    }

    fn description(&self) -> &str {
        "태그 목록을 조회하는 함수입니다. 태그별 일정 보기(tag_list 템플릿)를 만들 때는 \
         이 함수로 태그 이름과 색상을 가져온 뒤 list_schedules 결과와 함께 data에 넣으세요."
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<ListTagArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: ListTagArgs = parse_args(args)?;
        let tags = self.store.list_tags(args.user_id).await.map_err(map_store_err)?;
        let reply = ToolReply::new(
            "확인된 태그 목록입니다.",
            Some(serde_json::to_value(tags).map_err(|e| e.to_string())?),
        );
        Ok(reply.into_json())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct UpdateTagArgs {
    /// 사용자 id (필수)
    user_id: i64,
    /// 수정할 태그 id (필수)
    tag_id: i64,
    /// 새 태그 이름 (필수)
    name: String,
}

/// update_tag：修改标签名
pub struct UpdateTagTool {
    store: Arc<dyn Store>,
}

impl UpdateTagTool {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateTagTool {
    fn name(&self) -> &str {
        "update_tag"
    }

    fn description(&self) -> &str {
        "태그 이름을 수정하는 함수입니다. 사용자 id와 태그 id를 받아 해당 태그가 사용자의 것인지 확인한 후 수정합니다."
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<UpdateTagArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: UpdateTagArgs = parse_args(args)?;
        let tag = self
            .store
            .rename_tag(args.user_id, args.tag_id, &args.name)
            .await
            .map_err(map_store_err)?;
        let reply = ToolReply::new(
            "태그 이름이 수정되었습니다.",
            Some(serde_json::to_value(tag).map_err(|e| e.to_string())?),
        );
        Ok(reply.into_json())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct DeleteTagArgs {
    /// 삭제할 태그 id (필수)
    tag_id: i64,
}

/// delete_tag：删除标签
pub struct DeleteTagTool {
    store: Arc<dyn Store>,
}

impl DeleteTagTool {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DeleteTagTool {
    fn name(&self) -> &str {
        "delete_tag"
    }

    fn description(&self) -> &str {
        "태그를 삭제하는 함수입니다. 태그 id를 받아 해당 태그를 삭제합니다. \
         먼저 list_tag로 사용자의 태그가 맞는지 확인한 후 호출하세요."
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<DeleteTagArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: DeleteTagArgs = parse_args(args)?;
        self.store.delete_tag(args.tag_id).await.map_err(map_store_err)?;
        Ok(ToolReply::new("태그가 삭제되었습니다.", None).into_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, UserProfile, TAG_COLORS};
    use serde_json::json;

    #[tokio::test]
    async fn create_is_idempotent_per_user() {
        let store = Arc::new(MemoryStore::new());
        store
            .seed_user(UserProfile {
                id: 1,
                email: "stu@smu.ac.kr".to_string(),
                student_id: "202012345".to_string(),
            })
            .await;
        let tool = CreateTagTool::new(store.clone());

        let out = tool.execute(json!({"user_id": 1, "name": "전공"})).await.unwrap();
        let first: Value = serde_json::from_str(&out).unwrap();
        let out = tool.execute(json!({"user_id": 1, "name": "전공"})).await.unwrap();
        let second: Value = serde_json::from_str(&out).unwrap();

        assert_eq!(first["data"]["id"], second["data"]["id"]);
        assert_eq!(first["data"]["color"], TAG_COLORS[0]);
    }
}
