//! 学校门户（샘물 포털）同步触发客户端
//!
//! 爬虫子系统是独立服务且异步执行：这里只触发并拿受理确认，绝不等待数据落库。
//! Agent 必须向用户说「연동이 실행되었습니다」而非「완료되었습니다」，
//! 也不得在同一回合内假设导入数据已可查询。

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

/// 门户同步触发契约
#[async_trait]
pub trait Portal: Send + Sync {
    /// 触发学事日程导入，返回受理确认 JSON
    async fn trigger_schedule_sync(&self, user_id: i64) -> Result<Value, String>;

    /// 触发课表（课程表）导入，返回受理确认 JSON
    async fn trigger_timetable_sync(&self, user_id: i64) -> Result<Value, String>;
}

/// HTTP 实现：调用爬虫服务的触发端点
pub struct HttpPortal {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPortal {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn trigger(&self, path: &str, user_id: i64) -> Result<Value, String> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .header("X-User-Id", user_id.to_string())
            .send()
            .await
            .map_err(|e| format!("portal request failed: {e}"))?;
        if !response.status().is_success() {
            return Err(format!("portal returned {}", response.status()));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| format!("portal response is not JSON: {e}"))
    }
}

#[async_trait]
impl Portal for HttpPortal {
    async fn trigger_schedule_sync(&self, user_id: i64) -> Result<Value, String> {
        self.trigger("users/crawling", user_id).await
    }

    async fn trigger_timetable_sync(&self, user_id: i64) -> Result<Value, String> {
        self.trigger("users/timetable-sync", user_id).await
    }
}

/// 测试用：固定返回受理确认，不发网络请求
#[derive(Debug, Default)]
pub struct StubPortal;

#[async_trait]
impl Portal for StubPortal {
    async fn trigger_schedule_sync(&self, user_id: i64) -> Result<Value, String> {
        Ok(serde_json::json!({"accepted": true, "user_id": user_id, "kind": "schedules"}))
    }

    async fn trigger_timetable_sync(&self, user_id: i64) -> Result<Value, String> {
        Ok(serde_json::json!({"accepted": true, "user_id": user_id, "kind": "timetable"}))
    }
}
