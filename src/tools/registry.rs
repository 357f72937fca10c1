//! 工具注册表
//!
//! 所有领域操作（日程/标签/课表/用户）实现 Tool trait（name / description /
//! parameters_schema / execute），由 ToolRegistry 按名注册与查找。
//! description 与 parameters_schema 本身就是外部契约的一部分：它们被注入规划模型的
//! system prompt，改工具行为必须同步改描述，否则规划器会用错。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

/// 工具 trait：名称、描述（供 LLM 理解，含边界情况与必填说明）、参数 schema、异步执行
///
/// 返回约定：Ok 为 ToolReply 的 JSON 字符串（查询无结果时为字面量 "null"，与出错可区分）；
/// Err 为面向模型的失败说明，由 Core Agent 转成 Observation 让模型向用户致歉或追问。
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（模型 JSON 中的 "tool" 字段）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能与调用时机）
    fn description(&self) -> &str;

    /// 参数 JSON Schema（供 LLM 生成正确的参数格式）
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 执行工具
    async fn execute(&self, args: Value) -> Result<String, String>;
}

/// 工具注册表：按名称存储 Arc<dyn Tool>，支持 register / get / execute / tool_specs
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub async fn execute(&self, name: &str, args: Value) -> Result<String, String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| format!("Unknown tool: {name}"))?;
        tool.execute(args).await
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// (name, description, parameters_schema) 列表，按名称排序，用于拼 system prompt
    pub fn tool_specs(&self) -> Vec<(String, String, Value)> {
        let mut specs: Vec<(String, String, Value)> = self
            .tools
            .values()
            .map(|tool| {
                (
                    tool.name().to_string(),
                    tool.description().to_string(),
                    tool.parameters_schema(),
                )
            })
            .collect();
        specs.sort_by(|a, b| a.0.cmp(&b.0));
        specs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo text (for testing)"
        }

        async fn execute(&self, args: Value) -> Result<String, String> {
            Ok(args.get("text").and_then(Value::as_str).unwrap_or("").to_string())
        }
    }

    #[tokio::test]
    async fn register_and_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        let out = registry
            .execute("echo", serde_json::json!({"text": "hi"}))
            .await
            .unwrap();
        assert_eq!(out, "hi");
        assert!(registry
            .execute("nope", Value::Null)
            .await
            .unwrap_err()
            .contains("Unknown tool"));
    }
}
