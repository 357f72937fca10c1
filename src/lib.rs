//! Dulo - 大学生学习/日程管理助手后端
//!
//! 模块划分：
//! - **agent**: Core Agent（意图解析 + 工具编排）与 Render Agent（展示数据变换 + 模板渲染）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、回合状态、响应信封（envelope）解析与校验
//! - **graph**: 两节点编排图（core -> 条件 render -> end）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **portal**: 学校门户爬虫子系统的触发客户端（异步同步，仅返回受理确认）
//! - **server**: axum HTTP 层（/api/chat）
//! - **store**: 领域实体与存储契约（Store trait + 内存实现）
//! - **tools**: 领域工具箱（日程/标签/课表/用户 CRUD）与执行器

pub mod agent;
pub mod config;
pub mod core;
pub mod graph;
pub mod llm;
pub mod observability;
pub mod portal;
pub mod server;
pub mod store;
pub mod tools;
