//! 存储契约
//!
//! 持久化属于外部协作者；核心只依赖这里的 Store trait。所有读写按 user_id 限定范围，
//! 多行写入（日程 + 标签 关联）在单次调用内保证原子。MemoryStore 为进程内参考实现，
//! 供开发与测试使用；接生产数据库时实现同一 trait 即可。

pub mod memory;
pub mod types;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

pub use memory::MemoryStore;
pub use types::{
    ChatTurn, NewSchedule, NewTimeTable, Schedule, ScheduleChanges, ScoreEntry, StudyRoutine,
    Tag, TimeTableChanges, TimeTableEntry, UserProfile, Weekday, TAG_COLORS,
};

/// 存储层错误：NotFound / Validation 由工具转为面向用户的自然语言
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation: {0}")]
    Validation(String),

    /// 课表时间段重叠等冲突
    #[error("conflict: {0}")]
    Conflict(String),
}

#[async_trait]
pub trait Store: Send + Sync {
    // ---- 用户 ----
    async fn get_user(&self, user_id: i64) -> Result<Option<UserProfile>, StoreError>;
    async fn get_study_routine(&self, user_id: i64) -> Result<Option<StudyRoutine>, StoreError>;
    /// 按日期倒序（最新在前，最新一条即当前分数）
    async fn list_scores(&self, user_id: i64) -> Result<Vec<ScoreEntry>, StoreError>;

    // ---- 日程 ----
    /// 日程与标签的关联为原子操作；新建标签按调色盘顺序取色
    async fn create_schedule(
        &self,
        user_id: i64,
        input: NewSchedule,
    ) -> Result<Schedule, StoreError>;
    /// to 为 None 时按 from 当日精确匹配，否则 [from, to] 闭区间；tag_name 进一步过滤
    async fn list_schedules(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: Option<NaiveDate>,
        tag_name: Option<&str>,
    ) -> Result<Vec<Schedule>, StoreError>;
    /// 须属于 user_id；changes.tags 为整体替换
    async fn update_schedule(
        &self,
        user_id: i64,
        schedule_id: i64,
        changes: ScheduleChanges,
    ) -> Result<Schedule, StoreError>;
    /// 无所有权检查（调用方已通过先行查询确认所有权）
    async fn delete_schedule(&self, schedule_id: i64) -> Result<(), StoreError>;

    // ---- 标签 ----
    /// 幂等：同名已存在则原样返回，不改颜色
    async fn get_or_create_tag(&self, user_id: i64, name: &str) -> Result<Tag, StoreError>;
    async fn list_tags(&self, user_id: i64) -> Result<Vec<Tag>, StoreError>;
    async fn rename_tag(&self, user_id: i64, tag_id: i64, name: &str) -> Result<Tag, StoreError>;
    async fn delete_tag(&self, tag_id: i64) -> Result<(), StoreError>;

    // ---- 课表 ----
    /// 同一用户同一星期时间段重叠 -> Conflict，不插入
    async fn create_timetable(
        &self,
        user_id: i64,
        input: NewTimeTable,
    ) -> Result<TimeTableEntry, StoreError>;
    async fn list_timetable(&self, user_id: i64) -> Result<Vec<TimeTableEntry>, StoreError>;
    async fn update_timetable(
        &self,
        user_id: i64,
        timetable_id: i64,
        changes: TimeTableChanges,
    ) -> Result<TimeTableEntry, StoreError>;
    async fn delete_timetable(&self, timetable_id: i64) -> Result<(), StoreError>;

    // ---- 对话记录 ----
    async fn append_chat_turn(
        &self,
        user_id: i64,
        query: &str,
        answer: Value,
    ) -> Result<ChatTurn, StoreError>;
    /// 最新在前，最多 limit 条
    async fn recent_chat_turns(&self, user_id: i64, limit: usize)
        -> Result<Vec<ChatTurn>, StoreError>;
}
