//! 领域实体与参数对象
//!
//! 实体由外部存储拥有，这里只定义工具契约引用的形状。日期一律 ISO `YYYY-MM-DD`，
//! 时间 `HH:MM:SS`（chrono 序列化默认格式，与前端约定一致）。

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 标签颜色盘：创建顺序决定颜色，palette[已有数量 % len]
pub const TAG_COLORS: [&str; 8] = [
    "#24B0C9", "#FF3C6A", "#FF7A3C", "#D78D03", "#5272E9", "#2FB56B", "#9B59D0", "#7A8699",
];

/// 用户档案（认证在网关完成，这里只读取展示字段）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub student_id: String,
}

/// 学习例程：考前几周开始准备 + 复习类型
/// review_type 为 "SAMEDAY"（当日复习）或空格分隔的星期码组合（如 "MON WED FRI"）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyRoutine {
    pub weeks_before_exam: u32,
    pub review_type: String,
}

/// 每日分数：最近一条即当前分数（由外部评分任务写入）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub score: i32,
    pub date: NaiveDate,
    pub highest: i32,
    pub percentage: f64,
}

/// 标签：名称按用户唯一，颜色创建时确定后不再变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub user_id: i64,
}

/// 日程：对工具序列化时 tags 为已解析的名称列表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub scheduled_date: NaiveDate,
    pub deadline: Option<NaiveDate>,
    pub is_completed: bool,
    pub order_num: Option<i32>,
    pub user_id: i64,
    pub tags: Vec<String>,
}

/// 星期码（sun..sat），渲染时映射 sun=1..sat=7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Sun,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl Weekday {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sun" => Some(Weekday::Sun),
            "mon" => Some(Weekday::Mon),
            "tue" => Some(Weekday::Tue),
            "wed" => Some(Weekday::Wed),
            "thu" => Some(Weekday::Thu),
            "fri" => Some(Weekday::Fri),
            "sat" => Some(Weekday::Sat),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Sun => "sun",
            Weekday::Mon => "mon",
            Weekday::Tue => "tue",
            Weekday::Wed => "wed",
            Weekday::Thu => "thu",
            Weekday::Fri => "fri",
            Weekday::Sat => "sat",
        }
    }

    /// 渲染列号：sun=1 .. sat=7
    pub fn col(&self) -> u8 {
        match self {
            Weekday::Sun => 1,
            Weekday::Mon => 2,
            Weekday::Tue => 3,
            Weekday::Wed => 4,
            Weekday::Thu => 5,
            Weekday::Fri => 6,
            Weekday::Sat => 7,
        }
    }
}

/// 课表条目：同一用户同一星期内时间段不得重叠（存储层强制）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeTableEntry {
    pub id: i64,
    pub subject: String,
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub user_id: i64,
}

/// 对话记录：一次完整回合（提问 + 应答信封），历史窗口的数据源
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: i64,
    pub user_id: i64,
    pub query: String,
    pub answer: Value,
    pub created_at: DateTime<Utc>,
}

/// 日程创建参数
#[derive(Debug, Clone, Default)]
pub struct NewSchedule {
    pub title: String,
    pub content: Option<String>,
    pub scheduled_date: NaiveDate,
    pub deadline: Option<NaiveDate>,
    pub is_completed: bool,
    pub tags: Vec<String>,
}

/// 日程修改参数：仅 Some 的字段被修改；tags 为整体替换（非增量）
#[derive(Debug, Clone, Default)]
pub struct ScheduleChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub is_completed: Option<bool>,
    pub tags: Option<Vec<String>>,
}

/// 课表创建参数
#[derive(Debug, Clone)]
pub struct NewTimeTable {
    pub subject: String,
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// 课表修改参数
#[derive(Debug, Clone, Default)]
pub struct TimeTableChanges {
    pub subject: Option<String>,
    pub day_of_week: Option<Weekday>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}
