//! 内存存储实现
//!
//! 单把 RwLock 保护全部表，一次写锁内完成的多行变更天然原子（日程 + 标签 关联）。
//! id 为进程内自增整数。仅限开发/测试；数据不落盘。

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::store::types::*;
use crate::store::{Store, StoreError};

#[derive(Debug)]
struct UserRecord {
    profile: UserProfile,
    routine: Option<StudyRoutine>,
    scores: Vec<ScoreEntry>,
}

/// 日程行：内部持 tag_ids，读出时解析为名称
#[derive(Debug, Clone)]
struct ScheduleRow {
    id: i64,
    title: String,
    content: Option<String>,
    scheduled_date: NaiveDate,
    deadline: Option<NaiveDate>,
    is_completed: bool,
    order_num: Option<i32>,
    user_id: i64,
    tag_ids: Vec<i64>,
}

#[derive(Debug, Default)]
struct Inner {
    users: BTreeMap<i64, UserRecord>,
    schedules: BTreeMap<i64, ScheduleRow>,
    tags: BTreeMap<i64, Tag>,
    timetables: BTreeMap<i64, TimeTableEntry>,
    chat_turns: Vec<ChatTurn>,
    next_id: i64,
}

impl Inner {
    fn alloc_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn require_user(&self, user_id: i64) -> Result<(), StoreError> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("user {user_id}")))
        }
    }

    fn user_tag_count(&self, user_id: i64) -> usize {
        self.tags.values().filter(|t| t.user_id == user_id).count()
    }

    /// 批量解析标签名：已有的复用，新建的按 (当前数量 + 批内序号) % len 取色
    fn resolve_tags(&mut self, user_id: i64, names: &[String]) -> Vec<i64> {
        let mut ids = Vec::with_capacity(names.len());
        let mut created_in_batch = 0usize;
        let base_count = self.user_tag_count(user_id);
        for name in names {
            let existing = self
                .tags
                .values()
                .find(|t| t.user_id == user_id && t.name == *name)
                .map(|t| t.id);
            match existing {
                Some(id) => {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                None => {
                    let id = self.alloc_id();
                    let color =
                        TAG_COLORS[(base_count + created_in_batch) % TAG_COLORS.len()].to_string();
                    created_in_batch += 1;
                    self.tags.insert(
                        id,
                        Tag {
                            id,
                            name: name.clone(),
                            color,
                            user_id,
                        },
                    );
                    ids.push(id);
                }
            }
        }
        ids
    }

    fn materialize(&self, row: &ScheduleRow) -> Schedule {
        let tags = row
            .tag_ids
            .iter()
            .filter_map(|id| self.tags.get(id).map(|t| t.name.clone()))
            .collect();
        Schedule {
            id: row.id,
            title: row.title.clone(),
            content: row.content.clone(),
            scheduled_date: row.scheduled_date,
            deadline: row.deadline,
            is_completed: row.is_completed,
            order_num: row.order_num,
            user_id: row.user_id,
            tags,
        }
    }

    /// [start, end) 相交判定；start >= end 直接视为参数错误
    fn check_overlap(
        &self,
        user_id: i64,
        entry: &NewTimeTable,
        exclude_id: Option<i64>,
    ) -> Result<(), StoreError> {
        if entry.start_time >= entry.end_time {
            return Err(StoreError::Validation(
                "start_time must be before end_time".to_string(),
            ));
        }
        let clash = self.timetables.values().find(|t| {
            t.user_id == user_id
                && Some(t.id) != exclude_id
                && t.day_of_week == entry.day_of_week
                && t.start_time < entry.end_time
                && entry.start_time < t.end_time
        });
        match clash {
            Some(t) => Err(StoreError::Conflict(format!(
                "{} {}~{} ({})",
                t.day_of_week.as_str(),
                t.start_time,
                t.end_time,
                t.subject
            ))),
            None => Ok(()),
        }
    }
}

/// 进程内存储：Store trait 的参考实现
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 测试/开发用种子：写入用户档案（id 由调用方指定）
    pub async fn seed_user(&self, profile: UserProfile) {
        let mut inner = self.inner.write().await;
        inner.users.insert(
            profile.id,
            UserRecord {
                profile,
                routine: None,
                scores: Vec::new(),
            },
        );
    }

    pub async fn seed_study_routine(&self, user_id: i64, routine: StudyRoutine) {
        let mut inner = self.inner.write().await;
        if let Some(u) = inner.users.get_mut(&user_id) {
            u.routine = Some(routine);
        }
    }

    pub async fn seed_score(&self, user_id: i64, entry: ScoreEntry) {
        let mut inner = self.inner.write().await;
        if let Some(u) = inner.users.get_mut(&user_id) {
            u.scores.push(entry);
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_user(&self, user_id: i64) -> Result<Option<UserProfile>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&user_id).map(|u| u.profile.clone()))
    }

    async fn get_study_routine(&self, user_id: i64) -> Result<Option<StudyRoutine>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&user_id).and_then(|u| u.routine.clone()))
    }

    async fn list_scores(&self, user_id: i64) -> Result<Vec<ScoreEntry>, StoreError> {
        let inner = self.inner.read().await;
        let mut scores = inner
            .users
            .get(&user_id)
            .map(|u| u.scores.clone())
            .unwrap_or_default();
        scores.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(scores)
    }

    async fn create_schedule(
        &self,
        user_id: i64,
        input: NewSchedule,
    ) -> Result<Schedule, StoreError> {
        let mut inner = self.inner.write().await;
        inner.require_user(user_id)?;
        let tag_ids = inner.resolve_tags(user_id, &input.tags);
        let id = inner.alloc_id();
        let row = ScheduleRow {
            id,
            title: input.title,
            content: input.content,
            scheduled_date: input.scheduled_date,
            deadline: input.deadline,
            is_completed: input.is_completed,
            order_num: None,
            user_id,
            tag_ids,
        };
        let schedule = inner.materialize(&row);
        inner.schedules.insert(id, row);
        Ok(schedule)
    }

    async fn list_schedules(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: Option<NaiveDate>,
        tag_name: Option<&str>,
    ) -> Result<Vec<Schedule>, StoreError> {
        let inner = self.inner.read().await;
        inner.require_user(user_id)?;
        let mut rows: Vec<&ScheduleRow> = inner
            .schedules
            .values()
            .filter(|r| r.user_id == user_id)
            .filter(|r| match to {
                Some(to) => r.scheduled_date >= from && r.scheduled_date <= to,
                None => r.scheduled_date == from,
            })
            .collect();
        if let Some(name) = tag_name {
            rows.retain(|r| {
                r.tag_ids
                    .iter()
                    .any(|id| inner.tags.get(id).is_some_and(|t| t.name == name))
            });
        }
        rows.sort_by_key(|r| (r.scheduled_date, r.id));
        Ok(rows.into_iter().map(|r| inner.materialize(r)).collect())
    }

    async fn update_schedule(
        &self,
        user_id: i64,
        schedule_id: i64,
        changes: ScheduleChanges,
    ) -> Result<Schedule, StoreError> {
        let mut inner = self.inner.write().await;
        inner.require_user(user_id)?;
        let owner = inner
            .schedules
            .get(&schedule_id)
            .map(|r| r.user_id)
            .ok_or_else(|| StoreError::NotFound(format!("schedule {schedule_id}")))?;
        if owner != user_id {
            return Err(StoreError::NotFound(format!("schedule {schedule_id}")));
        }
        let tag_ids = changes
            .tags
            .as_ref()
            .map(|names| inner.resolve_tags(user_id, names));
        let row = inner.schedules.get_mut(&schedule_id).unwrap();
        if let Some(title) = changes.title {
            row.title = title;
        }
        if let Some(content) = changes.content {
            row.content = Some(content);
        }
        if let Some(date) = changes.scheduled_date {
            row.scheduled_date = date;
        }
        if let Some(deadline) = changes.deadline {
            row.deadline = Some(deadline);
        }
        if let Some(done) = changes.is_completed {
            row.is_completed = done;
        }
        if let Some(ids) = tag_ids {
            // 整体替换：旧关联全部丢弃
            row.tag_ids = ids;
        }
        let row = row.clone();
        Ok(inner.materialize(&row))
    }

    async fn delete_schedule(&self, schedule_id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .schedules
            .remove(&schedule_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("schedule {schedule_id}")))
    }

    async fn get_or_create_tag(&self, user_id: i64, name: &str) -> Result<Tag, StoreError> {
        let mut inner = self.inner.write().await;
        inner.require_user(user_id)?;
        let ids = inner.resolve_tags(user_id, &[name.to_string()]);
        Ok(inner.tags.get(&ids[0]).cloned().unwrap())
    }

    async fn list_tags(&self, user_id: i64) -> Result<Vec<Tag>, StoreError> {
        let inner = self.inner.read().await;
        inner.require_user(user_id)?;
        Ok(inner
            .tags
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn rename_tag(&self, user_id: i64, tag_id: i64, name: &str) -> Result<Tag, StoreError> {
        let mut inner = self.inner.write().await;
        let tag = inner
            .tags
            .get_mut(&tag_id)
            .filter(|t| t.user_id == user_id)
            .ok_or_else(|| StoreError::NotFound(format!("tag {tag_id}")))?;
        tag.name = name.to_string();
        Ok(tag.clone())
    }

    async fn delete_tag(&self, tag_id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.tags.remove(&tag_id).is_none() {
            return Err(StoreError::NotFound(format!("tag {tag_id}")));
        }
        // 悬挂关联一并清理
        for row in inner.schedules.values_mut() {
            row.tag_ids.retain(|id| *id != tag_id);
        }
        Ok(())
    }

    async fn create_timetable(
        &self,
        user_id: i64,
        input: NewTimeTable,
    ) -> Result<TimeTableEntry, StoreError> {
        let mut inner = self.inner.write().await;
        inner.require_user(user_id)?;
        inner.check_overlap(user_id, &input, None)?;
        let id = inner.alloc_id();
        let entry = TimeTableEntry {
            id,
            subject: input.subject,
            day_of_week: input.day_of_week,
            start_time: input.start_time,
            end_time: input.end_time,
            user_id,
        };
        inner.timetables.insert(id, entry.clone());
        Ok(entry)
    }

    async fn list_timetable(&self, user_id: i64) -> Result<Vec<TimeTableEntry>, StoreError> {
        let inner = self.inner.read().await;
        inner.require_user(user_id)?;
        let mut entries: Vec<TimeTableEntry> = inner
            .timetables
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by_key(|t| (t.day_of_week.col(), t.start_time, t.id));
        Ok(entries)
    }

    async fn update_timetable(
        &self,
        user_id: i64,
        timetable_id: i64,
        changes: TimeTableChanges,
    ) -> Result<TimeTableEntry, StoreError> {
        let mut inner = self.inner.write().await;
        let current = inner
            .timetables
            .get(&timetable_id)
            .filter(|t| t.user_id == user_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("timetable {timetable_id}")))?;
        let candidate = NewTimeTable {
            subject: changes.subject.clone().unwrap_or(current.subject.clone()),
            day_of_week: changes.day_of_week.unwrap_or(current.day_of_week),
            start_time: changes.start_time.unwrap_or(current.start_time),
            end_time: changes.end_time.unwrap_or(current.end_time),
        };
        inner.check_overlap(user_id, &candidate, Some(timetable_id))?;
        let entry = inner.timetables.get_mut(&timetable_id).unwrap();
        entry.subject = candidate.subject;
        entry.day_of_week = candidate.day_of_week;
        entry.start_time = candidate.start_time;
        entry.end_time = candidate.end_time;
        Ok(entry.clone())
    }

    async fn delete_timetable(&self, timetable_id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .timetables
            .remove(&timetable_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("timetable {timetable_id}")))
    }

    async fn append_chat_turn(
        &self,
        user_id: i64,
        query: &str,
        answer: Value,
    ) -> Result<ChatTurn, StoreError> {
        let mut inner = self.inner.write().await;
        let id = inner.alloc_id();
        let turn = ChatTurn {
            id,
            user_id,
            query: query.to_string(),
            answer,
            created_at: Utc::now(),
        };
        inner.chat_turns.push(turn.clone());
        Ok(turn)
    }

    async fn recent_chat_turns(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<ChatTurn>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .chat_turns
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    async fn store_with_user() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .seed_user(UserProfile {
                id: 1,
                email: "stu@smu.ac.kr".to_string(),
                student_id: "202012345".to_string(),
            })
            .await;
        store
    }

    #[tokio::test]
    async fn tag_colors_follow_palette_order_and_creation_is_idempotent() {
        let store = store_with_user().await;
        for i in 0..TAG_COLORS.len() + 2 {
            let tag = store
                .get_or_create_tag(1, &format!("tag{i}"))
                .await
                .unwrap();
            assert_eq!(tag.color, TAG_COLORS[i % TAG_COLORS.len()]);
        }
        // 再次请求同名标签：原样返回，颜色不变
        let first = store.get_or_create_tag(1, "tag0").await.unwrap();
        assert_eq!(first.color, TAG_COLORS[0]);
        assert_eq!(store.list_tags(1).await.unwrap().len(), TAG_COLORS.len() + 2);
    }

    #[tokio::test]
    async fn schedule_create_resolves_tags_atomically() {
        let store = store_with_user().await;
        let created = store
            .create_schedule(
                1,
                NewSchedule {
                    title: "축구하기".to_string(),
                    scheduled_date: date("2026-08-07"),
                    tags: vec!["운동".to_string(), "취미".to_string()],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(created.tags, vec!["운동", "취미"]);
        let tags = store.list_tags(1).await.unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].color, TAG_COLORS[0]);
        assert_eq!(tags[1].color, TAG_COLORS[1]);
    }

    #[tokio::test]
    async fn update_schedule_replaces_tag_set_entirely() {
        let store = store_with_user().await;
        let created = store
            .create_schedule(
                1,
                NewSchedule {
                    title: "과제".to_string(),
                    scheduled_date: date("2026-08-07"),
                    tags: vec!["태그1".to_string(), "태그2".to_string()],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let updated = store
            .update_schedule(
                1,
                created.id,
                ScheduleChanges {
                    tags: Some(vec!["태그3".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.tags, vec!["태그3"]);
    }

    #[tokio::test]
    async fn update_schedule_rejects_foreign_owner() {
        let store = store_with_user().await;
        store
            .seed_user(UserProfile {
                id: 2,
                email: "other@smu.ac.kr".to_string(),
                student_id: "202054321".to_string(),
            })
            .await;
        let created = store
            .create_schedule(
                1,
                NewSchedule {
                    title: "비밀 일정".to_string(),
                    scheduled_date: date("2026-08-07"),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let err = store
            .update_schedule(2, created.id, ScheduleChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_schedules_ranges_and_empty_result() {
        let store = store_with_user().await;
        for (title, d) in [("a", "2026-08-01"), ("b", "2026-08-03"), ("c", "2026-08-10")] {
            store
                .create_schedule(
                    1,
                    NewSchedule {
                        title: title.to_string(),
                        scheduled_date: date(d),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }
        let exact = store
            .list_schedules(1, date("2026-08-03"), None, None)
            .await
            .unwrap();
        assert_eq!(exact.len(), 1);
        let range = store
            .list_schedules(1, date("2026-08-01"), Some(date("2026-08-10")), None)
            .await
            .unwrap();
        assert_eq!(range.len(), 3);
        let none = store
            .list_schedules(1, date("2026-08-02"), None, None)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn timetable_overlap_is_rejected_without_insert() {
        let store = store_with_user().await;
        store
            .create_timetable(
                1,
                NewTimeTable {
                    subject: "Algorithms".to_string(),
                    day_of_week: Weekday::Mon,
                    start_time: time("09:00"),
                    end_time: time("10:00"),
                },
            )
            .await
            .unwrap();
        let err = store
            .create_timetable(
                1,
                NewTimeTable {
                    subject: "Databases".to_string(),
                    day_of_week: Weekday::Mon,
                    start_time: time("09:30"),
                    end_time: time("10:30"),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.list_timetable(1).await.unwrap().len(), 1);

        // 不同星期（星期）则不冲突
        store
            .create_timetable(
                1,
                NewTimeTable {
                    subject: "Databases".to_string(),
                    day_of_week: Weekday::Tue,
                    start_time: time("09:30"),
                    end_time: time("10:30"),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn chat_turns_most_recent_first_with_limit() {
        let store = store_with_user().await;
        for i in 0..5 {
            store
                .append_chat_turn(1, &format!("q{i}"), Value::Null)
                .await
                .unwrap();
        }
        let recent = store.recent_chat_turns(1, 3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].query, "q4");
        assert_eq!(recent[2].query, "q2");
    }
}
