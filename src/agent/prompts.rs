//! Prompt 构造
//!
//! system prompt 注入：规则、当日日期（以真实时钟为准，绝不让模型猜）、工具目录
//! （名称/描述/参数 schema）、Tool Call JSON Schema、页面结构。
//! 工具描述即契约：这里只做拼装，内容来自 ToolRegistry。

use chrono::NaiveDate;
use serde_json::Value;

use crate::core::{HistoryTurn, TemplateName};
use crate::tools::tool_call_schema_json;

/// 页面结构（工具处理不了的位置指引用）；模型只许引用这里的内容，不得编造
pub const PAGE_STRUCTURE: &str = r#"
- 홈 페이지 (좌측 상단 "달력" 버튼)
    - 월별/주별 캘린더 (일정 시각화)
    - 할 일 목록 (특정 날짜 일정)
    - 일정 CRUD 및 완료 처리 (제목/내용/태그/기간 지정 가능)
    - 샘물 포털 연동 (시간표 기반 일정 가져오기)
- 태그별 일정 조회 (좌측 "태그" 버튼)
- 포커스 타이머 (좌측 "포커스타이머" 버튼)
- 시간표 (직접 입력 또는 샘물 연동, 좌측 "시간표" 버튼)
- 설정 (좌측 "설정" 버튼)
    - 프로필 관리 (비밀번호, 샘물 정보, 회원 탈퇴)
    - 알림 설정 (아침/저녁 일정 알림 On/Off)
    - 공부 계획 (시험 기간, 복습 주기)
    - 통계 (완료율, 순위 제공)
- 시험 공부 일정 자동 생성 (좌측 "시험 계획 설정" 버튼)
- 로그아웃 (좌측 하단 "로그아웃" 버튼)
"#;

/// Core Agent system prompt：规则 + 当日日期 + 工具目录 + Tool Call Schema + 页面结构
pub fn build_system_prompt(tool_specs: &[(String, String, Value)], today: NaiveDate) -> String {
    let tool_list = tool_specs
        .iter()
        .map(|(name, desc, schema)| {
            format!(
                "- {}: {}\n  parameters: {}",
                name,
                desc,
                serde_json::to_string(schema).unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"너는 대학생 학습/일정 관리 비서 Dulo이다.
규칙:
- 사용자의 요청을 분석해 적절한 툴을 호출하고 필요 시 여러 툴을 순차적으로 사용한다.
- 툴 호출이 필요하면 다른 텍스트 없이 JSON만 출력한다: {{"tool": "툴이름", "args": {{...}}}}
- 툴 실행 결과는 "Observation from ..." 메시지로 전달된다. 결과를 확인한 뒤 다음 툴을 호출하거나 최종 응답을 만든다.
- 필수 매개변수를 알 수 없으면 툴을 호출하지 말고 최종 응답의 message로 사용자에게 되물어본다. 값을 추측하지 않는다.
- 일정 조회 시: 주간/태그/키워드 조건에 맞게 취합한다. "1일, 3일, 10일"처럼 여러 날짜 요청은 날짜별로 list_schedules를 여러 번 호출한 후 결과를 취합한다.
- 일정 응답은 날짜별로 묶어 {{"schedules": {{"날짜": [데이터...]}}}} 형식을 사용한다.
- 시간표 응답은 그대로 data에 넣는다 (예: {{"timetables": [...]}}).
- 툴로 처리 불가하거나 위치 안내 요청일 경우 아래 페이지 구조를 참고해 안내하고, 없는 위치를 지어내지 않는다.
- 최종 출력은 JSON만 허용: {{
    "message": "사용자에게 보여줄 응답",
    "data": 툴 반환 데이터 or null,
    "render_html": true/false,
    "template_name": "schedule_list" | "tag_list" | "timetable_list" | null
  }}
- render_html은 data가 있고 목록/그리드 같은 시각적 표현이 의미 있을 때만 true로 한다. 단순 확인/오류 응답은 항상 false.
- message에는 자연어 응답만, data에는 가공된 툴 응답만 넣는다.
- 오늘 날짜는 {today} 기준으로 처리한다.
- 최근 10개 대화 내역을 반드시 참고하여 맥락을 유지한다 (예: "세 번째 일정 삭제해줘"는 직전 목록 기준).

[사용 가능한 툴]
{tool_list}

[Tool Call JSON Schema]
```json
{tool_schema}
```

[페이지 구조]
{page_structure}"#,
        today = today.format("%Y-%m-%d"),
        tool_list = tool_list,
        tool_schema = tool_call_schema_json(),
        page_structure = PAGE_STRUCTURE,
    )
}

/// 用户回合 prompt：提问 + 最近对话摘要（JSON）
pub fn build_user_prompt(query: &str, history: &[HistoryTurn]) -> String {
    let history_json = serde_json::to_string(history).unwrap_or_else(|_| "[]".to_string());
    format!(
        "[사용자 요청]\n{query}\n\n[최근 대화 요약]\n{history}",
        query = query,
        history = history_json,
    )
}

/// Render Agent prompt：指示把 data 变换为指定模板的上下文
pub fn build_render_prompt(query: &str, data: &Value, template: TemplateName) -> String {
    let target = match template {
        TemplateName::ScheduleList => {
            r#"{"schedules": {"YYYY-MM-DD": [{"id", "title", "content", "is_completed", "tags"} ...]}}
- 이미 날짜별로 묶여 있으면 구조를 바꾸지 말고 그대로 전달한다."#
        }
        TemplateName::TagList => {
            r#"{"tags": [{"name": 태그 이름, "color": 태그 레코드의 color 값 그대로, "schedules": [{"title", "is_completed"} ...]} ...]}
- 태그 하나당 항목 하나. 해당 태그가 연결된 일정만 schedules에 넣는다 (title과 is_completed만).
- 한 일정이 여러 태그에 중복 포함될 수 있다. color는 태그 레코드 값을 그대로 사용한다."#
        }
        TemplateName::TimetableList => {
            r#"{"timetables": [{"name": 과목명, "col": 요일 번호(sun=1..sat=7), "start_hour": 시작(소수 시간, 12:30 -> 12.5), "end_hour": 종료(소수 시간), "color": 색상} ...]}
- 이미 변환된 항목은 그대로 둔다. 색상은 과목명이 처음 등장한 순서대로 5색 팔레트를 순환해 배정한다."#
        }
    };
    format!(
        "아래 data를 {template} 템플릿 컨텍스트로 변환하라. 설명 없이 JSON만 출력한다.\n\n\
         [사용자 요청]\n{query}\n\n[data]\n{data}\n\n[목표 형식]\n{target}",
        template = template.as_str(),
        query = query,
        data = data,
        target = target,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_carries_today_and_tools() {
        let specs = vec![(
            "list_schedules".to_string(),
            "일정 목록 조회".to_string(),
            serde_json::json!({"type": "object"}),
        )];
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let prompt = build_system_prompt(&specs, today);
        assert!(prompt.contains("2026-08-06"));
        assert!(prompt.contains("- list_schedules: 일정 목록 조회"));
        assert!(prompt.contains("페이지 구조"));
    }

    #[test]
    fn user_prompt_embeds_history_as_json() {
        let history = vec![HistoryTurn {
            query: "내일 일정 알려줘".to_string(),
            message: "일정이 없습니다.".to_string(),
        }];
        let prompt = build_user_prompt("그럼 모레는?", &history);
        assert!(prompt.contains("[사용자 요청]\n그럼 모레는?"));
        assert!(prompt.contains("내일 일정 알려줘"));
    }
}
