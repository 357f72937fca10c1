pub mod envelope;
pub mod error;
pub mod state;

pub use envelope::{
    group_schedules_by_date, parse_planner_output, AgentEnvelope, PlannerOutput, TemplateName,
    ToolCall, ToolReply,
};
pub use error::AgentError;
pub use state::{HistoryTurn, Message, Role, TurnState};
