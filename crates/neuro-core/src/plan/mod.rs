pub mod parser;
pub mod spec;

pub use parser::{default_case_plan, parse, parse_at};
pub use spec::{ParsedPlan, Plan, TaskSpec, WorkerKind};
