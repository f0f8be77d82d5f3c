//! Planning phase: app classification and action plans.

mod engine;
mod paths;

pub use engine::{
    LAYOUT_OPTIONS, PlanContext, PlanningEngine, PlanningOutcome, PlanningResult, SCHEMA_SYNTHESISE_INTENT,
    WORKFLOW_COMPOSE_INTENT,
};
pub use paths::{component_path, page_path, pascal_case, slug};
