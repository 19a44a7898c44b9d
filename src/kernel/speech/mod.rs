pub mod planner;
pub mod queue;
