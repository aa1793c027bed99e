pub mod rule;
pub use rule::*;

pub mod batch;
pub use batch::*;

pub mod query_planning_tracker;
pub use query_planning_tracker::*;

pub mod rule_executor;
pub use rule_executor::*;
