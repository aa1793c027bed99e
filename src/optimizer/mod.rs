pub mod expression_equals;
pub use expression_equals::*;

pub mod equivalent_expressions;
pub use equivalent_expressions::*;

pub mod expression_set;
pub use expression_set::*;

pub mod constant_folding;
pub use constant_folding::*;

pub mod optimization;
pub use optimization::*;
