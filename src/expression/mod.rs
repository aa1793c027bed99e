pub mod expr_id;
pub use expr_id::*;

pub mod data_type;
pub use data_type::*;

pub mod value;
pub use value::*;

pub mod resolver;
pub use resolver::*;

pub mod attribute;
pub use attribute::*;

pub mod expr;
pub use expr::*;

pub mod transform;
pub use transform::*;

pub mod canonicalize;
pub use canonicalize::*;

pub mod eval;
pub use eval::*;
