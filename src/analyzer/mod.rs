pub mod analyzer_error;
pub use analyzer_error::*;

pub mod attribute_set;
pub use attribute_set::*;

pub mod attribute_seq;
pub use attribute_seq::*;

pub mod extract_value;
pub use extract_value::*;

pub mod bind_references;
pub use bind_references::*;

pub mod resolve_references;
pub use resolve_references::*;

pub mod analysis;
pub use analysis::*;
