use thiserror::Error;

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyzerError {
    #[error("invalid call to {operation} on unresolved object {expr}")]
    Unresolved { operation: &'static str, expr: String },

    #[error("cannot evaluate unbound attribute {0}")]
    UnboundAttribute(String),

    #[error("reference `{name}` is ambiguous, could be: {}", .candidates.join(", "))]
    AmbiguousReference { name: String, candidates: Vec<String> },

    #[error("cannot resolve column `{name}` given input columns: [{}]", .candidates.join(", "))]
    UnresolvedColumn { name: String, candidates: Vec<String> },

    #[error("syntax error in attribute name: {0}")]
    AttributeNameSyntax(String),

    #[error("no such struct field {field} in {}", .available.join(", "))]
    NoSuchStructField { field: String, available: Vec<String> },

    #[error("ambiguous reference to fields {field}: {count} matches")]
    AmbiguousStructField { field: String, count: usize },

    #[error("field name {field} should be extracted from a struct, but the type is {data_type}")]
    InvalidExtraction { field: String, data_type: String },

    #[error("couldn't find {reference} in [{}]", .schema.join(","))]
    BindingFailure { reference: String, schema: Vec<String> },

    #[error("max iterations ({iterations}) reached for batch {batch}")]
    MaxIterationsExceeded { batch: String, iterations: usize },

    #[error("after applying rule {rule} in batch {batch}, the structural integrity of the plan is broken")]
    PlanIntegrity { rule: String, batch: String },

    #[error("once strategy's idempotence is broken for batch {batch}")]
    OnceBatchNotIdempotent { batch: String },

    #[error("use count of {expr} dropped to {count}")]
    InvalidUseCount { expr: String, count: i64 },

    #[error("cannot resolve {expr} due to data type mismatch: {message}")]
    DataTypeMismatch { expr: String, message: String },

    #[error("expected {expected} children for {expr}, got {got}")]
    ChildrenArity { expr: String, expected: usize, got: usize },

    #[error("function {0} cannot be evaluated")]
    UnsupportedFunction(String),

    #[error("rule {rule} failed: {message}")]
    Rule { rule: String, message: String },

    #[error("{0}")]
    Other(String),
}
