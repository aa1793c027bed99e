use crate::{
    analyzer::{AnalyzerError, AnalyzerResult},
    expression::{DataType, Expr, Resolver},
};

pub struct ExtractValue;

impl ExtractValue {
    /// Field access `child.field`, matching the field name through `resolver`.
    pub fn extract(child: Expr, field: &str, resolver: Resolver) -> AnalyzerResult<Expr> {
        match child.data_type()? {
            DataType::Struct(fields) => {
                let matches: Vec<(usize, &str)> = fields
                    .iter()
                    .enumerate()
                    .filter(|(_, f)| resolver(&f.name, field))
                    .map(|(i, f)| (i, f.name.as_str()))
                    .collect();
                match matches.as_slice() {
                    [] => Err(AnalyzerError::NoSuchStructField {
                        field: field.to_string(),
                        available: fields.iter().map(|f| f.name.clone()).collect(),
                    }),
                    [(ordinal, name)] => Ok(Expr::GetStructField {
                        child: Box::new(child),
                        ordinal: *ordinal,
                        name: Some(name.to_string()),
                    }),
                    many => Err(AnalyzerError::AmbiguousStructField { field: field.to_string(), count: many.len() }),
                }
            }
            other => Err(AnalyzerError::InvalidExtraction { field: field.to_string(), data_type: other.simple_string() }),
        }
    }
}
