use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResultError {
    #[error("Row has {actual} values but the query maps {expected} aliases")]
    TupleArity { expected: usize, actual: usize },

    #[error("Column `{column}` is missing from the result row")]
    MissingColumn { column: String },

    #[error("Projection entry `{alias}` spans {columns} columns and cannot be read as one value")]
    MultiColumnEntry { alias: String, columns: usize },

    #[error("Query selects entities, not projected values")]
    NotProjected,

    #[error("Query selects projected values, not entities")]
    NotEntities,
}
