use thiserror::Error;

/// Per-row failures. These are counted and logged with the offending order
/// id, never propagated past the pass that caught them.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("source row has an empty order id")]
    MissingOrderId,

    #[error("{field} = {value} is not a representable monetary value")]
    InvalidAmount { field: &'static str, value: f64 },

    #[error("unknown 3PO action '{0}'")]
    UnknownAction(String),
}
