pub mod classifier;
pub mod delta;
pub mod error;
pub mod executor;
pub mod financial_model;
