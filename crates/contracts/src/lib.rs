pub mod domain;
pub mod usecases;
