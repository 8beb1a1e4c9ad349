pub mod data_models;
pub mod frame;

pub use data_models::*;
