pub mod constants;
pub mod replay;
pub mod types;
