pub mod breath_pipeline;
pub mod constants;
pub mod types;
