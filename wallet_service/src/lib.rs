pub mod api;
pub mod domain;
pub mod engine;
pub mod infrastructure;
pub mod use_cases;
