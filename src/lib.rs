pub mod config;
pub mod fetch;
pub mod grades;
pub mod infra;
pub mod output;
pub mod services;
