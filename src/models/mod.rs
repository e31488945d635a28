pub mod analytics;
pub mod file;
pub mod share;
