pub mod config;
pub mod crypto;
pub mod error;
pub mod helpers;
pub mod token;
