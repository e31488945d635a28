pub mod access;
pub mod analytics;
pub mod archive;
pub mod file_storage;
pub mod file_validation;
pub mod qr;
pub mod upload;
pub mod whatsapp;
