pub mod credentials;
pub mod error;
pub mod file;
pub mod index;
