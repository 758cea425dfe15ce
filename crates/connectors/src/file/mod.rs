pub mod error;
pub mod locator;
pub mod segment;
pub mod tree;
