pub mod mirror;

pub use mirror::*;
