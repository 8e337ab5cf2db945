pub mod artifact;
pub mod common;
pub mod entities;
pub mod event;

pub use artifact::*;
pub use common::*;
pub use entities::*;
pub use event::*;
