pub mod endpoints;
pub mod operations;
pub mod package;
pub mod policies;
pub mod synthesize;

pub use endpoints::*;
pub use operations::*;
pub use package::*;
pub use policies::*;
pub use synthesize::*;
