pub mod cache;
pub mod forge;
pub mod pipeline;
pub mod reporter;

pub use cache::*;
pub use forge::*;
pub use pipeline::*;
pub use reporter::*;
