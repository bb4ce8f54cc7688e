pub mod descriptor;
pub mod mapping;
pub mod registry;

pub use descriptor::*;
pub use mapping::*;
pub use registry::*;
