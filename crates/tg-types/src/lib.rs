pub mod classifier;
pub mod dataset;
pub mod errors;
pub mod params;

pub use classifier::*;
pub use dataset::*;
pub use errors::*;
pub use params::*;
