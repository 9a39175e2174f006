pub mod loaders;
pub mod split;
pub mod storage;

pub use loaders::*;
pub use split::*;
pub use storage::*;
