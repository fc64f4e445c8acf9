pub mod components;
pub mod holes;
pub mod dilation;

pub use components::*;
pub use holes::*;
pub use dilation::*;
