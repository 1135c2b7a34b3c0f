pub mod fixed;
pub mod log;

pub use fixed::Fixed;
