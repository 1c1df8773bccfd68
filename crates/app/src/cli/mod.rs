pub mod args;
pub mod op;
pub mod ops;

pub use ops::{Apply, Import, Init, Plan, Version};
