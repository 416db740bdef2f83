pub mod types;
pub mod validate;

pub use types::{Block, FanArm};
pub use validate::validate_plan;
