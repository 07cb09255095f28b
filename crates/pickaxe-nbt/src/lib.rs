pub mod json;
pub mod nbt;

pub use json::json_to_nbt;
pub use nbt::*;
