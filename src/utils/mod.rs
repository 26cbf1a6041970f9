//! Shared structural utilities.

pub mod value_path;

pub use value_path::{get_value_by_path, set_value_by_path};
