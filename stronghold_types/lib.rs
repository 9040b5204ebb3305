pub mod buildings;
pub mod common;
pub mod errors;
pub mod map;
pub mod troops;

pub use errors::Result;
