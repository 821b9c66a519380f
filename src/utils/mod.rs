pub mod crypto;
pub mod error;
pub mod identifier;
pub mod type_mapper;

pub use error::*;
pub use type_mapper::*;
