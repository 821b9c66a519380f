pub mod doris_ddl;

pub use doris_ddl::*;
