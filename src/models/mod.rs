pub mod datasource;
pub mod row;
pub mod sync;
pub mod task;

pub use datasource::*;
pub use row::*;
pub use sync::*;
pub use task::*;
