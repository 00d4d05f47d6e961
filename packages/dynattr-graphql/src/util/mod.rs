mod connection;
mod edge;
mod filtering;
mod paging;
mod resolver_context;
mod sorting;

pub use connection::*;
pub use edge::*;
pub use filtering::*;
pub use paging::*;
pub use resolver_context::*;
pub use sorting::*;
