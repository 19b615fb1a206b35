pub mod futures;
pub mod term_structure;
pub mod response;

pub use futures::*;
pub use term_structure::*;
pub use response::*;
