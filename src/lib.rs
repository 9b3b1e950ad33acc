pub mod error;
pub mod fetch;
pub mod gel;
pub mod logger;
pub mod repeats;
pub mod seq;
pub mod tm;

pub use error::{Error, Result};
