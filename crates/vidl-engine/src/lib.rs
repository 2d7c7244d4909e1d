pub mod adapter;
pub mod error;
pub mod hub;
pub mod retry;

pub use adapter::*;
pub use error::*;
pub use hub::*;
pub use retry::*;
