pub mod bridge;
pub mod client;
pub mod coalescer;
pub mod error;
pub mod feed;
pub mod history;
pub mod logging;
pub mod progress;
pub mod registry;
pub mod resolution;

pub use bridge::*;
pub use client::*;
pub use coalescer::*;
pub use error::*;
pub use feed::*;
pub use history::*;
pub use progress::*;
pub use registry::*;
pub use resolution::*;
