pub mod record;
pub mod input;
pub mod callsite;
pub mod context;
pub mod normalize;
pub mod queue;
pub mod sink;
pub mod logger;
pub mod layer;

#[cfg(feature = "http")]
pub mod http;

pub mod backend;
pub mod env;
pub mod init;
pub mod noop_sink;

pub use input::{ArcInput, ErrorValue, PartialRecord};
pub use logger::{debug, error, info, warn, ArcLogger};
pub use record::{LogLevel, LogRecord};
