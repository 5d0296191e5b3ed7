//! Tracing targets.
//!
//! The compiler reports progress through the `tracing` crate and never
//! installs a subscriber itself. To see the output, install one in the
//! host application and filter on the targets below:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_max_level(tracing::Level::DEBUG)
//!     .init();
//! ```

/// Target names for log filtering.
pub mod targets {
    /// Chunking and grammar.
    pub const PARSER: &str = "stylemill::parser";
    /// Import queue.
    pub const IMPORT: &str = "stylemill::import";
    /// Tree evaluation and mixin expansion.
    pub const EVAL: &str = "stylemill::eval";
    /// CSS serialization.
    pub const RENDER: &str = "stylemill::render";
    /// Map-styling definitions and XML output.
    pub const MAP: &str = "stylemill::map";
}
