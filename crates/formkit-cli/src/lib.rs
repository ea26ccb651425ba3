//! Library side of the formkit CLI: logging setup and the validate pipeline.

pub mod logging;
pub mod pipeline;
