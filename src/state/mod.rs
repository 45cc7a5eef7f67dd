//! State module for tracking pipeline progress
//!
//! # Components
//!
//! - `PipelineState`: the stage a crawl request is in (init, execute, rewrite, done, ...)

mod pipeline_state;

pub use pipeline_state::PipelineState;
