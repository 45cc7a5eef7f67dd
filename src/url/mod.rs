//! URL handling module for warc-harvest
//!
//! Turns caller-supplied host strings into crawl origins and derives the
//! robots.txt location for an origin.

mod normalize;

pub use normalize::{normalize_origin, robots_url, trim_trailing_slash};
