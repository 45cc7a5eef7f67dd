//! Robots.txt parser implementation
//!
//! Only the `Crawl-delay` directive matters here: the fetch agent enforces the
//! allow/disallow rules itself, but it does not slow down on request.

/// Parsed robots.txt data
#[derive(Debug, Clone, Default)]
pub struct ParsedRobots {
    /// Raw robots.txt content
    content: String,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Returns the raw robots.txt content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Gets the largest integer crawl delay declared anywhere in the file
    ///
    /// The delay is applied host-wide regardless of the user-agent group it
    /// appears in, since the fetch agent takes a single wait value. Values
    /// that are not whole numbers of seconds are ignored.
    ///
    /// # Returns
    ///
    /// * `Some(u64)` - The crawl delay in seconds
    /// * `None` - If no usable crawl delay is specified
    pub fn crawl_delay(&self) -> Option<u64> {
        self.content
            .lines()
            .filter_map(|line| {
                // Drop inline comments
                let line = line.split('#').next().unwrap_or("").trim();
                let (key, value) = line.split_once(':')?;
                if !key.trim().eq_ignore_ascii_case("crawl-delay") {
                    return None;
                }
                value.trim().parse::<u64>().ok()
            })
            .max()
    }

    /// Combines a caller-supplied wait with the declared crawl delay
    ///
    /// The crawl delay only ever raises the wait, never lowers it.
    pub fn effective_wait(&self, caller_wait: Option<u64>) -> Option<u64> {
        match (caller_wait, self.crawl_delay()) {
            (Some(wait), Some(delay)) => Some(wait.max(delay)),
            (wait, delay) => wait.or(delay),
        }
    }
}
