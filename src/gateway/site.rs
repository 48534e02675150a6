//! Display names derived from site codes embedded in gateway identifiers

/// Ordered site code → display name table
#[derive(Debug, Clone, Default)]
pub struct SiteDirectory {
    entries: Vec<(String, String)>,
}

impl SiteDirectory {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// First display name whose code occurs in `raw`, or `raw` unchanged
    pub fn display_name(&self, raw: &str) -> String {
        self.entries
            .iter()
            .find(|(code, _)| raw.contains(code.as_str()))
            .map(|(_, name)| name.clone())
            .unwrap_or_else(|| raw.to_string())
    }
}
