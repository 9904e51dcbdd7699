use crate::error::{Error, Result};

/// Analyzer settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Treat a callee's effect as an implicit frame at the call site, ordered
    /// against the frames the caller holds.
    pub call_site_ordering: bool,
    /// Let top-level (initialization) code touch guarded locations freely.
    pub top_level_exemption: bool,
    /// Keep at most this many diagnostics in a report.
    pub max_diagnostics: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            call_site_ordering: false,
            top_level_exemption: true,
            max_diagnostics: None,
        }
    }
}

impl Config {
    /// Defaults overlaid with `LOCKLEVEL_STRICT_CALLS` and
    /// `LOCKLEVEL_NO_TOPLEVEL_EXEMPTION`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if env_flag("LOCKLEVEL_STRICT_CALLS") {
            config.call_site_ordering = true;
        }
        if env_flag("LOCKLEVEL_NO_TOPLEVEL_EXEMPTION") {
            config.top_level_exemption = false;
        }
        config
    }

    pub fn with_call_site_ordering(mut self, on: bool) -> Self {
        self.call_site_ordering = on;
        self
    }

    pub fn with_top_level_exemption(mut self, on: bool) -> Self {
        self.top_level_exemption = on;
        self
    }

    pub fn with_max_diagnostics(mut self, max: Option<usize>) -> Self {
        self.max_diagnostics = max;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_diagnostics == Some(0) {
            return Err(Error::config_error("max_diagnostics must be at least 1"));
        }
        Ok(())
    }
}

/// Set and not "0"/"false"
fn env_flag(name: &str) -> bool {
    match std::env::var(name) {
        Ok(value) => !matches!(value.trim(), "" | "0" | "false"),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(!config.call_site_ordering);
        assert!(config.top_level_exemption);
        assert_eq!(config.max_diagnostics, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_max_diagnostics_is_rejected() {
        let config = Config::default().with_max_diagnostics(Some(0));
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
        assert!(Config::default().with_max_diagnostics(Some(1)).validate().is_ok());
    }
}
