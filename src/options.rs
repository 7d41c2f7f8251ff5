use std::num::NonZeroUsize;

use serde::Deserialize;

use reader_error::{ReaderError, Result};

pub const DEFAULT_LABEL: &str = "reader";

/// Per-reader settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Label used in log lines and error messages
    pub label: String,
    /// Upper bound on units requested from the backend in one call.
    /// `None` forwards the caller's length unchanged.
    pub max_request: Option<NonZeroUsize>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_owned(),
            max_request: None,
        }
    }
}

impl ReaderOptions {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_max_request(mut self, max_request: NonZeroUsize) -> Self {
        self.max_request = Some(max_request);
        self
    }

    /// Parse options from a JSON document; missing fields take defaults.
    /// A `max_request` of zero is rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| ReaderError::Other(err.into()))
    }

    /// Length actually forwarded for a request of `length` units.
    pub(crate) fn clamp(&self, length: usize) -> usize {
        match self.max_request {
            Some(max) => length.min(max.get()),
            None => length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(max: usize) -> NonZeroUsize {
        NonZeroUsize::new(max).unwrap()
    }

    #[test]
    fn json_defaults() {
        let options = ReaderOptions::from_json("{}").unwrap();
        assert_eq!(options, ReaderOptions::default());

        let options =
            ReaderOptions::from_json(r#"{"label": "pipe", "max_request": 16}"#)
                .unwrap();
        assert_eq!(options.label, "pipe");
        assert_eq!(options.clamp(100), 16);
        assert_eq!(options.clamp(3), 3);
    }

    #[test]
    fn json_rejects_zero_request() {
        assert!(ReaderOptions::from_json(r#"{"max_request": 0}"#).is_err());
        assert!(ReaderOptions::from_json(r#"{"max_request": -4}"#).is_err());
        assert!(ReaderOptions::from_json("not json").is_err());
    }

    #[test]
    fn builder_and_json_agree() {
        let built = ReaderOptions::new("pipe").with_max_request(cap(16));
        let parsed =
            ReaderOptions::from_json(r#"{"label": "pipe", "max_request": 16}"#)
                .unwrap();
        assert_eq!(built, parsed);
        assert_eq!(built.clamp(usize::MAX), 16);
        assert_eq!(ReaderOptions::new("pipe").clamp(usize::MAX), usize::MAX);
    }
}
