//! The remote editor surface abstraction and a reference HTTP-polling
//! adapter (SPEC_FULL.md §4: "Code Monitor editor adapter").
//!
//! A real deployment drives a remote browser and queries DOM selectors;
//! `navigate`/`read` stand in for "open this page" and "query these
//! selectors" so that swap is a new `EditorSurface` impl, not a rewrite
//! of the polling loop.

use async_trait::async_trait;
use ivorch_domain::error::{Error, Result};
use ivorch_domain::model::TestState;
use serde::Deserialize;
use std::time::Duration;

/// The three selectors the monitor reads each poll (spec.md §4.3).
pub struct SelectorConfig {
    pub editor_text_selector: String,
    pub submit_button_selector: String,
}

/// One successful read of all configured selectors. The reference HTTP
/// adapter gets this straight off the wire; a real DOM adapter would
/// assemble it from several queries.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEditorRead {
    pub editor_text: String,
    #[serde(default = "default_language")]
    pub language: String,
    pub submit_in_flight: bool,
    #[serde(default)]
    pub test_state: TestState,
}

fn default_language() -> String {
    "unknown".into()
}

/// A navigable, selector-readable remote surface for one session.
#[async_trait]
pub trait EditorSurface: Send {
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// `Ok(None)` means a selector miss: the surface was reachable but
    /// one or more configured selectors did not resolve. `Err` means the
    /// surface itself is unreachable (spec.md §4.3's "navigation loss").
    async fn read(&mut self, selectors: &SelectorConfig) -> Result<Option<RawEditorRead>>;
}

/// Reads JSON from a configurable URL as a stand-in for querying DOM
/// selectors. The URL is expected to serve a [`RawEditorRead`]; any
/// non-success status or body that doesn't parse is treated as a
/// selector miss rather than a hard failure, since a half-rendered page
/// is a much more common failure mode than a dead server.
pub struct HttpEditorSurface {
    http: reqwest::Client,
    url: Option<String>,
}

impl HttpEditorSurface {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self { http, url: None })
    }
}

#[async_trait]
impl EditorSurface for HttpEditorSurface {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.url = Some(url.to_owned());
        Ok(())
    }

    async fn read(&mut self, _selectors: &SelectorConfig) -> Result<Option<RawEditorRead>> {
        let url = self
            .url
            .as_ref()
            .ok_or_else(|| Error::Protocol("editor surface not navigated".into()))?;

        let resp = self.http.get(url).send().await.map_err(|e| Error::Http(e.to_string()))?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        match resp.json::<RawEditorRead>().await {
            Ok(read) => Ok(Some(read)),
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_editor_read_parses_minimal_json() {
        let raw = r#"{"editor_text":"def f(): pass","submit_in_flight":false}"#;
        let parsed: RawEditorRead = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.language, "unknown");
        assert_eq!(parsed.test_state, TestState::Unknown);
    }

    #[test]
    fn raw_editor_read_parses_test_state() {
        let raw = r#"{"editor_text":"x","submit_in_flight":true,
            "test_state":{"passed_k_of_n":{"k":3,"n":5}}}"#;
        let parsed: RawEditorRead = serde_json::from_str(raw).unwrap();
        assert!(parsed.submit_in_flight);
        assert_eq!(parsed.test_state, TestState::PassedKOfN { k: 3, n: 5 });
    }

    #[tokio::test]
    async fn read_before_navigate_is_a_protocol_error() {
        let mut surface = HttpEditorSurface::new(Duration::from_secs(1)).unwrap();
        let selectors = SelectorConfig {
            editor_text_selector: "#editor".into(),
            submit_button_selector: "#submit".into(),
        };
        let err = surface.read(&selectors).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
