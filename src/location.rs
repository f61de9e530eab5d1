use anyhow::{Context, Result};
use url::Url;

/// The URL the client was launched with, e.g. the callback an external
/// sign-in page redirects to: `taskpad://callback?token=abc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    url: Option<Url>,
}

impl Location {
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).with_context(|| format!("Invalid launch URL: {}", raw))?;
        Ok(Location { url: Some(url) })
    }

    /// Location used when nothing was passed on the command line.
    pub fn blank() -> Self {
        Location { url: None }
    }

    /// Decoded value of the first `name` parameter, if any.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .as_ref()?
            .query_pairs()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
    }

    /// Reads `name` and rewrites the location without it. Every occurrence
    /// of the parameter is dropped; other parameters are left untouched.
    pub fn take_query_param(&mut self, name: &str) -> Option<String> {
        let value = self.query_param(name)?;
        let url = self.url.as_mut()?;

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k.as_ref() != name)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
        Some(value)
    }

    pub fn href(&self) -> String {
        self.url
            .as_ref()
            .map(|u| u.as_str().to_string())
            .unwrap_or_default()
    }
}
