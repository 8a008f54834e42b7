//! Finding-aids service client.
//!
//! Implements [`MetadataProvider`] over plain HTTP GETs of
//! `<collections_url>/<id>.xml`, where `id` is either a call number or a
//! `callno/component` pair.

use std::time::Duration;

use async_trait::async_trait;
use daopub_common::{CallNumber, ComponentId, Error, Result};
use tracing::debug;

use crate::config::FindingAidsConfig;
use crate::metadata::provider::{ComponentTitle, MetadataProvider};
use crate::xml;

const UNITTITLE_PATH: &[&str] = &["c", "did", "unittitle"];
const UNITDATE_PATH: &[&str] = &["c", "did", "unitdate"];
const REPOSITORY_PATH: &[&str] = &["archdesc", "did", "repository"];

/// HTTP client for the finding-aids XML service.
///
/// # Examples
///
/// ```no_run
/// use daopub::config::FindingAidsConfig;
/// use daopub::metadata::FindingAidsClient;
///
/// let client = FindingAidsClient::new(&FindingAidsConfig::default()).unwrap();
/// assert_eq!(
///     client.document_url("C0022/c0031"),
///     "http://findingaids.princeton.edu/collections/C0022/c0031.xml"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct FindingAidsClient {
    client: reqwest::Client,
    base_url: String,
}

impl FindingAidsClient {
    /// Build a client with the configured base URL and request timeout.
    pub fn new(config: &FindingAidsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::validation(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.collections_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL of the XML document for `id`.
    pub fn document_url(&self, id: &str) -> String {
        format!("{}/{}.xml", self.base_url, id)
    }

    /// GET a document body, treating any transport or HTTP error status as
    /// metadata being unavailable for `id`.
    async fn fetch(&self, id: &str) -> Result<String> {
        let url = self.document_url(id);
        debug!(url = %url, "Fetching finding-aid document");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::metadata(id, format!("request to {url} failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::metadata(id, format!("{url} returned error: {e}")))?;

        resp.text()
            .await
            .map_err(|e| Error::metadata(id, format!("failed to read body of {url}: {e}")))
    }
}

/// Extract the component title from a component document.
pub fn parse_component_title(id: &str, body: &str) -> Result<ComponentTitle> {
    let malformed = |e: String| Error::metadata(id, format!("malformed document {e}"));

    let title = xml::first_text(body, UNITTITLE_PATH)
        .map_err(malformed)?
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| Error::metadata(id, "document has no c/did/unittitle"))?;
    let date = xml::first_text(body, UNITDATE_PATH).map_err(malformed)?;

    Ok(ComponentTitle::new(&title, date.as_deref()))
}

/// Extract the repository id from a collection document.
pub fn parse_repository_id(id: &str, body: &str) -> Result<String> {
    xml::first_attribute(body, REPOSITORY_PATH, "id")
        .map_err(|e| Error::metadata(id, format!("malformed document {e}")))?
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .ok_or_else(|| Error::metadata(id, "document has no archdesc/did/repository/@id"))
}

#[async_trait]
impl MetadataProvider for FindingAidsClient {
    fn name(&self) -> &'static str {
        "findingaids"
    }

    async fn component_title(&self, id: &ComponentId) -> Result<ComponentTitle> {
        let key = id.to_string();
        let body = self.fetch(&key).await?;
        parse_component_title(&key, &body)
    }

    async fn repository_id(&self, call_number: &CallNumber) -> Result<String> {
        let body = self.fetch(call_number.as_str()).await?;
        parse_repository_id(call_number.as_str(), &body)
    }
}
