use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::config::MirrorConfig;
use crate::domain::{Item, ItemIndex};
use crate::error::MirrorError;

/// Read-only access to the remote catalog.
pub trait CatalogClient: Send + Sync {
    fn fetch_latest(&self) -> Result<Item, MirrorError>;
    fn fetch_item(&self, index: ItemIndex) -> Result<Item, MirrorError>;
    /// Opens the asset body; bytes are pulled by the caller while writing.
    fn open_asset(&self, url: &str) -> Result<Box<dyn Read + Send>, MirrorError>;
}

/// Current upper bound of the catalog, read once per run.
pub fn latest_index(client: &dyn CatalogClient) -> Result<ItemIndex, MirrorError> {
    let latest = client.fetch_latest()?;
    latest.index()
}

#[derive(Clone)]
pub struct CatalogHttpClient {
    client: Client,
    base_url: String,
    json_file: String,
}

impl CatalogHttpClient {
    pub fn new(base_url: &str, json_file: &str, timeout: Duration) -> Result<Self, MirrorError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("xkcd-mirror/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| MirrorError::InvalidConfig(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| MirrorError::Transport {
                url: base_url.to_string(),
                message: err.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            json_file: json_file.trim_start_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &MirrorConfig) -> Result<Self, MirrorError> {
        Self::new(
            &config.base_url,
            &config.json_file,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn latest_url(&self) -> String {
        format!("{}/{}", self.base_url, self.json_file)
    }

    pub fn item_url(&self, index: ItemIndex) -> String {
        format!("{}/{}/{}", self.base_url, index, self.json_file)
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, MirrorError> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| MirrorError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            })?;
        Self::handle_status(url, response)
    }

    fn handle_status(
        url: &str,
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, MirrorError> {
        if response.status().is_success() {
            return Ok(response);
        }
        Err(MirrorError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        })
    }

    fn fetch_metadata(&self, url: &str) -> Result<Item, MirrorError> {
        let body = self
            .get(url)?
            .text()
            .map_err(|err| MirrorError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            })?;
        decode_item(url, &body)
    }
}

impl CatalogClient for CatalogHttpClient {
    fn fetch_latest(&self) -> Result<Item, MirrorError> {
        self.fetch_metadata(&self.latest_url())
    }

    fn fetch_item(&self, index: ItemIndex) -> Result<Item, MirrorError> {
        self.fetch_metadata(&self.item_url(index))
    }

    fn open_asset(&self, url: &str) -> Result<Box<dyn Read + Send>, MirrorError> {
        Ok(Box::new(self.get(url)?))
    }
}

/// Parses a metadata document; `num` must be a positive index.
pub fn decode_item(url: &str, body: &str) -> Result<Item, MirrorError> {
    let item: Item = serde_json::from_str(body).map_err(|err| MirrorError::Decode {
        url: url.to_string(),
        message: err.to_string(),
    })?;
    if item.num == 0 {
        return Err(MirrorError::Decode {
            url: url.to_string(),
            message: "item number must be positive".to_string(),
        });
    }
    Ok(item)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn builds_endpoint_urls() {
        let client =
            CatalogHttpClient::new("https://xkcd.com/", "info.0.json", Duration::from_secs(5))
                .unwrap();
        let index = ItemIndex::new(353).unwrap();
        assert_eq!(client.latest_url(), "https://xkcd.com/info.0.json");
        assert_eq!(client.item_url(index), "https://xkcd.com/353/info.0.json");
    }

    #[test]
    fn decode_full_document() {
        let body = r#"{"num":353,"img":"https://imgs.xkcd.com/comics/python.png","alt":"I wrote 20 short programs in Python yesterday.","transcript":"[[ Guy 1 is talking to Guy 2 ]]"}"#;
        let item = decode_item("u", body).unwrap();
        assert_eq!(item.num, 353);
        assert_eq!(item.asset_filename(), Some("python.png"));
        assert_eq!(item.metadata_fields().len(), 2);
    }

    #[test]
    fn decode_malformed_body() {
        let err = decode_item("u", "<html>not json</html>").unwrap_err();
        assert_matches!(err, MirrorError::Decode { .. });
    }

    #[test]
    fn decode_rejects_zero_num() {
        let err = decode_item("u", r#"{"num":0,"img":""}"#).unwrap_err();
        assert_matches!(err, MirrorError::Decode { .. });
    }

    #[test]
    fn decode_requires_num() {
        let err = decode_item("u", r#"{"img":"https://x/y.png"}"#).unwrap_err();
        assert_matches!(err, MirrorError::Decode { .. });
    }
}
