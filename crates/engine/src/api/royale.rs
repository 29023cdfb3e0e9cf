//! Royale API client for clan data (bearer-token authenticated)

use reqwest::Client;
use tracing::debug;

use crate::{SyncError, SyncResult};

pub const DEFAULT_BASE_URL: &str = "https://api.clashroyale.com/v1";

/// A clan resource exposed by the remote API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Members,
    Warlog,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Members => "members",
            Self::Warlog => "warlog",
        }
    }
}

/// Royale API client
#[derive(Clone)]
pub struct RoyaleClient {
    client: Client,
    base_url: String,
    token: String,
}

impl RoyaleClient {
    /// Create a new client. `token` is the bearer token issued by the
    /// game-data API; `base_url` should not have a trailing slash.
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Fetch the raw JSON body of one clan resource.
    ///
    /// `clan_tag` is passed without the leading `#`; the tag is sent
    /// URL-encoded (`%23` prefix) as the API requires. A non-200 response is
    /// surfaced as RemoteFetch with the response body attached.
    pub async fn fetch(&self, clan_tag: &str, resource: Resource) -> SyncResult<String> {
        let url = format!(
            "{}/clans/%23{}/{}",
            self.base_url,
            clan_tag,
            resource.as_str()
        );

        debug!(clan_tag, resource = resource.as_str(), "Requesting remote API");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        debug!(
            clan_tag,
            resource = resource.as_str(),
            status = status.as_u16(),
            "Remote API response"
        );

        if !status.is_success() {
            return Err(SyncError::RemoteFetch {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}
