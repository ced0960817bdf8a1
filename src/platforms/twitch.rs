use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::cache::{BadgeSets, EmoteTable, FetchError, ResourceFetcher};
use crate::config::EndpointSettings;

/// Badge display API response
#[derive(Debug, Deserialize)]
struct BadgeDisplayResponse {
    badge_sets: BadgeSets,
}

/// Emote entry of the third-party emote API
#[derive(Debug, Clone, Deserialize)]
struct ThirdPartyEmote {
    id: String,
    code: String,
}

#[derive(Debug, Deserialize)]
struct ChannelEmotesResponse {
    #[serde(rename = "channelEmotes", default)]
    channel_emotes: Vec<ThirdPartyEmote>,
    #[serde(rename = "sharedEmotes", default)]
    shared_emotes: Vec<ThirdPartyEmote>,
}

/// Fetches badge sets from Twitch and channel emotes from the third-party emote API
pub struct TwitchResourceFetcher {
    endpoints: EndpointSettings,
    http_client: reqwest::Client,
}

impl TwitchResourceFetcher {
    pub fn new(endpoints: EndpointSettings) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(endpoints.request_timeout_seconds))
            .user_agent(concat!("chatline/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        info!(
            "Resource fetcher using badges from {} and emotes from {}",
            endpoints.badges_api, endpoints.emotes_api
        );

        Ok(Self {
            endpoints,
            http_client,
        })
    }

    fn endpoint(base: &str, path: &str) -> Result<Url, FetchError> {
        Ok(Url::parse(&format!("{}/{}", base.trim_end_matches('/'), path))?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(FetchError::from)?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            }
            .into());
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    fn emote_table<I>(&self, emotes: I) -> EmoteTable
    where
        I: IntoIterator<Item = ThirdPartyEmote>,
    {
        let cdn = self.endpoints.emote_cdn.trim_end_matches('/');
        emotes
            .into_iter()
            .map(|emote| (emote.code, format!("{}/{}/2x", cdn, emote.id)))
            .collect()
    }
}

#[async_trait]
impl ResourceFetcher for TwitchResourceFetcher {
    async fn fetch_channel_badges(&self, channel_id: &str) -> Result<BadgeSets> {
        let url = Self::endpoint(&self.endpoints.badges_api, &format!("channels/{}/display", channel_id))?;
        let response: BadgeDisplayResponse = self.get_json(url).await?;
        Ok(response.badge_sets)
    }

    async fn fetch_channel_emotes(&self, channel_id: &str) -> Result<EmoteTable> {
        let url = Self::endpoint(&self.endpoints.emotes_api, &format!("users/twitch/{}", channel_id))?;
        let response: ChannelEmotesResponse = self.get_json(url).await?;
        Ok(self.emote_table(response.channel_emotes.into_iter().chain(response.shared_emotes)))
    }

    async fn fetch_global_badges(&self) -> Result<BadgeSets> {
        let url = Self::endpoint(&self.endpoints.badges_api, "global/display")?;
        let response: BadgeDisplayResponse = self.get_json(url).await?;
        Ok(response.badge_sets)
    }

    async fn fetch_global_emotes(&self) -> Result<EmoteTable> {
        let url = Self::endpoint(&self.endpoints.emotes_api, "emotes/global")?;
        let emotes: Vec<ThirdPartyEmote> = self.get_json(url).await?;
        Ok(self.emote_table(emotes))
    }
}
