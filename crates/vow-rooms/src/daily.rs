use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, RoomError};
use crate::provider::RoomProvider;
use crate::types::{Room, RoomInfo};

/// Participants may join this long before the scheduled start.
const EARLY_JOIN_MINUTES: i64 = 5;

/// Client for a Daily.co-compatible REST API.
pub struct DailyRoomProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct CreateRoomRequest {
    privacy: &'static str,
    properties: RoomProperties,
}

#[derive(Serialize, Deserialize, Default)]
struct RoomProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    nbf: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

#[derive(Deserialize)]
struct RoomResponse {
    name: String,
    url: String,
    #[serde(default)]
    config: RoomProperties,
}

fn from_unix(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| DateTime::from_timestamp(s, 0))
}

/// Room name is the last path segment of its URL.
pub fn room_name_from_url(url: &str) -> Option<&str> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
}

impl DailyRoomProvider {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(cfg: &vow_core::config::RoomsConfig) -> Result<Self> {
        Self::new(
            cfg.api_key.clone(),
            cfg.base_url.clone(),
            Duration::from_secs(cfg.timeout_secs),
        )
    }

    fn room_url(&self, url: &str) -> Result<String> {
        let name = room_name_from_url(url)
            .ok_or_else(|| RoomError::Parse(format!("no room name in url {url:?}")))?;
        Ok(format!("{}/rooms/{}", self.base_url, name))
    }

    async fn error_from(resp: reqwest::Response) -> RoomError {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        warn!(status, body = %text, "room API error");
        RoomError::Api {
            status,
            message: text,
        }
    }
}

#[async_trait]
impl RoomProvider for DailyRoomProvider {
    fn name(&self) -> &str {
        "daily"
    }

    async fn create_room(
        &self,
        will_id: &str,
        scheduled_start: DateTime<Utc>,
        duration_minutes: u32,
    ) -> Result<Room> {
        let nbf = scheduled_start - chrono::Duration::minutes(EARLY_JOIN_MINUTES);
        let exp = scheduled_start + chrono::Duration::minutes(i64::from(duration_minutes));
        let body = CreateRoomRequest {
            privacy: "public",
            properties: RoomProperties {
                nbf: Some(nbf.timestamp()),
                exp: Some(exp.timestamp()),
            },
        };

        let resp = self
            .client
            .post(format!("{}/rooms", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_from(resp).await);
        }

        let room: RoomResponse = resp
            .json()
            .await
            .map_err(|e| RoomError::Parse(e.to_string()))?;
        info!(will_id = %will_id, room = %room.name, "video room created");
        Ok(Room {
            name: room.name,
            url: room.url,
            expires_at: from_unix(room.config.exp).or(Some(exp)),
        })
    }

    async fn delete_room(&self, url: &str) -> Result<()> {
        let endpoint = self.room_url(url)?;
        let resp = self
            .client
            .delete(&endpoint)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(url = %url, "room already gone");
            return Ok(());
        }
        if !resp.status().is_success() {
            return Err(Self::error_from(resp).await);
        }
        Ok(())
    }

    async fn room_info(&self, url: &str) -> Result<Option<RoomInfo>> {
        let endpoint = self.room_url(url)?;
        let resp = self
            .client
            .get(&endpoint)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Self::error_from(resp).await);
        }
        let room: RoomResponse = resp
            .json()
            .await
            .map_err(|e| RoomError::Parse(e.to_string()))?;
        Ok(Some(RoomInfo {
            name: room.name,
            url: room.url,
            not_before: from_unix(room.config.nbf),
            expires_at: from_unix(room.config.exp),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> DailyRoomProvider {
        DailyRoomProvider::new("k3y".into(), server.uri(), Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn room_name_is_last_segment() {
        assert_eq!(room_name_from_url("https://x.daily.co/abc123"), Some("abc123"));
        assert_eq!(room_name_from_url("https://x.daily.co/abc123/"), Some("abc123"));
        assert_eq!(room_name_from_url("https:"), None);
        assert_eq!(room_name_from_url(""), None);
    }

    #[tokio::test]
    async fn create_room_sends_join_window() {
        let server = MockServer::start().await;
        let start = Utc.with_ymd_and_hms(2026, 5, 1, 18, 0, 0).unwrap();
        let nbf = (start - chrono::Duration::minutes(5)).timestamp();
        let exp = (start + chrono::Duration::minutes(30)).timestamp();

        Mock::given(method("POST"))
            .and(path("/rooms"))
            .and(header("authorization", "Bearer k3y"))
            .and(body_partial_json(serde_json::json!({
                "properties": { "nbf": nbf, "exp": exp }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "r1",
                "url": "https://x.daily.co/r1",
                "config": { "nbf": nbf, "exp": exp }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let room = provider(&server).create_room("w1", start, 30).await.unwrap();
        assert_eq!(room.name, "r1");
        assert_eq!(room.url, "https://x.daily.co/r1");
        assert_eq!(room.expires_at, Some(start + chrono::Duration::minutes(30)));
    }

    #[tokio::test]
    async fn create_room_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = provider(&server)
            .create_room("w1", Utc::now(), 30)
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::Api { status: 401, .. }));
    }

    #[tokio::test]
    async fn room_info_maps_404_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rooms/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rooms/r1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "r1",
                "url": "https://x.daily.co/r1",
                "config": { "exp": 1_777_000_000 }
            })))
            .mount(&server)
            .await;

        let p = provider(&server);
        assert!(p.room_info("https://x.daily.co/gone").await.unwrap().is_none());
        let info = p.room_info("https://x.daily.co/r1").await.unwrap().unwrap();
        assert_eq!(info.name, "r1");
        assert!(info.not_before.is_none());
        assert!(info.expires_at.is_some());
    }

    #[tokio::test]
    async fn delete_room_targets_name_and_tolerates_missing() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rooms/r1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rooms/r2"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let p = provider(&server);
        p.delete_room("https://x.daily.co/r1").await.unwrap();
        p.delete_room("https://x.daily.co/r2").await.unwrap();
    }
}
