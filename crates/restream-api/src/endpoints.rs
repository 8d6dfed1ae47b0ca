//! Typed wrappers for the control-API endpoints used by a relay session.
//!
//! Every success envelope nests its payload under `"data"`.

use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use restream_types::EventSpec;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::ApiResult;

/// Context carried over from the account's most recent event.
#[derive(Debug, Clone, Default)]
pub struct LastEventContext {
    /// Package restriction of the previous event, reusable for this one.
    pub required_packages: Vec<Value>,
}

/// Destination event created for this session.
#[derive(Debug, Clone)]
pub struct CreatedEvent {
    /// Event code used in all follow-up calls.
    pub code: String,

    /// Public link to the broadcast.
    pub shareable_url: String,
}

impl ApiClient {
    /// Fetch the account's last-event context.
    pub async fn last_event(&self) -> ApiResult<LastEventContext> {
        let value = self
            .request(Method::GET, "/core/v4/events/last-event/", None)
            .await?;

        let required_packages = value
            .pointer("/data/required_packages")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(LastEventContext { required_packages })
    }

    /// Upload the live-cover metadata; returns the hosted banner URL.
    pub async fn upload_live_cover(&self, spec: &EventSpec) -> ApiResult<String> {
        let payload = json!({
            "live_title": spec.title,
            "space_name": spec.space_name,
            "profile_url": spec.cover_profile_url,
        });

        let value = self
            .request(Method::POST, "/media/v1/image/live-cover/", Some(payload))
            .await?;
        data_string(&value, "/data/image_url")
    }

    /// Create the destination live event.
    pub async fn create_event(
        &self,
        spec: &EventSpec,
        banner_url: &str,
        required_packages: Vec<Value>,
    ) -> ApiResult<CreatedEvent> {
        let payload = json!({
            "title": spec.title,
            "description": spec.description,
            "start_at": now_millis(),
            "price_currency": spec.price_currency,
            "price": spec.price,
            "images": { "banner": banner_url },
            "visibility": spec.visibility,
            "notification": spec.notification,
            "invitation_emails": [],
            "chat_filter": [],
            "allow_chat": spec.allow_chat,
            "allowed_capture": spec.allowed_capture,
            "required_packages": required_packages,
        });

        let value = self
            .request(Method::POST, "/core/v4/events/", Some(payload))
            .await?;
        Ok(CreatedEvent {
            code: data_string(&value, "/data/code")?,
            shareable_url: data_string(&value, "/data/shareable_url")?,
        })
    }

    /// Fetch the public details of an event.
    pub async fn public_event_details(&self, code: &str) -> ApiResult<Value> {
        self.request(Method::GET, &format!("/core/v4/public/events/{code}/"), None)
            .await
    }

    /// Fetch the live-input parameters of an event.
    pub async fn live_input(&self, code: &str) -> ApiResult<Value> {
        self.request(
            Method::GET,
            &format!("/core/v4/live/event/{code}/input/"),
            None,
        )
        .await
    }

    /// Fetch the backstage ingest credentials; returns the full ingest URL.
    pub async fn backstage_input(&self, code: &str) -> ApiResult<String> {
        let value = self
            .request(
                Method::GET,
                &format!("/core/v4/live/event/{code}/backstage-input/?source=encoder"),
                None,
            )
            .await?;

        let target = data_string(&value, "/data/rtmps_stream_key")?;
        debug!(code, "ingest credentials retrieved");
        Ok(target)
    }

    /// Flip the event live.
    pub async fn go_live(&self, code: &str) -> ApiResult<()> {
        self.request(
            Method::POST,
            &format!("/core/v4/events/{code}/live/"),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }
}

fn data_string(value: &Value, pointer: &str) -> ApiResult<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError::UnexpectedResponse(format!("missing field {pointer}")))
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
