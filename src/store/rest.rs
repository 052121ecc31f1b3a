use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use super::ShareStore;
use crate::error::StoreError;
use crate::state::data::{ShareLink, SignatureSubmission};

/// Share store on a hosted PostgREST endpoint (`/rest/v1/<table>`).
pub struct RestShareStore {
    client: reqwest::Client,
    base_url: String,
    table: String,
}

#[derive(Serialize)]
struct ViewUpdate {
    view_count: i64,
    last_viewed_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct SignatureUpdate<'a> {
    signature_data: &'a str,
    signer_name: &'a str,
    signed_at: DateTime<Utc>,
    status: &'static str,
}

/// The part of the returned row the sign-off needs
#[derive(Deserialize)]
struct SignedRow {
    #[serde(default)]
    signed_at: Option<DateTime<Utc>>,
}

/// The timestamp the store kept for a conditional sign-off write. No rows
/// back means the status filter matched nothing.
fn stored_signed_at(rows: Vec<SignedRow>, sent: DateTime<Utc>) -> Result<DateTime<Utc>, StoreError> {
    let row = rows.into_iter().next().ok_or(StoreError::AlreadySigned)?;
    Ok(row.signed_at.unwrap_or(sent))
}

impl RestShareStore {
    pub fn new(
        base_url: &str,
        api_key: &str,
        table: &str,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        if base_url.trim().is_empty() {
            return Err(StoreError::NotConfigured("rest_url is empty".to_string()));
        }
        if api_key.trim().is_empty() {
            return Err(StoreError::NotConfigured("api_key is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(auth_headers(api_key)?)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            table: table.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }
}

fn auth_headers(api_key: &str) -> Result<HeaderMap, StoreError> {
    let invalid = |e: reqwest::header::InvalidHeaderValue| {
        StoreError::NotConfigured(format!("invalid api key: {e}"))
    };
    let mut headers = HeaderMap::new();
    headers.insert("apikey", HeaderValue::from_str(api_key).map_err(invalid)?);
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(invalid)?,
    );
    Ok(headers)
}

async fn read_rows<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<Vec<T>, StoreError> {
    let status = response.status();
    if !status.is_success() {
        return Err(StoreError::Status(status.as_u16()));
    }
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

#[async_trait]
impl ShareStore for RestShareStore {
    #[instrument(name = "rest_find_share", skip(self, token))]
    async fn find_by_token(&self, token: &str) -> Result<Option<ShareLink>, StoreError> {
        let response = self
            .client
            .get(self.endpoint())
            .query(&[
                ("select", "*".to_string()),
                ("share_token", format!("eq.{token}")),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;

        let rows: Vec<ShareLink> = read_rows(response).await?;
        Ok(rows.into_iter().next())
    }

    async fn record_view(&self, share: &ShareLink, at: DateTime<Utc>) -> Result<(), StoreError> {
        // Read-modify-write; the counter is advisory and may lose updates.
        let response = self
            .client
            .patch(self.endpoint())
            .query(&[("id", format!("eq.{}", share.id))])
            .json(&ViewUpdate {
                view_count: share.view_count + 1,
                last_viewed_at: at,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }
        debug!(share = %share.id, "view recorded");
        Ok(())
    }

    #[instrument(name = "rest_submit_signature", skip(self, submission))]
    async fn submit_signature(
        &self,
        id: &str,
        submission: &SignatureSubmission,
    ) -> Result<DateTime<Utc>, StoreError> {
        let signed_at = Utc::now();

        let response = self
            .client
            .patch(self.endpoint())
            .query(&[("id", format!("eq.{id}")), ("status", "eq.active".to_string())])
            .header("Prefer", "return=representation")
            .json(&SignatureUpdate {
                signature_data: &submission.signature_data,
                signer_name: &submission.signer_name,
                signed_at,
                status: "signed",
            })
            .send()
            .await?;

        let rows: Vec<SignedRow> = read_rows(response).await?;
        stored_signed_at(rows, signed_at)
    }
}

impl std::fmt::Debug for RestShareStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestShareStore")
            .field("endpoint", &self.endpoint())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let store = RestShareStore::new(
            "https://project.supabase.co/",
            "anon-key",
            "photo_shares",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(store.endpoint(), "https://project.supabase.co/rest/v1/photo_shares");
    }

    #[test]
    fn test_missing_settings_are_rejected() {
        let err = RestShareStore::new("", "key", "photo_shares", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, StoreError::NotConfigured(_)));

        let err = RestShareStore::new("https://x.test", " ", "photo_shares", Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotConfigured(_)));
    }

    #[test]
    fn test_auth_headers() {
        let headers = auth_headers("anon-key").unwrap();
        assert_eq!(headers["apikey"], "anon-key");
        assert_eq!(headers[AUTHORIZATION], "Bearer anon-key");
        assert!(auth_headers("bad\nkey").is_err());
    }

    #[test]
    fn test_signature_update_body() {
        let signed_at = "2026-04-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let body = serde_json::to_value(SignatureUpdate {
            signature_data: "data:image/png;base64,AAAA",
            signer_name: "J Smith",
            signed_at,
            status: "signed",
        })
        .unwrap();
        assert_eq!(body["status"], "signed");
        assert_eq!(body["signer_name"], "J Smith");
        assert_eq!(body["signed_at"], "2026-04-01T10:00:00Z");
    }

    #[test]
    fn test_signed_at_comes_from_returned_row() {
        let sent = "2026-04-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();

        let rows: Vec<SignedRow> =
            serde_json::from_str(r#"[{"id": "s1", "status": "signed", "signed_at": "2026-04-01T10:00:03.250+00:00"}]"#)
                .unwrap();
        let stored = stored_signed_at(rows, sent).unwrap();
        assert_eq!(stored, "2026-04-01T10:00:03.250Z".parse::<DateTime<Utc>>().unwrap());

        let rows: Vec<SignedRow> = serde_json::from_str(r#"[{"id": "s1", "signed_at": null}]"#).unwrap();
        assert_eq!(stored_signed_at(rows, sent).unwrap(), sent);

        let err = stored_signed_at(Vec::new(), sent).unwrap_err();
        assert!(matches!(err, StoreError::AlreadySigned));
    }
}
