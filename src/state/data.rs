/// Shared data structures for the application state
///
/// These structs represent the share records that flow between
/// the store layer and the UI layer. They deserialize straight from
/// the hosted store's JSON rows and from the SQLite columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hosted rows carry explicit nulls; treat them like missing fields
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Tag assumed for photos that carry no `photo_type`
pub const GENERAL_PHOTO_TYPE: &str = "general";

/// Lifecycle status of a share link
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShareStatus {
    #[default]
    Active,
    Signed,
    Expired,
    Revoked,
    /// Any status string this build does not know about
    #[serde(other)]
    Unknown,
}

impl ShareStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShareStatus::Active => "active",
            ShareStatus::Signed => "signed",
            ShareStatus::Expired => "expired",
            ShareStatus::Revoked => "revoked",
            ShareStatus::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "active" => ShareStatus::Active,
            "signed" => ShareStatus::Signed,
            "expired" => ShareStatus::Expired,
            "revoked" => ShareStatus::Revoked,
            _ => ShareStatus::Unknown,
        }
    }
}

/// A single photo inside a share (read-only snapshot)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Photo {
    pub id: String,
    pub file_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    /// Finer-grained workflow tag (e.g. "before", "cable_route")
    #[serde(default)]
    pub photo_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl Photo {
    /// The workflow tag, if one is set. Blank tags count as unset.
    pub fn tagged_type(&self) -> Option<&str> {
        self.photo_type
            .as_deref()
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
    }

    /// The workflow tag used for grouping, "general" when absent
    pub fn effective_type(&self) -> &str {
        self.tagged_type().unwrap_or(GENERAL_PHOTO_TYPE)
    }
}

/// Signature attached on sign-off
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SignatureRecord {
    /// PNG data URI
    pub signature_data: String,
    pub signer_name: String,
    pub signed_at: DateTime<Utc>,
}

/// A token-addressable bundle of photos for client review
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ShareLink {
    pub id: String,
    pub share_token: String,
    pub project_reference: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub photos: Vec<Photo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub requires_signature: bool,
    #[serde(default)]
    pub status: ShareStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub view_count: i64,
    #[serde(default)]
    pub last_viewed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub signature: Option<SignatureRecord>,
}

impl ShareLink {
    /// Heading shown to the client: title, or the project reference
    pub fn display_title(&self) -> &str {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title,
            _ => &self.project_reference,
        }
    }

    /// True when `expires_at` lies before `now`
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires < now)
    }
}

/// Payload of the single sign-off write
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureSubmission {
    pub signature_data: String,
    /// Already trimmed
    pub signer_name: String,
}
