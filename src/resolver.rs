/// Share-link resolution
///
/// Turns a token into one of four outcomes with exactly one read, and for
/// a viewable share fires the advisory view counter without waiting on it.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::LinkError;
use crate::state::data::{ShareLink, ShareStatus};
use crate::store::ShareStore;

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Lookup failed or nothing matched the token
    NotFound,
    /// Already signed: show the confirmation only
    Signed(ShareLink),
    /// Not active any more, or past its expiry
    Expired(ShareLink),
    Viewable(ShareLink),
}

impl Resolution {
    pub fn share(&self) -> Option<&ShareLink> {
        match self {
            Resolution::NotFound => None,
            Resolution::Signed(share) | Resolution::Expired(share) | Resolution::Viewable(share) => {
                Some(share)
            }
        }
    }
}

/// Classify a fetched record at time `now`.
pub fn classify(share: Option<ShareLink>, now: DateTime<Utc>) -> Resolution {
    match share {
        None => Resolution::NotFound,
        Some(share) if share.status == ShareStatus::Signed => Resolution::Signed(share),
        Some(share) if share.status != ShareStatus::Active || share.is_past_expiry(now) => {
            Resolution::Expired(share)
        }
        Some(share) => Resolution::Viewable(share),
    }
}

/// Fetch and classify the share for `token`.
///
/// Must be called from within a tokio runtime: the view counter update is
/// spawned and its outcome is only logged.
pub async fn resolve(store: Arc<dyn ShareStore>, token: String, now: DateTime<Utc>) -> Resolution {
    let found = match store.find_by_token(&token).await {
        Ok(found) => found,
        Err(e) => {
            warn!(error = %e, "share lookup failed");
            None
        }
    };

    let resolution = classify(found, now);
    match &resolution {
        Resolution::NotFound => info!("share link not found"),
        Resolution::Signed(share) => info!(share = %share.id, "share already signed"),
        Resolution::Expired(share) => {
            info!(share = %share.id, status = share.status.as_str(), "share expired")
        }
        Resolution::Viewable(share) => {
            info!(share = %share.id, photos = share.photos.len(), "share opened");
            let store = Arc::clone(&store);
            let share = share.clone();
            tokio::spawn(async move {
                if let Err(e) = store.record_view(&share, now).await {
                    debug!(error = %e, share = %share.id, "view tracking failed");
                }
            });
        }
    }

    resolution
}

/// Extract a share token from a bare token or a full share URL.
///
/// `https://host/photos/share/AbC123?utm=x` and `AbC123` both give `AbC123`.
pub fn parse_share_token(input: &str) -> Result<String, LinkError> {
    let input = input.trim();
    let without_suffix = input
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    let token = without_suffix
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or_default();

    if token.is_empty() || token.ends_with(':') {
        return Err(LinkError::Empty);
    }
    Ok(token.to_string())
}
