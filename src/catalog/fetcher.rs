use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::error::CatalogError;
use super::parsing::{classify_object, parse_multi_tle};
use super::types::{CatalogEntry, ObjectType};

pub const CELESTRAK_ACTIVE_URL: &str =
    "https://celestrak.org/NORAD/elements/gp.php?GROUP=active&FORMAT=tle";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

impl FeedSource {
    fn celestrak_group(group: &str) -> Self {
        Self {
            name: group.to_string(),
            url: format!(
                "https://celestrak.org/NORAD/elements/gp.php?GROUP={}&FORMAT=tle",
                group
            ),
        }
    }

    pub fn default_active() -> Self {
        Self {
            name: "CelesTrak".to_string(),
            url: CELESTRAK_ACTIVE_URL.to_string(),
        }
    }

    pub fn default_debris() -> Vec<Self> {
        [
            "cosmos-1408-debris",
            "fengyun-1c-debris",
            "iridium-33-debris",
            "cosmos-2251-debris",
        ]
        .into_iter()
        .map(Self::celestrak_group)
        .collect()
    }
}

/// Downloads the active-satellite feed plus the debris-cloud feeds.
pub struct TleFetcher {
    client: reqwest::Client,
    active: FeedSource,
    debris: Vec<FeedSource>,
}

impl TleFetcher {
    pub fn new(active: FeedSource, debris: Vec<FeedSource>) -> Self {
        Self {
            client: reqwest::Client::new(),
            active,
            debris,
        }
    }

    /// Fetch all feeds. The active feed must succeed; debris feeds that fail
    /// are logged and skipped.
    pub async fn fetch_all(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let now = Utc::now();

        log::info!("Fetching TLEs from {} (active satellites)", self.active.name);
        let body = self.fetch_text(&self.active).await?;
        let mut entries = entries_from_feed(&body, &self.active.name, None, now);
        if entries.is_empty() {
            return Err(CatalogError::EmptyFeed {
                source_name: self.active.name.clone(),
            });
        }

        for source in &self.debris {
            log::info!("Fetching debris TLEs from {}", source.name);
            match self.fetch_text(source).await {
                Ok(body) => {
                    let debris =
                        entries_from_feed(&body, &source.name, Some(ObjectType::Debris), now);
                    log::debug!("{} objects from {}", debris.len(), source.name);
                    entries.extend(debris);
                }
                Err(e) => log::warn!("Skipping debris feed: {}", e),
            }
        }

        Ok(entries)
    }

    async fn fetch_text(&self, source: &FeedSource) -> Result<String, CatalogError> {
        let fetch_err = |error| CatalogError::Fetch {
            source_name: source.name.clone(),
            error,
        };
        self.client
            .get(&source.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(fetch_err)?
            .text()
            .await
            .map_err(fetch_err)
    }
}

/// Turn a feed body into catalog entries. `forced_type` overrides the
/// name-based classification (debris groups are debris regardless of name).
pub fn entries_from_feed(
    body: &str,
    source: &str,
    forced_type: Option<ObjectType>,
    now: DateTime<Utc>,
) -> Vec<CatalogEntry> {
    parse_multi_tle(body)
        .into_iter()
        .filter_map(|element| {
            let Some(norad_id) = element.norad_id() else {
                log::warn!("Error parsing TLE from {}: no NORAD id in '{}'", source, element.line1);
                return None;
            };
            Some(CatalogEntry {
                norad_id,
                object_type: forced_type.unwrap_or_else(|| classify_object(&element.name)),
                element,
                source: source.to_string(),
                created_at: now,
                updated_at: now,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = "ISS (ZARYA)
1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992
2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008
SOMESAT
1 4827XU 21035A   20194.50000000  .00000000  00000-0  00000-0 0  9997
2 4827X  97.4000 100.0000 0001000  90.0000 270.0000 15.21930000  1009
";

    #[test]
    fn feed_entries_skip_records_without_norad_id() {
        let now = Utc::now();
        let entries = entries_from_feed(FEED, "CelesTrak", None, now);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].norad_id, 25544);
        assert_eq!(entries[0].object_type, ObjectType::Payload);
        assert_eq!(entries[0].source, "CelesTrak");
    }

    #[test]
    fn debris_feeds_force_the_debris_type() {
        let entries =
            entries_from_feed(FEED, "iridium-33-debris", Some(ObjectType::Debris), Utc::now());
        assert!(entries.iter().all(|e| e.object_type == ObjectType::Debris));
    }

    #[test]
    fn default_debris_sources_point_at_celestrak_groups() {
        let sources = FeedSource::default_debris();
        assert_eq!(sources.len(), 4);
        assert!(sources[0].url.contains("GROUP=cosmos-1408-debris"));
    }
}
