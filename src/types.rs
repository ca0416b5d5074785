//! Type definitions for the podcast-tracker client.
//!
//! These mirror the JSON documents served by the Podcast Tracker API. The
//! server owns every field; the client only reads them and asks for the
//! `listened` flag to change.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use std::fmt;
use std::str::FromStr;

/// Number of episodes requested per page.
pub const PAGE_SIZE: u32 = 20;

/// Label shown for episodes whose podcast was not embedded in the response.
pub const UNKNOWN_PODCAST: &str = "Unknown Podcast";

/// Server identifier. The API may send either a JSON number or a string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(i64),
    Text(String),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Number(n) => write!(f, "{}", n),
            Id::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Id::Number(value)
    }
}

impl From<&str> for Id {
    /// Numeric strings become [`Id::Number`], anything else is kept as text.
    fn from(value: &str) -> Self {
        let trimmed = value.trim();
        match trimmed.parse::<i64>() {
            Ok(n) => Id::Number(n),
            Err(_) => Id::Text(trimmed.to_string()),
        }
    }
}

impl FromStr for Id {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Id::from(s))
    }
}

/// A podcast as listed by `GET /api/podcasts`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Podcast {
    pub id: Id,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spotify_url: Option<String>,
}

impl Podcast {
    pub fn new(id: Id, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: None,
            spotify_url: None,
        }
    }
}

/// A single podcast episode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: Id,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub pub_date: DateTime<Utc>,
    #[serde(default)]
    pub duration: Option<String>,
    pub episode_url: String,
    #[serde(default)]
    pub spotify_url: Option<String>,
    #[serde(default)]
    pub podcast_id: Option<Id>,
    #[serde(default)]
    pub podcast: Option<Podcast>,
    #[serde(default)]
    pub listened: bool,
}

/// Where the "listen" action of a card points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenLink {
    pub label: &'static str,
    pub url: String,
}

impl Episode {
    /// Name of the owning podcast, or [`UNKNOWN_PODCAST`].
    ///
    /// ```
    /// use podcast_tracker::types::{Episode, UNKNOWN_PODCAST};
    ///
    /// let json = r#"{"id": 1, "title": "Pilot", "pub_date": "2024-03-05T10:00:00",
    ///                "episode_url": "https://example.com/1.mp3"}"#;
    /// let episode: Episode = serde_json::from_str(json).unwrap();
    /// assert_eq!(episode.podcast_name(), UNKNOWN_PODCAST);
    /// ```
    pub fn podcast_name(&self) -> &str {
        self.podcast
            .as_ref()
            .map(|p| p.name.as_str())
            .unwrap_or(UNKNOWN_PODCAST)
    }

    /// The link behind the card's listen action. A Spotify link wins over the
    /// generic episode URL; an empty Spotify link counts as absent.
    pub fn listen_link(&self) -> ListenLink {
        match self.spotify_url.as_deref().filter(|url| !url.is_empty()) {
            Some(url) => ListenLink {
                label: "Listen on Spotify",
                url: url.to_string(),
            },
            None => ListenLink {
                label: "Listen",
                url: self.episode_url.clone(),
            },
        }
    }
}

/// Parameters of one list request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListQuery {
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
    pub podcast_filter: Option<Id>,
}

impl ListQuery {
    pub fn new(page: u32, podcast_filter: Option<Id>) -> Self {
        Self {
            page: page.max(1),
            page_size: PAGE_SIZE,
            podcast_filter,
        }
    }

    /// Query-string pairs for `GET /api/episodes`.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("page_size", self.page_size.to_string()),
        ];
        if let Some(id) = &self.podcast_filter {
            pairs.push(("podcast_id", id.to_string()));
        }
        pairs
    }
}

/// One page of episodes as returned by `GET /api/episodes`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListResult {
    pub episodes: Vec<Episode>,
    pub page: u32,
    pub total_pages: u32,
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

/// Body of `POST /api/podcasts/refresh`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_episodes: Option<u64>,
}

/// Parse a server timestamp. RFC 3339 values keep their offset; naive values
/// (the API's default) are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn episode_json(extra: &str) -> String {
        format!(
            r#"{{"id": 7, "title": "Pilot", "pub_date": "2024-03-05T10:00:00",
                "episode_url": "https://example.com/7.mp3"{}}}"#,
            extra
        )
    }

    #[test]
    fn test_id_accepts_number_and_string() {
        let n: Id = serde_json::from_str("42").unwrap();
        let s: Id = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(n, Id::Number(42));
        assert_eq!(s, Id::Text("abc".to_string()));
        assert_eq!(n.to_string(), "42");
        assert_eq!(s.to_string(), "abc");
    }

    #[test]
    fn test_id_from_str() {
        assert_eq!("12".parse::<Id>().unwrap(), Id::Number(12));
        assert_eq!(" x1 ".parse::<Id>().unwrap(), Id::Text("x1".to_string()));
        assert_eq!(Id::from("7"), Id::Number(7));
    }

    #[test]
    fn test_episode_minimal_fields() {
        let episode: Episode = serde_json::from_str(&episode_json("")).unwrap();
        assert_eq!(episode.id, Id::Number(7));
        assert!(episode.description.is_none());
        assert!(episode.duration.is_none());
        assert!(!episode.listened);
        assert_eq!(
            episode.pub_date,
            Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_episode_with_podcast_and_unknown_fields() {
        let extra = r#", "podcast_id": 3, "created_at": "2024-03-05T10:00:00",
            "podcast": {"id": 3, "name": "Daily", "rss_url": "https://x/feed"}"#;
        let episode: Episode = serde_json::from_str(&episode_json(extra)).unwrap();
        assert_eq!(episode.podcast_name(), "Daily");
        assert_eq!(episode.podcast_id, Some(Id::Number(3)));
    }

    #[test]
    fn test_listen_link_prefers_spotify() {
        let extra = r#", "spotify_url": "https://open.spotify.com/episode/1""#;
        let episode: Episode = serde_json::from_str(&episode_json(extra)).unwrap();
        let link = episode.listen_link();
        assert_eq!(link.url, "https://open.spotify.com/episode/1");
        assert_eq!(link.label, "Listen on Spotify");
    }

    #[test]
    fn test_listen_link_falls_back_to_episode_url() {
        let extra = r#", "spotify_url": """#;
        let episode: Episode = serde_json::from_str(&episode_json(extra)).unwrap();
        assert_eq!(episode.listen_link().url, "https://example.com/7.mp3");
        assert_eq!(episode.listen_link().label, "Listen");
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-05T10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T10:00:00.000"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T11:00:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_list_query_pairs() {
        let query = ListQuery::new(2, None);
        assert_eq!(
            query.to_pairs(),
            vec![("page", "2".to_string()), ("page_size", "20".to_string())]
        );

        let filtered = ListQuery::new(0, Some(Id::Number(5)));
        assert_eq!(filtered.page, 1);
        assert!(filtered.to_pairs().contains(&("podcast_id", "5".to_string())));
    }

    #[test]
    fn test_list_result_deserialization() {
        let json = format!(
            r#"{{"episodes": [{}], "page": 1, "total_pages": 3, "total": 41, "page_size": 20}}"#,
            episode_json("")
        );
        let result: ListResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result.episodes.len(), 1);
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.total, 41);
    }
}
