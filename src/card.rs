//! Episode cards and the HTML export of a page of them.
//!
//! A card keeps the server's text untouched; each output sanitizes it for
//! its medium. The HTML renderer escapes every server-supplied string, both
//! in text and in attributes, so only the markup built here is live.
//!
//! An exported page is a static file, so its "Mark as listened" action is a
//! disabled button carrying the episode id; marking happens in the terminal.

use crate::controller::{EpisodeListController, Pagination};
use crate::error::Result;
use crate::format::{collapse_whitespace, format_pub_date};
use crate::types::{Episode, Id, ListenLink};
use chrono::{DateTime, TimeZone, Utc};
use htmlescape::{encode_attribute, encode_minimal};
use log::info;
use std::fmt::Display;
use std::fmt::Write;
use std::fs;
use std::path::Path;

/// Everything one episode card displays.
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeCard {
    pub id: Id,
    pub podcast_name: String,
    pub title: String,
    pub date_label: String,
    pub duration: Option<String>,
    pub description: Option<String>,
    pub link: ListenLink,
    pub listened: bool,
}

impl EpisodeCard {
    pub fn from_episode<Tz>(episode: &Episode, now: &DateTime<Utc>, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Self {
            id: episode.id.clone(),
            podcast_name: episode.podcast_name().to_string(),
            title: episode.title.clone(),
            date_label: format_pub_date(&episode.pub_date, now, tz),
            duration: episode.duration.clone().filter(|d| !d.is_empty()),
            description: episode
                .description
                .as_deref()
                .map(collapse_whitespace)
                .filter(|d| !d.is_empty()),
            link: episode.listen_link(),
            listened: episode.listened,
        }
    }

    /// Date and duration joined for the meta line.
    pub fn meta(&self) -> String {
        match &self.duration {
            Some(duration) => format!("{}  ·  {}", self.date_label, duration),
            None => self.date_label.clone(),
        }
    }

    /// Render the card as an HTML fragment.
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use podcast_tracker::card::EpisodeCard;
    /// use podcast_tracker::types::Episode;
    ///
    /// let json = r#"{"id": 1, "title": "<b>x</b>", "pub_date": "2024-03-05T10:00:00",
    ///                "episode_url": "https://example.com/1.mp3"}"#;
    /// let episode: Episode = serde_json::from_str(json).unwrap();
    /// let now = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();
    /// let html = EpisodeCard::from_episode(&episode, &now, &Utc).to_html();
    /// assert!(html.contains("&lt;b&gt;x&lt;/b&gt;"));
    /// assert!(!html.contains("<b>x</b>"));
    /// ```
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        html.push_str("<article class=\"episode-card\">\n");
        let _ = writeln!(
            html,
            "  <div class=\"episode-podcast\">{}</div>",
            encode_minimal(&self.podcast_name)
        );
        let _ = writeln!(
            html,
            "  <h3 class=\"episode-title\">{}</h3>",
            encode_minimal(&self.title)
        );
        html.push_str("  <div class=\"episode-meta\">");
        let _ = write!(html, "<span>{}</span>", encode_minimal(&self.date_label));
        if let Some(duration) = &self.duration {
            let _ = write!(html, "<span>{}</span>", encode_minimal(duration));
        }
        html.push_str("</div>\n");
        if let Some(description) = &self.description {
            let _ = writeln!(
                html,
                "  <p class=\"episode-description\">{}</p>",
                encode_minimal(description)
            );
        }
        let _ = writeln!(
            html,
            "  <a class=\"btn btn-primary\" href=\"{}\" target=\"_blank\" rel=\"noopener\">{}</a>",
            encode_attribute(&self.link.url),
            self.link.label
        );
        let _ = writeln!(
            html,
            "  <button class=\"btn btn-secondary mark-listened\" type=\"button\" \
             data-episode-id=\"{}\" disabled>Mark as listened</button>",
            encode_attribute(&self.id.to_string())
        );
        html.push_str("</article>\n");
        html
    }
}

/// Render a standalone HTML page of cards.
///
/// With no cards the page shows the empty state and no pagination.
pub fn render_document(
    cards: &[EpisodeCard],
    pagination: Option<&Pagination>,
    total_episodes: Option<u64>,
    filter_label: &str,
) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Podcast Tracker</title>\n</head>\n<body>\n",
    );
    let _ = writeln!(
        html,
        "<header><h1>Podcast Tracker</h1><p>{} · {} pending episodes</p></header>",
        encode_minimal(filter_label),
        total_episodes.unwrap_or(0)
    );

    if cards.is_empty() {
        html.push_str("<section class=\"empty-state\"><p>No pending episodes</p></section>\n");
    } else {
        html.push_str("<section class=\"episodes\">\n");
        for card in cards {
            html.push_str(&card.to_html());
        }
        html.push_str("</section>\n");
        if let Some(pagination) = pagination {
            let _ = writeln!(
                html,
                "<nav class=\"pagination\"><span class=\"page-info\">{}</span></nav>",
                pagination.label()
            );
        }
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// Write the controller's current page to `path` as an HTML document.
pub fn export_page<Tz>(
    controller: &EpisodeListController,
    path: &Path,
    now: &DateTime<Utc>,
    tz: &Tz,
) -> Result<()>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let cards = controller.cards(now, tz);
    let html = render_document(
        &cards,
        controller.pagination(),
        controller.total_episodes(),
        controller.filter_label(),
    );
    fs::write(path, html)?;
    info!("Exported {} episodes to {}", cards.len(), path.display());
    Ok(())
}
