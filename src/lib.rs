//! A terminal client for a Podcast Tracker server.
//!
//! podcast-tracker lists the pending episodes of the podcasts a server
//! tracks, one page at a time, optionally filtered to a single podcast.
//! Episodes can be marked as listened, and the server can be asked to
//! refresh every feed.
//!
//! # Features
//!
//! - Paginated episode cards with relative publication dates
//! - Podcast filter with an "All podcasts" entry
//! - Mark-as-listened and feed refresh with toast notifications
//! - Periodic reload of the current page
//! - HTML export of a page
//!
//! # Usage
//!
//! ```bash
//! # Browse the default server (http://localhost:8000)
//! cargo run
//!
//! # Another server, filtered to podcast 3, exported to a file
//! cargo run -- -s http://tracker.local:8000 -p 3 --export-html page.html
//! ```

pub mod api;
pub mod card;
pub mod config;
pub mod controller;
pub mod error;
pub mod format;
pub mod opener;
pub mod tui;
pub mod types;
