//! TUI type definitions for focus and actions.

use crate::types::Id;

/// Which panel receives navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// Podcast filter selector
    Filters,
    /// Episode cards
    Episodes,
}

/// Actions returned from input handling, executed by the event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// No action, continue running
    None,
    /// Quit the application
    Quit,
    /// Load the next page
    NextPage,
    /// Load the previous page
    PreviousPage,
    /// Filter by podcast (`None` shows all)
    SelectFilter(Option<Id>),
    /// Mark an episode as listened
    MarkListened(Id),
    /// Ask the server to refresh every feed
    Refresh,
    /// Open a link in the external opener
    OpenLink(String),
    /// Fetch fresh details for an episode
    ShowDetails(Id),
    /// Write the current page as HTML
    Export,
}
