// src/client/types.rs
//! Request vocabulary and wire shapes for the upstream content API.

use serde::{Deserialize, Serialize};

/// Hard API maximum for a single listing page.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Listing sort order understood by the upstream API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    Hot,
    New,
    Rising,
    Top,
}

impl Default for SortMode {
    fn default() -> Self {
        SortMode::Hot
    }
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Hot => "hot",
            SortMode::New => "new",
            SortMode::Rising => "rising",
            SortMode::Top => "top",
        }
    }

    /// The search endpoint has its own sort vocabulary. `rising` has no
    /// search equivalent and maps to the endpoint's default (relevance).
    pub fn as_search_str(&self) -> &'static str {
        match self {
            SortMode::Hot => "hot",
            SortMode::New => "new",
            SortMode::Rising => "relevance",
            SortMode::Top => "top",
        }
    }
}

/// Time window accepted by the `t` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Hour,
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Hour => "hour",
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::Year => "year",
            TimeWindow::All => "all",
        }
    }
}

/// Immutable description of one listing/search call.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Named content channel, e.g. a subreddit.
    pub channel: String,
    pub sort: SortMode,
    pub limit: u32,
    pub time_window: Option<TimeWindow>,
    /// Page cursor from a previous response.
    pub after: Option<String>,
    /// Present only for search calls.
    pub query: Option<String>,
}

/// A single content item from the listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    pub subreddit: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub ups: i64,
    #[serde(default)]
    pub num_comments: i64,
    /// Upstream sends float seconds since epoch.
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub crosspost_parent: Option<String>,
}

impl Post {
    pub fn is_cross_post(&self) -> bool {
        self.crosspost_parent.is_some()
    }

    pub fn created_at(&self) -> u64 {
        if self.created_utc.is_finite() && self.created_utc > 0.0 {
            self.created_utc as u64
        } else {
            0
        }
    }
}

/// One page of results plus pagination cursors.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub after: Option<String>,
    pub before: Option<String>,
}

// Wire envelope: {data: {after, before, children: [{data: Post}]}}

#[derive(Debug, Deserialize)]
pub(crate) struct Listing {
    pub data: ListingData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData {
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingChild {
    pub data: Post,
}

impl Listing {
    pub(crate) fn into_page(self) -> Page<Post> {
        Page {
            items: self.data.children.into_iter().map(|c| c.data).collect(),
            after: self.data.after,
            before: self.data.before,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rising_remaps_for_search() {
        assert_eq!(SortMode::Rising.as_search_str(), "relevance");
        assert_eq!(SortMode::Top.as_search_str(), "top");
    }

    #[test]
    fn listing_envelope_parses_into_page() {
        let body = r#"{
            "data": {
                "after": "t3_xyz",
                "before": null,
                "children": [
                    {"data": {"id": "p1", "title": "Hello", "subreddit": "rust",
                              "ups": 42, "num_comments": 7, "created_utc": 1700000000.0}}
                ]
            }
        }"#;
        let listing: Listing = serde_json::from_str(body).expect("parse");
        let page = listing.into_page();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.after.as_deref(), Some("t3_xyz"));
        assert_eq!(page.items[0].id, "p1");
        assert_eq!(page.items[0].created_at(), 1_700_000_000);
        assert!(!page.items[0].is_cross_post());
    }
}
