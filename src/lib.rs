//! The Global Upvote - a news front page with an offline story cache
//!
//! Stories are fetched from an upstream JSON feed, normalized, cached locally,
//! and rendered into a masonry-style page. When the upstream is unreachable the
//! last cached list is served instead.

pub mod cache;
pub mod config;
pub mod connectivity;
pub mod fetcher;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;
pub mod story;
pub mod view;
