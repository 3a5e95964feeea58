//! Maps a state snapshot onto the slots of the front page.
//!
//! The first eleven stories have fixed slots, some with a thumbnail or
//! double width, and the promotional tiles sit between them. Everything
//! after that is appended in order.

use serde::Deserialize;

use crate::state::StoryState;
use crate::story::Story;

const FIREFOX_MIN_VERSION: f64 = 54.0;

/// What we know about the client, passed in as query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientContext {
    pub browser: Option<String>,
    /// Raw version string. Read through [`ClientContext::version`] so a value
    /// that is not a number only hides the version-gated promo.
    pub version: Option<String>,
    /// Rendered inside a frame (the browser extension's new tab page).
    #[serde(default)]
    pub embedded: bool,
}

impl ClientContext {
    /// Leading numeric part of the version, so `57.0.1` reads as `57.0`.
    pub fn version(&self) -> Option<f64> {
        let raw = self.version.as_deref()?.trim_start();
        let mut seen_dot = false;
        let end = raw
            .char_indices()
            .find(|&(i, c)| {
                let numeric = c.is_ascii_digit()
                    || (c == '.' && !std::mem::replace(&mut seen_dot, true))
                    || (i == 0 && (c == '-' || c == '+'));
                !numeric
            })
            .map_or(raw.len(), |(i, _)| i);
        raw[..end].parse().ok()
    }

    fn is_browser(&self, name: &str) -> bool {
        self.browser
            .as_deref()
            .is_some_and(|b| b.eq_ignore_ascii_case(name))
    }

    pub fn shows_chrome_promo(&self) -> bool {
        self.is_browser("chrome") && !self.embedded
    }

    pub fn shows_firefox_promo(&self) -> bool {
        !self.embedded
            && self.is_browser("firefox")
            && self.version().is_some_and(|v| v > FIREFOX_MIN_VERSION)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Promo {
    Relief,
    ChromeTab,
    FirefoxTab,
}

impl Promo {
    pub fn url(&self) -> &'static str {
        match self {
            Promo::Relief => "http://www.unidosporpuertorico.com/en/",
            Promo::ChromeTab => "https://chrome.google.com/webstore/detail/global-upvote-tab/nbbannbnjlkkhobfdpijealmagpfbioh",
            Promo::FirefoxTab => "https://addons.mozilla.org/en-US/firefox/addon/global-upvote-tab/",
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            Promo::Relief => "Donate to Puerto Rico Relief!",
            Promo::ChromeTab => "Download the Global Upvote Tab for Chrome!",
            Promo::FirefoxTab => "Download the Global Upvote Tab for Firefox!",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum CardStyle {
    #[default]
    Plain,
    Thumbnail,
    Double,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoryCard {
    pub id: String,
    pub title: String,
    pub url: Option<String>,
    pub thumbnail: Option<String>,
    pub summary: Option<String>,
    pub show_thumbnail: bool,
    pub double: bool,
    pub placeholder: bool,
}

impl StoryCard {
    fn from_story(story: &Story, style: CardStyle) -> Self {
        Self {
            id: story.id.to_string(),
            title: story.text("title").unwrap_or("Untitled").to_string(),
            url: story.text("url").map(str::to_string),
            thumbnail: story.text("thumbnail").map(str::to_string),
            summary: story.text("summary").map(str::to_string),
            show_thumbnail: style == CardStyle::Thumbnail,
            double: style == CardStyle::Double,
            placeholder: false,
        }
    }

    fn placeholder(style: CardStyle) -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            url: None,
            thumbnail: None,
            summary: None,
            show_thumbnail: style == CardStyle::Thumbnail,
            double: style == CardStyle::Double,
            placeholder: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Story(StoryCard),
    Promo(Promo),
}

/// Number of stories placed in fixed slots.
pub const FIXED_STORIES: usize = 11;

pub fn build_layout(state: &StoryState, ctx: &ClientContext) -> Vec<Slot> {
    let mut slots = Vec::with_capacity(state.stories.len().max(FIXED_STORIES) + 3);

    let fixed = |slots: &mut Vec<Slot>, index: usize, style: CardStyle| {
        match state.stories.get(index) {
            Some(story) => slots.push(Slot::Story(StoryCard::from_story(story, style))),
            None if state.fetching => slots.push(Slot::Story(StoryCard::placeholder(style))),
            None => {}
        }
    };

    fixed(&mut slots, 0, CardStyle::Thumbnail);
    fixed(&mut slots, 1, CardStyle::Double);
    slots.push(Slot::Promo(Promo::Relief));
    for index in 2..=4 {
        fixed(&mut slots, index, CardStyle::Plain);
    }

    if ctx.shows_chrome_promo() {
        slots.push(Slot::Promo(Promo::ChromeTab));
    }
    if ctx.shows_firefox_promo() {
        slots.push(Slot::Promo(Promo::FirefoxTab));
    }

    fixed(&mut slots, 5, CardStyle::Plain);
    fixed(&mut slots, 6, CardStyle::Plain);
    fixed(&mut slots, 7, CardStyle::Thumbnail);
    for index in 8..FIXED_STORIES {
        fixed(&mut slots, index, CardStyle::Plain);
    }

    slots.extend(
        state
            .stories
            .iter()
            .skip(FIXED_STORIES)
            .map(|story| Slot::Story(StoryCard::from_story(story, CardStyle::Plain))),
    );

    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(count: usize) -> StoryState {
        let stories = (0..count)
            .map(|i| Story::new(i as i64, i as i64).with_field("title", format!("Story {}", i)))
            .collect();
        StoryState::default().fetch_succeeded(stories)
    }

    fn context(browser: &str, version: f64, embedded: bool) -> ClientContext {
        ClientContext {
            browser: Some(browser.to_string()),
            version: Some(version.to_string()),
            embedded,
        }
    }

    fn promos(slots: &[Slot]) -> Vec<Promo> {
        slots
            .iter()
            .filter_map(|s| match s {
                Slot::Promo(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    fn cards(slots: &[Slot]) -> Vec<&StoryCard> {
        slots
            .iter()
            .filter_map(|s| match s {
                Slot::Story(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    mod promo_gating_tests {
        use super::*;

        #[test]
        fn test_chrome_top_level_gets_chrome_promo() {
            assert!(context("chrome", 60.0, false).shows_chrome_promo());
        }

        #[test]
        fn test_chrome_embedded_gets_no_promo() {
            assert!(!context("chrome", 60.0, true).shows_chrome_promo());
        }

        #[test]
        fn test_firefox_version_threshold() {
            assert!(!context("firefox", 54.0, false).shows_firefox_promo());
            assert!(context("firefox", 54.1, false).shows_firefox_promo());
        }

        #[test]
        fn test_firefox_embedded_gets_no_promo() {
            assert!(!context("firefox", 60.0, true).shows_firefox_promo());
        }

        #[test]
        fn test_firefox_without_version_gets_no_promo() {
            let ctx = ClientContext {
                browser: Some("firefox".to_string()),
                ..Default::default()
            };
            assert!(!ctx.shows_firefox_promo());
        }

        #[test]
        fn test_version_reads_leading_number() {
            let with = |raw: &str| ClientContext {
                version: Some(raw.to_string()),
                ..Default::default()
            };
            assert_eq!(with("57").version(), Some(57.0));
            assert_eq!(with(" 57.0.1").version(), Some(57.0));
            assert_eq!(with("60.5a1").version(), Some(60.5));
            assert_eq!(with("abc").version(), None);
            assert_eq!(with("").version(), None);
            assert_eq!(with(".").version(), None);
        }

        #[test]
        fn test_firefox_with_malformed_version_gets_no_promo() {
            let ctx: ClientContext =
                serde_urlencoded::from_str("browser=firefox&version=not-a-number").unwrap();
            assert!(!ctx.shows_firefox_promo());

            let ctx: ClientContext =
                serde_urlencoded::from_str("browser=firefox&version=57.0.1").unwrap();
            assert!(ctx.shows_firefox_promo());
        }

        #[test]
        fn test_unknown_client_only_sees_relief() {
            let slots = build_layout(&state_with(12), &ClientContext::default());
            assert_eq!(promos(&slots), vec![Promo::Relief]);
        }

        #[test]
        fn test_browser_promos_are_exclusive() {
            let chrome = build_layout(&state_with(12), &context("chrome", 99.0, false));
            assert_eq!(promos(&chrome), vec![Promo::Relief, Promo::ChromeTab]);

            let firefox = build_layout(&state_with(12), &context("firefox", 99.0, false));
            assert_eq!(promos(&firefox), vec![Promo::Relief, Promo::FirefoxTab]);
        }

        #[test]
        fn test_query_string_context() {
            let ctx: ClientContext =
                serde_urlencoded::from_str("browser=firefox&version=57.0&embedded=false").unwrap();
            assert!(ctx.shows_firefox_promo());

            let ctx: ClientContext = serde_urlencoded::from_str("").unwrap();
            assert!(ctx.browser.is_none());
            assert!(!ctx.embedded);
        }
    }

    mod slot_order_tests {
        use super::*;

        #[test]
        fn test_fixed_prefix_order() {
            let slots = build_layout(&state_with(15), &context("chrome", 60.0, false));

            let expected_ids = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "10"];
            let ids: Vec<&str> = cards(&slots).iter().map(|c| c.id.as_str()).collect();
            assert_eq!(&ids[..FIXED_STORIES], &expected_ids);

            assert_eq!(slots[2], Slot::Promo(Promo::Relief));
            assert_eq!(slots[6], Slot::Promo(Promo::ChromeTab));
        }

        #[test]
        fn test_card_styles() {
            let slots = build_layout(&state_with(12), &ClientContext::default());
            let cards = cards(&slots);

            assert!(cards[0].show_thumbnail);
            assert!(cards[1].double);
            assert!(cards[7].show_thumbnail);
            assert!(!cards[2].show_thumbnail && !cards[2].double);
            assert!(!cards[11].show_thumbnail);
        }

        #[test]
        fn test_remaining_stories_follow_in_order() {
            let slots = build_layout(&state_with(20), &ClientContext::default());
            let cards = cards(&slots);

            assert_eq!(cards.len(), 20);
            let tail: Vec<&str> = cards[FIXED_STORIES..].iter().map(|c| c.id.as_str()).collect();
            assert_eq!(tail, vec!["11", "12", "13", "14", "15", "16", "17", "18", "19"]);
        }

        #[test]
        fn test_card_fields() {
            let story = Story::new("t3_x", 0)
                .with_field("title", "Headline")
                .with_field("url", "https://example.com/a")
                .with_field("thumbnail", "https://example.com/a.jpg");
            let state = StoryState::default().fetch_succeeded(vec![story]);

            let slots = build_layout(&state, &ClientContext::default());
            let card = cards(&slots)[0].clone();

            assert_eq!(card.id, "t3_x");
            assert_eq!(card.title, "Headline");
            assert_eq!(card.url.as_deref(), Some("https://example.com/a"));
            assert_eq!(card.thumbnail.as_deref(), Some("https://example.com/a.jpg"));
            assert!(!card.placeholder);
        }
    }

    mod placeholder_tests {
        use super::*;

        #[test]
        fn test_fetching_fills_prefix_with_placeholders() {
            let slots = build_layout(&StoryState::default(), &ClientContext::default());
            let cards = cards(&slots);

            assert_eq!(cards.len(), FIXED_STORIES);
            assert!(cards.iter().all(|c| c.placeholder));
            assert!(cards[1].double);
        }

        #[test]
        fn test_short_list_after_fetch_has_no_placeholders() {
            let slots = build_layout(&state_with(3), &ClientContext::default());
            let cards = cards(&slots);

            assert_eq!(cards.len(), 3);
            assert!(cards.iter().all(|c| !c.placeholder));
        }

        #[test]
        fn test_empty_list_after_fetch_shows_only_promos() {
            let slots = build_layout(&state_with(0), &context("chrome", 60.0, false));
            assert_eq!(slots, vec![Slot::Promo(Promo::Relief), Slot::Promo(Promo::ChromeTab)]);
        }
    }
}
