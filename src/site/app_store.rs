//! Parser for the app-store catalogue markup
//!
//! # List pages
//!
//! Every `a.ui-app-card` is a detail link. A page without cards is the end of
//! the catalogue.
//!
//! # Detail pages
//!
//! | Field | Source |
//! |-------|--------|
//! | name | `h2.ui-app-store-hero__header__app-name` |
//! | developer name | first `a` inside `.ui-app-store-hero__header__subscript` |
//! | description | `.ui-app-store-hero__description` |
//! | average rating | `.ui-star-rating__rating`, `"4.7 of 5 stars"` |
//! | total reviews | `.ui-review-count-summary`, `"(120 reviews)"`, 0 if unmatched |
//! | paid | `.ui-app-pricing--format-detail` is anything but `Free` |
//! | category, tags | links in `div.ui-app-store-hero__kicker`, first is the category |
//! | rating histogram | `.reviews-summary__review-count`, 5 stars first |
//! | pricing plans | `.pricing-plan-card__title-header` |
//! | developer website | the link titled `Developer website` |

use crate::record::{slugify, AppRecord, Category};
use crate::site::{ListOutcome, PageParser, ParseError};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

static AVG_RATING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\d.]+) of").expect("AVG_RATING_RE: hardcoded regex is valid"));
static REVIEW_COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\((\d+) reviews?\)").expect("REVIEW_COUNT_RE: hardcoded regex is valid")
});

static APP_CARD: LazyLock<Selector> = LazyLock::new(|| css("a.ui-app-card[href]"));
static APP_NAME: LazyLock<Selector> =
    LazyLock::new(|| css("h2.ui-app-store-hero__header__app-name"));
static DEVELOPER: LazyLock<Selector> =
    LazyLock::new(|| css(".ui-app-store-hero__header__subscript a"));
static DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| css(".ui-app-store-hero__description"));
static STAR_RATING: LazyLock<Selector> = LazyLock::new(|| css(".ui-star-rating__rating"));
static REVIEW_SUMMARY: LazyLock<Selector> = LazyLock::new(|| css(".ui-review-count-summary"));
static PRICING: LazyLock<Selector> = LazyLock::new(|| css(".ui-app-pricing--format-detail"));
static KICKER_LINKS: LazyLock<Selector> =
    LazyLock::new(|| css("div.ui-app-store-hero__kicker a"));
static STAR_COUNTS: LazyLock<Selector> =
    LazyLock::new(|| css(".reviews-summary__review-count"));
static PLAN_TITLES: LazyLock<Selector> =
    LazyLock::new(|| css(".pricing-plan-card__title-header"));
static LINKS: LazyLock<Selector> = LazyLock::new(|| css("a[href]"));

const DEVELOPER_WEBSITE_LABEL: &str = "Developer website";

fn css(selector: &str) -> Selector {
    Selector::parse(selector).expect("hardcoded CSS selector is valid")
}

/// Extraction rules for the app-store catalogue
#[derive(Debug, Clone, Copy, Default)]
pub struct AppStoreParser;

impl AppStoreParser {
    pub fn new() -> Self {
        Self
    }
}

impl PageParser for AppStoreParser {
    fn parse_list(&self, body: &str, page_url: &Url) -> ListOutcome {
        let document = Html::parse_document(body);

        ListOutcome::from_links(
            document
                .select(&APP_CARD)
                .filter_map(|card| card.value().attr("href"))
                .filter_map(|href| resolve_link(href, page_url)),
        )
    }

    fn parse_detail(&self, body: &str, page_url: &Url) -> Result<AppRecord, ParseError> {
        let document = Html::parse_document(body);

        let name = required_text(&document, &APP_NAME, "app name")?;
        if slugify(&name).is_empty() {
            return Err(ParseError::InvalidField {
                field: "name",
                value: name,
            });
        }
        let developer_name = required_text(&document, &DEVELOPER, "developer name")?;
        let description = required_text(&document, &DESCRIPTION, "description")?;

        let rating_text = required_text(&document, &STAR_RATING, "star rating")?;
        let avg_rating = AVG_RATING_RE
            .captures(&rating_text)
            .and_then(|caps| caps[1].parse::<f64>().ok())
            .ok_or(ParseError::InvalidField {
                field: "avg_rating",
                value: rating_text.clone(),
            })?;

        let reviews_text = required_text(&document, &REVIEW_SUMMARY, "review count")?;
        let total_reviews = match REVIEW_COUNT_RE.captures(&reviews_text) {
            Some(caps) => caps[1].parse::<u32>().map_err(|_| ParseError::InvalidField {
                field: "total_reviews",
                value: reviews_text.clone(),
            })?,
            None => 0,
        };

        let pricing = required_text(&document, &PRICING, "pricing")?;
        let is_paid = pricing != "Free";

        let mut kicker = document.select(&KICKER_LINKS).map(element_text);
        let category_label = kicker.next().ok_or(ParseError::MissingElement("category"))?;
        let category = category_label
            .parse::<Category>()
            .map_err(ParseError::UnknownCategory)?;
        let tags: Vec<String> = kicker.collect();

        let rating_map = parse_rating_map(&document)?;

        let pricing_plans = document
            .select(&PLAN_TITLES)
            .map(element_text)
            .filter(|plan| !plan.is_empty())
            .collect();

        let developer_website = document
            .select(&LINKS)
            .find(|link| element_text(*link) == DEVELOPER_WEBSITE_LABEL)
            .and_then(|link| link.value().attr("href"))
            .and_then(|href| resolve_link(href, page_url))
            .map(String::from);

        Ok(AppRecord {
            name,
            description,
            tags,
            category,
            avg_rating,
            total_reviews,
            rating_map,
            is_paid,
            pricing_plans,
            developer_name,
            developer_website,
            crawled_on: None,
        })
    }
}

/// Star histogram, listed 5 stars first on the page, stored 1 star first
fn parse_rating_map(document: &Html) -> Result<[u32; 5], ParseError> {
    let mut rating_map = [0u32; 5];

    for (i, element) in document.select(&STAR_COUNTS).take(5).enumerate() {
        let raw = element_text(element);
        let digits = raw.trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace());
        rating_map[4 - i] = digits.parse().map_err(|_| ParseError::InvalidField {
            field: "rating_map",
            value: raw.clone(),
        })?;
    }

    Ok(rating_map)
}

fn required_text(
    document: &Html,
    selector: &Selector,
    what: &'static str,
) -> Result<String, ParseError> {
    document
        .select(selector)
        .next()
        .map(element_text)
        .ok_or(ParseError::MissingElement(what))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Resolves a link href to an absolute HTTP(S) URL
///
/// Returns None for empty hrefs, fragment-only anchors, and anything that
/// does not resolve to http or https (`javascript:`, `mailto:`, ...).
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    base_url
        .join(href)
        .ok()
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
}
