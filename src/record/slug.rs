use regex::Regex;
use std::sync::LazyLock;

static NON_WORD_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W+").expect("NON_WORD_RUN: hardcoded regex is valid"));

/// Derives the stable identity of a record from its display name
///
/// The name is lower-cased, every run of non-word characters collapses into a
/// single `-`, and separators at either end are trimmed. The same name always
/// yields the same slug, which is what makes store upserts idempotent.
///
/// Leading and trailing `-` are trimmed as well as whitespace, so `"(Beta) Tool"`
/// becomes `beta-tool`. Keys written by a slugger that only strips whitespace
/// (`-beta-tool`) will not match rows stored by this crate.
///
/// # Example
///
/// ```
/// use catalog_crawler::slugify;
///
/// assert_eq!(slugify("Kit: Run Better Facebook Ads"), "kit-run-better-facebook-ads");
/// ```
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    NON_WORD_RUN
        .replace_all(&lowered, "-")
        .trim_matches(|c: char| c == '-' || c.is_whitespace())
        .to_string()
}
