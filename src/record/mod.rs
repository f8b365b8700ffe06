//! Records extracted from detail pages
//!
//! An [`AppRecord`] is one catalogue entry. Its identity is not supplied by
//! the site; it is the [`slugify`]d name, so two fetches of the same page map
//! to the same stored entity.

mod category;
mod slug;

pub use category::Category;
pub use slug::slugify;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One app listed in the catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppRecord {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category: Category,
    pub avg_rating: f64,
    pub total_reviews: u32,

    /// Review counts per star rating; index 0 holds 1-star reviews
    pub rating_map: [u32; 5],

    pub is_paid: bool,
    pub pricing_plans: Vec<String>,
    pub developer_name: String,
    pub developer_website: Option<String>,

    /// First time the store saw this record; owned by the store, never
    /// overwritten on update
    pub crawled_on: Option<DateTime<Utc>>,
}

impl AppRecord {
    /// Upsert key of this record
    pub fn id(&self) -> String {
        slugify(&self.name)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A fully populated record for store and report tests
    pub fn sample_record(name: &str) -> AppRecord {
        AppRecord {
            name: name.to_string(),
            description: format!("{} helps merchants sell more", name),
            tags: vec!["Upsell".to_string(), "Popups".to_string()],
            category: Category::Marketing,
            avg_rating: 4.7,
            total_reviews: 120,
            rating_map: [2, 1, 5, 12, 100],
            is_paid: true,
            pricing_plans: vec!["Basic".to_string(), "Pro".to_string()],
            developer_name: "Acme Apps".to_string(),
            developer_website: Some("https://acme.example.com".to_string()),
            crawled_on: None,
        }
    }
}
