use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Top-level catalogue category an app is filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    StoreDesign,
    SalesAndConversion,
    Marketing,
    OrdersAndShipping,
    CustomerSupport,
    InventoryManagement,
    Reporting,
    FindingProducts,
    Productivity,
    Finances,
    TrustAndSecurity,
    PlacesToSell,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Self::StoreDesign,
        Self::SalesAndConversion,
        Self::Marketing,
        Self::OrdersAndShipping,
        Self::CustomerSupport,
        Self::InventoryManagement,
        Self::Reporting,
        Self::FindingProducts,
        Self::Productivity,
        Self::Finances,
        Self::TrustAndSecurity,
        Self::PlacesToSell,
    ];

    /// The label the catalogue displays for this category
    pub fn label(&self) -> &'static str {
        match self {
            Self::StoreDesign => "Store design",
            Self::SalesAndConversion => "Sales and conversion optimization",
            Self::Marketing => "Marketing",
            Self::OrdersAndShipping => "Orders and shipping",
            Self::CustomerSupport => "Customer support",
            Self::InventoryManagement => "Inventory management",
            Self::Reporting => "Reporting",
            Self::FindingProducts => "Finding and adding products",
            Self::Productivity => "Productivity",
            Self::Finances => "Finances",
            Self::TrustAndSecurity => "Trust and security",
            Self::PlacesToSell => "Places to sell",
        }
    }

    /// Stable key used in the database
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::StoreDesign => "store_design",
            Self::SalesAndConversion => "sales_and_conversion",
            Self::Marketing => "marketing",
            Self::OrdersAndShipping => "orders_and_shipping",
            Self::CustomerSupport => "customer_support",
            Self::InventoryManagement => "inventory_management",
            Self::Reporting => "reporting",
            Self::FindingProducts => "finding_products",
            Self::Productivity => "productivity",
            Self::Finances => "finances",
            Self::TrustAndSecurity => "trust_and_security",
            Self::PlacesToSell => "places_to_sell",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.to_db_string() == s)
    }
}

impl FromStr for Category {
    type Err = String;

    /// Parses the displayed label, ignoring surrounding whitespace and case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| wanted.to_string())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
