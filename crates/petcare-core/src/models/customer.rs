//! Customer and pet models.

use serde::{Deserialize, Serialize};

/// Loyalty tier. Unknown tiers coming from the backend are kept verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MembershipTier {
    Standard,
    Silver,
    Gold,
    Platinum,
    Other(String),
}

impl MembershipTier {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "" | "standard" | "basic" | "thường" => MembershipTier::Standard,
            "silver" | "bạc" => MembershipTier::Silver,
            "gold" | "vàng" => MembershipTier::Gold,
            "platinum" | "bạch kim" => MembershipTier::Platinum,
            _ => MembershipTier::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MembershipTier::Standard => "Standard",
            MembershipTier::Silver => "Silver",
            MembershipTier::Gold => "Gold",
            MembershipTier::Platinum => "Platinum",
            MembershipTier::Other(s) => s,
        }
    }
}

/// A clinic customer (pet owner).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: i64,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub membership_tier: MembershipTier,
    pub points: i64,
    /// `YYYY-MM-DD`
    pub member_since: Option<String>,
}

impl Customer {
    /// Create a new customer; `id` stays 0 until stored.
    pub fn new(full_name: String) -> Self {
        Self {
            id: 0,
            full_name,
            phone: None,
            email: None,
            membership_tier: MembershipTier::Standard,
            points: 0,
            member_since: None,
        }
    }
}

/// A pet, owned by exactly one customer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pet {
    pub id: i64,
    pub customer_id: i64,
    pub name: String,
    pub species: String,
    pub breed: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    /// Health state (free text)
    pub status: Option<String>,
}

impl Pet {
    /// Create a new pet for `customer_id`; `id` stays 0 until stored.
    pub fn new(customer_id: i64, name: String, species: String) -> Self {
        Self {
            id: 0,
            customer_id,
            name,
            species,
            breed: None,
            birth_date: None,
            gender: None,
            status: None,
        }
    }

    pub fn is_owned_by(&self, customer_id: i64) -> bool {
        self.customer_id == customer_id
    }
}
