//! Delivery Options

use serde::{Deserialize, Serialize};

use crate::selection::SelectionKey;

/// How the finished portrait reaches the customer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryOption {
    Digital,
    Framed,
}

impl DeliveryOption {
    pub const ALL: [DeliveryOption; 2] = [DeliveryOption::Digital, DeliveryOption::Framed];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOption::Digital => "digital",
            DeliveryOption::Framed => "framed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeliveryOption::Digital => "Digital Download",
            DeliveryOption::Framed => "Framed Print",
        }
    }

    /// Price per portrait in USD cents
    pub fn unit_amount(&self) -> i64 {
        match self {
            DeliveryOption::Digital => 499,
            DeliveryOption::Framed => 2499,
        }
    }
}

impl SelectionKey for DeliveryOption {
    const ALLOWED: &'static [Self] = &Self::ALL;

    fn key(&self) -> &'static str {
        self.as_str()
    }
}

impl std::fmt::Display for DeliveryOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
