//! Orders
//!
//! Validation of the order form, pricing into checkout line items, and the
//! round trip of the customer's selections through checkout session
//! metadata. Metadata values must be flat strings, so the lists are stored
//! JSON-encoded and decoded again with the selection normalizer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::delivery::DeliveryOption;
use crate::error::{PortraitError, Result};
use crate::selection;
use crate::style::{self, PortraitStyle};

/// Metadata keys written onto the checkout session
pub mod metadata_keys {
    pub const FIRST_NAME: &str = "firstName";
    pub const LAST_NAME: &str = "lastName";
    pub const STYLES: &str = "styles";
    pub const STYLE_LABELS: &str = "styleLabels";
    pub const DELIVERY: &str = "delivery";
    pub const STYLE_COUNT: &str = "styleCount";
    pub const DELIVERY_COUNT: &str = "deliveryCount";
}

/// A validated order, ready to be priced and sent to checkout
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub styles: Vec<PortraitStyle>,
    pub delivery: Vec<DeliveryOption>,
}

/// One priced checkout line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineItem {
    pub delivery: DeliveryOption,

    /// Product name shown on the payment page
    pub name: String,

    pub description: String,

    /// Unit price in USD cents
    pub unit_amount: i64,

    /// One unit per selected style
    pub quantity: u64,
}

impl OrderIntent {
    /// Build an order from the checkout request body.
    ///
    /// Names and email are trimmed; selections go through the normalizer.
    pub fn from_json(payload: &Value) -> Result<Self> {
        let field = |name: &str| {
            payload
                .get(name)
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default()
                .to_string()
        };

        let first_name = field("firstName");
        let last_name = field("lastName");
        let email = field("email");

        if first_name.is_empty() || last_name.is_empty() || email.is_empty() {
            return Err(PortraitError::InvalidOrder(
                "Missing required customer information.".into(),
            ));
        }

        let styles = selection::normalize_styles(payload.get("styles").unwrap_or(&Value::Null));
        if styles.is_empty() {
            return Err(PortraitError::InvalidOrder(
                "Please select at least one portrait style.".into(),
            ));
        }

        let delivery =
            selection::normalize_delivery(payload.get("delivery").unwrap_or(&Value::Null));
        if delivery.is_empty() {
            return Err(PortraitError::InvalidOrder(
                "Please select at least one delivery option.".into(),
            ));
        }

        Ok(Self {
            first_name,
            last_name,
            email,
            styles,
            delivery,
        })
    }

    /// One line per delivery option, quantity equal to the style count
    pub fn line_items(&self) -> Vec<LineItem> {
        let description = format!(
            "AI-crafted pet portrait styles: {}",
            style::labels(&self.styles).join(", ")
        );
        let quantity = self.styles.len() as u64;

        self.delivery
            .iter()
            .map(|delivery| LineItem {
                delivery: *delivery,
                name: format!("Pet Portrait - {}", delivery.label()),
                description: description.clone(),
                unit_amount: delivery.unit_amount(),
                quantity,
            })
            .collect()
    }

    /// Order total in USD cents
    pub fn total_amount(&self) -> i64 {
        self.line_items()
            .iter()
            .map(|item| item.unit_amount * item.quantity as i64)
            .sum()
    }

    /// Encode the selections as flat string metadata
    pub fn to_metadata(&self) -> Result<HashMap<String, String>> {
        let mut metadata = HashMap::new();
        metadata.insert(metadata_keys::FIRST_NAME.to_string(), self.first_name.clone());
        metadata.insert(metadata_keys::LAST_NAME.to_string(), self.last_name.clone());
        metadata.insert(
            metadata_keys::STYLES.to_string(),
            serde_json::to_string(&selection::keys(&self.styles))?,
        );
        metadata.insert(
            metadata_keys::STYLE_LABELS.to_string(),
            serde_json::to_string(&style::labels(&self.styles))?,
        );
        metadata.insert(
            metadata_keys::DELIVERY.to_string(),
            serde_json::to_string(&selection::keys(&self.delivery))?,
        );
        metadata.insert(
            metadata_keys::STYLE_COUNT.to_string(),
            self.styles.len().to_string(),
        );
        metadata.insert(
            metadata_keys::DELIVERY_COUNT.to_string(),
            self.delivery.len().to_string(),
        );
        Ok(metadata)
    }
}

/// What a paid session says was bought
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PurchaseRecord {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub styles: Vec<PortraitStyle>,
    pub delivery: Vec<DeliveryOption>,
}

impl PurchaseRecord {
    /// Decode selections from checkout session metadata.
    ///
    /// Sessions created before styles were selectable carry no `styles`
    /// entry; those bought the royal portrait.
    pub fn from_metadata(metadata: Option<&HashMap<String, String>>) -> Self {
        let Some(metadata) = metadata else {
            return Self {
                styles: vec![PortraitStyle::RoyalCostume],
                ..Default::default()
            };
        };

        let get = |key: &str| metadata.get(key).map(String::as_str);

        let styles = match get(metadata_keys::STYLES) {
            Some(raw) => selection::normalize_str(Some(raw)),
            None => vec![PortraitStyle::RoyalCostume],
        };

        Self {
            first_name: get(metadata_keys::FIRST_NAME)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            last_name: get(metadata_keys::LAST_NAME)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            styles,
            delivery: selection::normalize_str(get(metadata_keys::DELIVERY)),
        }
    }

    pub fn style_labels(&self) -> Vec<&'static str> {
        style::labels(&self.styles)
    }

    pub fn style_keys(&self) -> Vec<&'static str> {
        selection::keys(&self.styles)
    }

    pub fn delivery_keys(&self) -> Vec<&'static str> {
        selection::keys(&self.delivery)
    }
}

/// Styles to generate for a request.
///
/// Keeps the requested styles that were purchased, in requested order.
/// When nothing overlaps, every purchased style is generated instead.
pub fn resolve_styles(requested: &[PortraitStyle], purchased: &[PortraitStyle]) -> Vec<PortraitStyle> {
    let overlap: Vec<PortraitStyle> = requested
        .iter()
        .copied()
        .filter(|style| purchased.contains(style))
        .collect();

    if overlap.is_empty() {
        purchased.to_vec()
    } else {
        overlap
    }
}
