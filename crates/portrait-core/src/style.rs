//! Portrait Styles
//!
//! The fixed catalogue of art styles a customer can buy. Each style has a
//! stable key (used on the wire and in checkout metadata), a display label
//! and the prompt template handed to the image model.

use serde::{Deserialize, Serialize};

use crate::selection::SelectionKey;

/// Art style presets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PortraitStyle {
    RoyalCostume,
    RealisticPainted,
    CartoonPop,
    RenaissanceOil,
    WatercolorDream,
}

impl PortraitStyle {
    /// Every style, in catalogue order
    pub const ALL: [PortraitStyle; 5] = [
        PortraitStyle::RoyalCostume,
        PortraitStyle::RealisticPainted,
        PortraitStyle::CartoonPop,
        PortraitStyle::RenaissanceOil,
        PortraitStyle::WatercolorDream,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PortraitStyle::RoyalCostume => "royal-costume",
            PortraitStyle::RealisticPainted => "realistic-painted",
            PortraitStyle::CartoonPop => "cartoon-pop",
            PortraitStyle::RenaissanceOil => "renaissance-oil",
            PortraitStyle::WatercolorDream => "watercolor-dream",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PortraitStyle::RoyalCostume => "Royal Costume",
            PortraitStyle::RealisticPainted => "Realistic Painted",
            PortraitStyle::CartoonPop => "Cartoon Pop",
            PortraitStyle::RenaissanceOil => "Renaissance Oil",
            PortraitStyle::WatercolorDream => "Watercolor Dream",
        }
    }

    /// Prompt template describing the look of this style
    pub fn prompt_template(&self) -> &'static str {
        match self {
            PortraitStyle::RoyalCostume => {
                "Transform this pet photo into a majestic royal portrait set in a grand palace. \
                 Dress the pet in ornate royal attire with rich fabrics, gold accents, and a regal pose."
            }
            PortraitStyle::RealisticPainted => {
                "Transform this pet photo into a realistic hand-painted portrait with soft studio \
                 lighting, visible brush strokes, and a warm neutral backdrop."
            }
            PortraitStyle::CartoonPop => {
                "Transform this pet photo into a bold cartoon pop-art illustration with clean \
                 outlines, saturated colors, and a playful halftone background."
            }
            PortraitStyle::RenaissanceOil => {
                "Transform this pet photo into a Renaissance-era oil painting with dramatic \
                 chiaroscuro lighting, period clothing, and a gilded frame aesthetic."
            }
            PortraitStyle::WatercolorDream => {
                "Transform this pet photo into a dreamy watercolor painting with gentle color \
                 washes, soft edges, and a light paper texture."
            }
        }
    }
}

impl SelectionKey for PortraitStyle {
    const ALLOWED: &'static [Self] = &Self::ALL;

    fn key(&self) -> &'static str {
        self.as_str()
    }
}

impl std::fmt::Display for PortraitStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Labels for a list of styles, preserving order
pub fn labels(styles: &[PortraitStyle]) -> Vec<&'static str> {
    styles.iter().map(PortraitStyle::label).collect()
}
