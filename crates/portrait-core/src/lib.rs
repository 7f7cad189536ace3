//! # portrait-core
//!
//! Domain logic for the pet portrait shop: the style and delivery catalogue,
//! normalization of customer selections, order pricing, prompt templating,
//! and the sequential generation loop behind a provider-agnostic trait.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     PortraitStudio                        │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────┐  │
//! │  │   Styles &  │  │   Prompt    │  │ ImageEditProvider │  │
//! │  │  Selections │──│  Templates  │──│    (Strategy)     │  │
//! │  └─────────────┘  └─────────────┘  └──────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod delivery;
pub mod error;
pub mod order;
pub mod prompt;
pub mod provider;
pub mod selection;
pub mod studio;
pub mod style;

pub use delivery::DeliveryOption;
pub use error::{PortraitError, Result};
pub use order::{LineItem, OrderIntent, PurchaseRecord, resolve_styles};
pub use provider::{EditOptions, EditedImage, ImageEditProvider, ImageEditRequest, ImageUpload};
pub use selection::SelectionKey;
pub use studio::{PortraitResult, PortraitStudio};
pub use style::PortraitStyle;
