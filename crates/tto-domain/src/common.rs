//! Shared traits and money aliases for ledger primitives.

use rust_decimal::Decimal;
use uuid::Uuid;

/// Monetary amount with two fractional digits once it crosses a module boundary.
pub type Money = Decimal;

/// Percentage in the closed range `[0, 100]`.
pub type Rate = Decimal;

/// Exposes a stable identifier for entities held by the office book.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Row version used for compare-and-swap commits.
pub trait Versioned {
    fn version(&self) -> u64;
}

/// Converts an entity into a user-facing display label.
pub trait Displayable {
    fn display_label(&self) -> String;
}
