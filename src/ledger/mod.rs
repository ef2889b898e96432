//! Ledger domain models: entities, transactions, receipts, the date index,
//! and the owning aggregates.

pub mod entity;
pub mod events;
pub mod index;
#[allow(clippy::module_inception)]
pub mod ledger;
pub mod receipt;
pub mod receipt_ledger;
pub mod transaction;

pub use entity::{AccountKind, AccountingEntity, NormalSide};
pub use events::{ObserverChannel, ObserverToken};
pub use index::TransactionIndex;
pub use ledger::Ledger;
pub use receipt::Receipt;
pub use receipt_ledger::ReceiptLedger;
pub use transaction::{Transaction, MIN_AMOUNT};

/// Advances a mint counter past an explicitly supplied id.
pub(crate) fn advance(counter: &mut i64, id: i64) {
    if id >= *counter {
        *counter = id + 1;
    }
}
