#![doc(test(attr(deny(warnings))))]

//! Huisboek offers a household double-entry ledger: named accounts connected
//! by transactions, optionally grouped into receipts, with period-based
//! invoice generation on top.

pub mod errors;
pub mod invoice;
pub mod ledger;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Huisboek tracing initialized.");
    });
}
