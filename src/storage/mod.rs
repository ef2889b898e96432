//! Persistence adapter: a schema-versioned JSON document holding the
//! ordered entity, transaction, and receipt lists of a receipt ledger.

pub mod json_backend;

pub use json_backend::{
    load_ledger_from_path, save_ledger_to_path, LedgerDocument, DOCUMENT_SCHEMA_VERSION,
};
