use thiserror::Error;

/// Error type that captures every ledger, invoice, and storage failure.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("invalid description: {0}")]
    InvalidDescription(String),
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("duplicate id: {0}")]
    DuplicateId(i64),
    #[error("unknown entity: {0}")]
    UnknownEntity(i64),
    #[error("unknown transaction: {0}")]
    UnknownTransaction(i64),
    #[error("unknown receipt: {0}")]
    UnknownReceipt(i64),
    #[error("entity name `{0}` is not unique")]
    AmbiguousName(String),
    #[error(
        "transaction {transaction_id} already belongs to receipt {tagged_receipt_id}, not receipt {receipt_id}"
    )]
    ReceiptTransactionMismatch {
        receipt_id: i64,
        transaction_id: i64,
        tagged_receipt_id: i64,
    },
    #[error("invalid ledger state: {0}")]
    InvalidState(String),
    #[error("unsupported invoice template version: {0}")]
    UnsupportedTemplateVersion(String),
    #[error("malformed invoice template: {0}")]
    MalformedTemplate(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
