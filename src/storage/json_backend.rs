use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::ledger::{AccountingEntity, Receipt, ReceiptLedger, Transaction};

pub const DOCUMENT_SCHEMA_VERSION: u32 = 1;

const TMP_SUFFIX: &str = "tmp";

/// The persisted form of a [`ReceiptLedger`]: ordered lists, entities tagged
/// with their kind. Loading rebuilds every value through its factory
/// constructor and then the aggregate invariant checks, so a hand-edited
/// document with a bad amount, name, or reference is rejected, and a
/// re-serialized and reloaded document reproduces an equal ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerDocument {
    #[serde(default = "LedgerDocument::schema_version_default")]
    pub schema_version: u32,
    #[serde(default)]
    pub entities: Vec<AccountingEntity>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub receipts: Vec<Receipt>,
}

impl LedgerDocument {
    pub fn from_ledger(ledger: &ReceiptLedger) -> Self {
        Self {
            schema_version: DOCUMENT_SCHEMA_VERSION,
            entities: ledger.ledger().entities().cloned().collect(),
            transactions: ledger.transactions().cloned().collect(),
            receipts: ledger.receipts().cloned().collect(),
        }
    }

    /// Rebuilds the aggregate. Deserialization bypasses the value types'
    /// factories, so each value is re-validated here before the aggregate
    /// checks run: field violations surface as their construction errors,
    /// dangling references as `InvalidState`.
    pub fn into_ledger(self) -> Result<ReceiptLedger> {
        let mut entities = BTreeMap::new();
        for entity in self.entities {
            let entity =
                AccountingEntity::with_balance(entity.id, entity.name, entity.kind, entity.balance)?;
            entities.insert(entity.id, entity);
        }
        let mut transactions = BTreeMap::new();
        for transaction in self.transactions {
            let mut rebuilt = Transaction::new(
                transaction.id,
                transaction.debtor_id,
                transaction.creditor_id,
                transaction.amount,
                transaction.date,
                transaction.description(),
            )?;
            rebuilt.receipt_id = transaction.receipt_id;
            transactions.insert(rebuilt.id, rebuilt);
        }
        let mut receipts = BTreeMap::new();
        for receipt in self.receipts {
            let rebuilt = Receipt::new(receipt.id, receipt.name, receipt.date, receipt.payer_id)?
                .with_transactions(receipt.transaction_ids);
            receipts.insert(rebuilt.id, rebuilt);
        }
        ReceiptLedger::from_parts(entities, transactions, receipts)
    }

    pub fn schema_version_default() -> u32 {
        DOCUMENT_SCHEMA_VERSION
    }
}

/// Serializes `ledger` to pretty JSON at `path`, atomically: the document is
/// written to a sibling tmp file and renamed over the target.
pub fn save_ledger_to_path(ledger: &ReceiptLedger, path: &Path) -> Result<()> {
    let document = LedgerDocument::from_ledger(ledger);
    let json = serde_json::to_string_pretty(&document)?;
    write_atomic(path, &json)?;
    tracing::debug!(path = %path.display(), "ledger saved");
    Ok(())
}

pub fn load_ledger_from_path(path: &Path) -> Result<ReceiptLedger> {
    let data = fs::read_to_string(path)?;
    let document: LedgerDocument = serde_json::from_str(&data)?;
    document.into_ledger()
}

fn write_atomic(path: &Path, data: &str) -> Result<()> {
    let tmp = path.with_extension(TMP_SUFFIX);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(data.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
