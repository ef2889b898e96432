use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};

/// Smallest amount treated as positive. Anything below this is rejected.
pub const MIN_AMOUNT: f64 = 0.005;

const MIN_DESCRIPTION_LEN: usize = 5;

/// An atomic double-entry movement of `amount` from a debtor entity to a
/// creditor entity, optionally tagged with the receipt it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub debtor_id: i64,
    pub creditor_id: i64,
    pub amount: f64,
    pub date: NaiveDate,
    description: String,
    #[serde(default)]
    pub receipt_id: Option<i64>,
}

impl Transaction {
    pub fn new(
        id: i64,
        debtor_id: i64,
        creditor_id: i64,
        amount: f64,
        date: NaiveDate,
        description: impl Into<String>,
    ) -> Result<Self> {
        if amount < MIN_AMOUNT {
            return Err(LedgerError::InvalidAmount(format!(
                "amount must be at least {MIN_AMOUNT}, got {amount}"
            )));
        }
        Ok(Self {
            id,
            debtor_id,
            creditor_id,
            amount,
            date,
            description: validate_description(description.into())?,
            receipt_id: None,
        })
    }

    pub fn with_receipt(mut self, receipt_id: i64) -> Self {
        self.receipt_id = Some(receipt_id);
        self
    }

    /// Returns a copy without a receipt tag.
    pub fn clear_receipt_id(&self) -> Self {
        let mut copy = self.clone();
        copy.receipt_id = None;
        copy
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Replaces the description, applying the same validation as construction.
    ///
    /// Only call this on values not yet admitted to a ledger; stored
    /// transactions are edited through
    /// [`Ledger::update_transaction_description`](crate::ledger::Ledger::update_transaction_description),
    /// which reinserts the index entry.
    pub fn set_description(&mut self, description: impl Into<String>) -> Result<()> {
        self.description = validate_description(description.into())?;
        Ok(())
    }

    /// True when the transaction moves money into or out of `entity_id`.
    pub fn touches(&self, entity_id: i64) -> bool {
        self.debtor_id == entity_id || self.creditor_id == entity_id
    }

    /// The other party, from the perspective of `entity_id`.
    pub fn counter_party(&self, entity_id: i64) -> Option<i64> {
        if self.debtor_id == entity_id {
            Some(self.creditor_id)
        } else if self.creditor_id == entity_id {
            Some(self.debtor_id)
        } else {
            None
        }
    }
}

fn validate_description(raw: String) -> Result<String> {
    let description = raw.trim();
    if description.contains('\n') || description.contains('\r') {
        return Err(LedgerError::InvalidDescription(
            "description contains a line break".into(),
        ));
    }
    if description.chars().count() < MIN_DESCRIPTION_LEN {
        return Err(LedgerError::InvalidDescription(format!(
            "description must be at least {MIN_DESCRIPTION_LEN} characters after trimming"
        )));
    }
    Ok(description.to_owned())
}

impl Eq for Transaction {}

impl PartialOrd for Transaction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Transaction {
    /// Total ordering: date, id, receipt tag (untagged first), debtor,
    /// creditor, amount, description.
    fn cmp(&self, other: &Self) -> Ordering {
        self.date
            .cmp(&other.date)
            .then_with(|| self.id.cmp(&other.id))
            .then_with(|| self.receipt_id.cmp(&other.receipt_id))
            .then_with(|| self.debtor_id.cmp(&other.debtor_id))
            .then_with(|| self.creditor_id.cmp(&other.creditor_id))
            .then_with(|| self.amount.total_cmp(&other.amount))
            .then_with(|| self.description.cmp(&other.description))
    }
}
