use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};

/// A named grouping of transactions sharing a payer and a date, presented as
/// a single aggregate line on an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Receipt {
    pub id: i64,
    pub name: String,
    pub date: NaiveDate,
    pub payer_id: i64,
    #[serde(default)]
    pub transaction_ids: BTreeSet<i64>,
}

impl Receipt {
    pub fn new(id: i64, name: impl Into<String>, date: NaiveDate, payer_id: i64) -> Result<Self> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(LedgerError::InvalidName("receipt name is empty".into()));
        }
        if name.contains('\n') || name.contains('\r') {
            return Err(LedgerError::InvalidName(
                "receipt name contains a line break".into(),
            ));
        }
        Ok(Self {
            id,
            name,
            date,
            payer_id,
            transaction_ids: BTreeSet::new(),
        })
    }

    pub fn with_transactions(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.transaction_ids.extend(ids);
        self
    }

    pub fn contains(&self, transaction_id: i64) -> bool {
        self.transaction_ids.contains(&transaction_id)
    }
}
