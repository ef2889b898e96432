use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};

const MAX_NAME_LEN: usize = 256;

/// Account category. The debit/credit sign behavior of an entity is a pure
/// function of its kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccountKind {
    Asset,
    Expense,
    Dividend,
    Liability,
    Equity,
    Revenue,
    /// A household member. Reporting entity: invoices are generated against
    /// residents, so their names follow the stricter rule.
    Resident,
}

/// Which side increases an entity's reported balance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NormalSide {
    Debit,
    Credit,
}

impl AccountKind {
    pub fn normal_side(self) -> NormalSide {
        match self {
            AccountKind::Asset | AccountKind::Expense | AccountKind::Dividend => NormalSide::Debit,
            AccountKind::Liability
            | AccountKind::Equity
            | AccountKind::Revenue
            | AccountKind::Resident => NormalSide::Credit,
        }
    }
}

/// A named account with a balance. Immutable: balance changes produce a new
/// value with the same id, name, and kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountingEntity {
    pub id: i64,
    pub name: String,
    pub kind: AccountKind,
    pub balance: f64,
}

impl AccountingEntity {
    /// Creates an entity with a zero balance after validating the name.
    pub fn new(id: i64, name: impl Into<String>, kind: AccountKind) -> Result<Self> {
        Self::with_balance(id, name, kind, 0.0)
    }

    /// Creates an entity with an explicit starting balance.
    pub fn with_balance(
        id: i64,
        name: impl Into<String>,
        kind: AccountKind,
        balance: f64,
    ) -> Result<Self> {
        let name = validate_name(name.into(), kind)?;
        Ok(Self {
            id,
            name,
            kind,
            balance,
        })
    }

    pub fn normal_side(&self) -> NormalSide {
        self.kind.normal_side()
    }

    /// Signed balance delta a debit of `amount` would cause, without applying it.
    pub fn debit_balance_change(&self, amount: f64) -> f64 {
        match self.normal_side() {
            NormalSide::Debit => amount,
            NormalSide::Credit => -amount,
        }
    }

    /// Signed balance delta a credit of `amount` would cause, without applying it.
    pub fn credit_balance_change(&self, amount: f64) -> f64 {
        -self.debit_balance_change(amount)
    }

    /// Returns a copy of this entity with `amount` debited.
    pub fn debit(&self, amount: f64) -> Result<Self> {
        let delta = self.debit_balance_change(require_non_negative(amount)?);
        Ok(self.shifted(delta))
    }

    /// Returns a copy of this entity with `amount` credited.
    pub fn credit(&self, amount: f64) -> Result<Self> {
        let delta = self.credit_balance_change(require_non_negative(amount)?);
        Ok(self.shifted(delta))
    }

    fn shifted(&self, delta: f64) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
            balance: self.balance + delta,
        }
    }
}

fn require_non_negative(amount: f64) -> Result<f64> {
    if amount >= 0.0 {
        Ok(amount)
    } else {
        Err(LedgerError::InvalidAmount(format!(
            "expected a non-negative amount, got {amount}"
        )))
    }
}

fn validate_name(raw: String, kind: AccountKind) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(LedgerError::InvalidName("name is empty".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(LedgerError::InvalidName(format!(
            "name exceeds {MAX_NAME_LEN} characters"
        )));
    }
    if name.contains('\n') || name.contains('\r') {
        return Err(LedgerError::InvalidName(
            "name contains a line break".into(),
        ));
    }
    if kind == AccountKind::Resident && !is_reporting_name(name) {
        return Err(LedgerError::InvalidName(format!(
            "resident name `{name}` must be alphabetic with single interior spaces"
        )));
    }
    Ok(name.to_owned())
}

/// Alphabetic words separated by single spaces, e.g. `Jan van Dam`.
fn is_reporting_name(name: &str) -> bool {
    let mut previous_was_space = true;
    for ch in name.chars() {
        if ch == ' ' {
            if previous_was_space {
                return false;
            }
            previous_was_space = true;
        } else if ch.is_alphabetic() {
            previous_was_space = false;
        } else {
            return false;
        }
    }
    !previous_was_space
}
