use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::errors::{LedgerError, Result};

use super::{
    advance,
    entity::AccountingEntity,
    events::{ObserverChannel, ObserverToken},
    index::TransactionIndex,
    transaction::Transaction,
};

/// The aggregate that owns the entity and transaction collections.
///
/// Every mutator keeps two invariants: each stored transaction's debtor and
/// creditor resolve to entities in this ledger, and the double-entry balance
/// effect of a transaction is applied or reversed as one atomic step. Not
/// safe for concurrent mutation; callers serialize access externally.
#[derive(Debug, Default)]
pub struct Ledger {
    entities: BTreeMap<i64, AccountingEntity>,
    index: TransactionIndex,
    dates_by_id: BTreeMap<i64, NaiveDate>,
    next_entity_id: i64,
    next_transaction_id: i64,
    entity_observers: ObserverChannel,
    transaction_observers: ObserverChannel,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger from pre-existing collections, e.g. a loaded
    /// document. Fails with `InvalidState` when a map key disagrees with its
    /// value's id or a transaction references a missing entity; a failed
    /// construction leaves nothing behind.
    pub fn from_parts(
        entities: BTreeMap<i64, AccountingEntity>,
        transactions: BTreeMap<i64, Transaction>,
    ) -> Result<Self> {
        for (key, entity) in &entities {
            if *key != entity.id {
                return Err(LedgerError::InvalidState(format!(
                    "entity stored under key {key} has id {}",
                    entity.id
                )));
            }
        }
        for (key, transaction) in &transactions {
            if *key != transaction.id {
                return Err(LedgerError::InvalidState(format!(
                    "transaction stored under key {key} has id {}",
                    transaction.id
                )));
            }
            for party in [transaction.debtor_id, transaction.creditor_id] {
                if !entities.contains_key(&party) {
                    return Err(LedgerError::InvalidState(format!(
                        "transaction {key} references missing entity {party}"
                    )));
                }
            }
        }

        let next_entity_id = entities.keys().next_back().map_or(0, |id| id + 1);
        let next_transaction_id = transactions.keys().next_back().map_or(0, |id| id + 1);
        let dates_by_id = transactions.values().map(|t| (t.id, t.date)).collect();
        let index = transactions.into_values().collect();

        Ok(Self {
            entities,
            index,
            dates_by_id,
            next_entity_id: next_entity_id.max(0),
            next_transaction_id: next_transaction_id.max(0),
            entity_observers: ObserverChannel::new(),
            transaction_observers: ObserverChannel::new(),
        })
    }

    // --- entities ---

    /// Adds a new entity. Its id must not be in use.
    pub fn add_entity(&mut self, entity: AccountingEntity) -> Result<i64> {
        let id = entity.id;
        if self.entities.contains_key(&id) {
            return Err(LedgerError::DuplicateId(id));
        }
        advance(&mut self.next_entity_id, id);
        tracing::debug!(entity_id = id, name = %entity.name, "entity added");
        self.entities.insert(id, entity);
        self.entity_observers.notify();
        Ok(id)
    }

    /// Replaces the entity stored under `entity.id`.
    pub fn update_entity(&mut self, entity: AccountingEntity) -> Result<()> {
        if !self.entities.contains_key(&entity.id) {
            return Err(LedgerError::UnknownEntity(entity.id));
        }
        self.entities.insert(entity.id, entity);
        self.entity_observers.notify();
        Ok(())
    }

    pub fn entity(&self, id: i64) -> Option<&AccountingEntity> {
        self.entities.get(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &AccountingEntity> {
        self.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Looks an entity up by exact name. A name shared by several entities is
    /// reported as ambiguous rather than resolved to an arbitrary match.
    pub fn entity_id_by_name(&self, name: &str) -> Result<Option<i64>> {
        let mut matches = self.entities.values().filter(|e| e.name == name);
        match (matches.next(), matches.next()) {
            (Some(first), None) => Ok(Some(first.id)),
            (Some(_), Some(_)) => Err(LedgerError::AmbiguousName(name.to_owned())),
            _ => Ok(None),
        }
    }

    /// Next unused entity id.
    pub fn fresh_entity_id(&self) -> i64 {
        self.next_entity_id
    }

    // --- transactions ---

    /// Admits a transaction: debits the debtor, credits the creditor, and
    /// stores the transaction, all as one atomic effect. No observer or
    /// later query can see only one of the three steps applied.
    pub fn add_transaction(&mut self, transaction: Transaction) -> Result<i64> {
        let id = transaction.id;
        if self.dates_by_id.contains_key(&id) {
            return Err(LedgerError::DuplicateId(id));
        }
        let debtor = self
            .entities
            .get(&transaction.debtor_id)
            .ok_or(LedgerError::UnknownEntity(transaction.debtor_id))?;
        let creditor = self
            .entities
            .get(&transaction.creditor_id)
            .ok_or(LedgerError::UnknownEntity(transaction.creditor_id))?;

        // All fallible work happens above; from here on nothing can fail.
        if transaction.debtor_id == transaction.creditor_id {
            let updated = debtor
                .debit(transaction.amount)
                .and_then(|e| e.credit(transaction.amount))?;
            self.entities.insert(updated.id, updated);
        } else {
            let debited = debtor.debit(transaction.amount)?;
            let credited = creditor.credit(transaction.amount)?;
            self.entities.insert(debited.id, debited);
            self.entities.insert(credited.id, credited);
        }

        advance(&mut self.next_transaction_id, id);
        self.dates_by_id.insert(id, transaction.date);
        tracing::debug!(
            transaction_id = id,
            amount = transaction.amount,
            date = %transaction.date,
            "transaction applied"
        );
        self.index.put(transaction);
        self.entity_observers.notify();
        self.transaction_observers.notify();
        Ok(id)
    }

    /// Reverses and removes the transaction under `id`. Removing an absent id
    /// is a defined no-op, not an error.
    pub fn remove_transaction(&mut self, id: i64) -> Option<Transaction> {
        let date = self.dates_by_id.get(&id).copied()?;
        let transaction = self.index.remove(date, id)?;
        self.dates_by_id.remove(&id);

        // Exact inverse of the application step: credit the debtor, debit
        // the creditor, by the same amount.
        self.reverse_effect(&transaction);
        tracing::debug!(transaction_id = id, "transaction reversed and removed");
        self.entity_observers.notify();
        self.transaction_observers.notify();
        Some(transaction)
    }

    // A stored transaction's amount was validated non-negative on
    // construction, so the credit/debit below cannot fail.
    fn reverse_effect(&mut self, transaction: &Transaction) {
        if let Some(debtor) = self.entities.get(&transaction.debtor_id) {
            if let Ok(updated) = debtor.credit(transaction.amount) {
                self.entities.insert(updated.id, updated);
            }
        }
        if let Some(creditor) = self.entities.get(&transaction.creditor_id) {
            if let Ok(updated) = creditor.debit(transaction.amount) {
                self.entities.insert(updated.id, updated);
            }
        }
    }

    /// Replaces a stored transaction's description, re-validating it and
    /// reinserting the index entry so ordered collections never hold a value
    /// that changed underneath them.
    pub fn update_transaction_description(
        &mut self,
        id: i64,
        description: impl Into<String>,
    ) -> Result<()> {
        let date = *self
            .dates_by_id
            .get(&id)
            .ok_or(LedgerError::UnknownTransaction(id))?;
        let mut edited = self
            .index
            .get(date, id)
            .cloned()
            .ok_or(LedgerError::UnknownTransaction(id))?;
        edited.set_description(description)?;
        self.index.remove(date, id);
        self.index.put(edited);
        self.transaction_observers.notify();
        Ok(())
    }

    pub fn transaction(&self, id: i64) -> Option<&Transaction> {
        let date = self.dates_by_id.get(&id)?;
        self.index.get(*date, id)
    }

    /// All transactions, ascending by `(date, id)`.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.index.iter()
    }

    pub fn transaction_count(&self) -> usize {
        self.index.len()
    }

    /// Next unused transaction id.
    pub fn fresh_transaction_id(&self) -> i64 {
        self.next_transaction_id
    }

    /// Read access to the date index, e.g. for half-open period scans or
    /// per-date id minting via `highest_id`.
    pub fn index(&self) -> &TransactionIndex {
        &self.index
    }

    /// Transactions in which `entity_id` is debtor or creditor.
    pub fn transactions_touching(&self, entity_id: i64) -> Vec<&Transaction> {
        self.index.iter().filter(|t| t.touches(entity_id)).collect()
    }

    /// Transactions touching `entity_id` with `from <= date <= to`. Both
    /// bounds are inclusive, unlike the index's half-open `range`.
    pub fn transactions_touching_in_range(
        &self,
        entity_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<&Transaction> {
        self.index
            .range_inclusive(from, to)
            .filter(|t| t.touches(entity_id))
            .collect()
    }

    // --- change notifications ---

    pub fn on_entities_changed(&mut self, callback: impl Fn() + 'static) -> ObserverToken {
        self.entity_observers.subscribe(callback)
    }

    pub fn unsubscribe_entities(&mut self, token: ObserverToken) -> bool {
        self.entity_observers.unsubscribe(token)
    }

    pub fn on_transactions_changed(&mut self, callback: impl Fn() + 'static) -> ObserverToken {
        self.transaction_observers.subscribe(callback)
    }

    pub fn unsubscribe_transactions(&mut self, token: ObserverToken) -> bool {
        self.transaction_observers.unsubscribe(token)
    }
}
