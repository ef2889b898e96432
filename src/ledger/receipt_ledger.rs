use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::errors::{LedgerError, Result};

use super::{
    advance,
    entity::AccountingEntity,
    events::{ObserverChannel, ObserverToken},
    ledger::Ledger,
    receipt::Receipt,
    transaction::Transaction,
};

/// A [`Ledger`] extended with receipt storage and validation.
///
/// Receipts group transactions under a payer; admitting either side keeps
/// the cross-references consistent: a receipt only accepts members that
/// exist and are untagged or tagged with its own id, and a tagged
/// transaction only enters the ledger when its receipt already exists.
#[derive(Debug, Default)]
pub struct ReceiptLedger {
    ledger: Ledger,
    receipts: BTreeMap<i64, Receipt>,
    next_receipt_id: i64,
    receipt_observers: ObserverChannel,
}

impl ReceiptLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a receipt ledger from pre-existing collections. On top of the
    /// base [`Ledger::from_parts`] checks, every receipt's payer and members
    /// must exist, and members must be untagged or tagged with the receipt.
    pub fn from_parts(
        entities: BTreeMap<i64, AccountingEntity>,
        transactions: BTreeMap<i64, Transaction>,
        receipts: BTreeMap<i64, Receipt>,
    ) -> Result<Self> {
        for (key, receipt) in &receipts {
            if *key != receipt.id {
                return Err(LedgerError::InvalidState(format!(
                    "receipt stored under key {key} has id {}",
                    receipt.id
                )));
            }
            if !entities.contains_key(&receipt.payer_id) {
                return Err(LedgerError::InvalidState(format!(
                    "receipt {key} references missing payer {}",
                    receipt.payer_id
                )));
            }
            for member in &receipt.transaction_ids {
                match transactions.get(member) {
                    None => {
                        return Err(LedgerError::InvalidState(format!(
                            "receipt {key} references missing transaction {member}"
                        )))
                    }
                    Some(t) if t.receipt_id.is_some() && t.receipt_id != Some(receipt.id) => {
                        return Err(LedgerError::InvalidState(format!(
                            "transaction {member} is tagged with a different receipt"
                        )))
                    }
                    Some(_) => {}
                }
            }
        }

        let next_receipt_id = receipts.keys().next_back().map_or(0, |id| id + 1);
        Ok(Self {
            ledger: Ledger::from_parts(entities, transactions)?,
            receipts,
            next_receipt_id: next_receipt_id.max(0),
            receipt_observers: ObserverChannel::new(),
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    // --- receipts ---

    /// Admits a receipt. The payer must exist, every member id must name an
    /// existing transaction, and each member must be untagged or already
    /// tagged with this receipt's id. The call either fully succeeds or
    /// stores nothing.
    pub fn add_receipt(&mut self, receipt: Receipt) -> Result<i64> {
        let id = receipt.id;
        if self.receipts.contains_key(&id) {
            return Err(LedgerError::DuplicateId(id));
        }
        if self.ledger.entity(receipt.payer_id).is_none() {
            return Err(LedgerError::UnknownEntity(receipt.payer_id));
        }
        for member in &receipt.transaction_ids {
            let transaction = self
                .ledger
                .transaction(*member)
                .ok_or(LedgerError::UnknownTransaction(*member))?;
            if let Some(tagged) = transaction.receipt_id {
                if tagged != id {
                    return Err(LedgerError::ReceiptTransactionMismatch {
                        receipt_id: id,
                        transaction_id: *member,
                        tagged_receipt_id: tagged,
                    });
                }
            }
        }

        advance(&mut self.next_receipt_id, id);
        tracing::debug!(receipt_id = id, name = %receipt.name, "receipt added");
        self.receipts.insert(id, receipt);
        self.receipt_observers.notify();
        Ok(id)
    }

    pub fn receipt(&self, id: i64) -> Option<&Receipt> {
        self.receipts.get(&id)
    }

    pub fn receipts(&self) -> impl Iterator<Item = &Receipt> {
        self.receipts.values()
    }

    pub fn receipt_count(&self) -> usize {
        self.receipts.len()
    }

    /// Next unused receipt id.
    pub fn fresh_receipt_id(&self) -> i64 {
        self.next_receipt_id
    }

    /// The receipt whose member set contains `transaction_id`, if any.
    pub fn receipt_of_transaction(&self, transaction_id: i64) -> Option<&Receipt> {
        self.receipts.values().find(|r| r.contains(transaction_id))
    }

    // --- transactions, with receipt bookkeeping ---

    /// Admits a transaction. A transaction tagged with a `receipt_id` is only
    /// accepted when that receipt already exists; on success the receipt's
    /// member set gains the new id.
    pub fn add_transaction(&mut self, transaction: Transaction) -> Result<i64> {
        if let Some(receipt_id) = transaction.receipt_id {
            if !self.receipts.contains_key(&receipt_id) {
                return Err(LedgerError::UnknownReceipt(receipt_id));
            }
        }
        let receipt_id = transaction.receipt_id;
        let id = self.ledger.add_transaction(transaction)?;
        if let Some(receipt_id) = receipt_id {
            if let Some(receipt) = self.receipts.get_mut(&receipt_id) {
                receipt.transaction_ids.insert(id);
                self.receipt_observers.notify();
            }
        }
        Ok(id)
    }

    /// Reverses and removes a transaction, scrubbing its id from any receipt
    /// that listed it so receipts never reference a gone transaction.
    pub fn remove_transaction(&mut self, id: i64) -> Option<Transaction> {
        let removed = self.ledger.remove_transaction(id)?;
        let mut scrubbed = false;
        for receipt in self.receipts.values_mut() {
            scrubbed |= receipt.transaction_ids.remove(&id);
        }
        if scrubbed {
            self.receipt_observers.notify();
        }
        Some(removed)
    }

    // --- base ledger delegation ---

    pub fn add_entity(&mut self, entity: AccountingEntity) -> Result<i64> {
        self.ledger.add_entity(entity)
    }

    pub fn update_entity(&mut self, entity: AccountingEntity) -> Result<()> {
        self.ledger.update_entity(entity)
    }

    pub fn entity(&self, id: i64) -> Option<&AccountingEntity> {
        self.ledger.entity(id)
    }

    pub fn entity_id_by_name(&self, name: &str) -> Result<Option<i64>> {
        self.ledger.entity_id_by_name(name)
    }

    pub fn transaction(&self, id: i64) -> Option<&Transaction> {
        self.ledger.transaction(id)
    }

    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.ledger.transactions()
    }

    pub fn transactions_touching_in_range(
        &self,
        entity_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<&Transaction> {
        self.ledger.transactions_touching_in_range(entity_id, from, to)
    }

    pub fn update_transaction_description(
        &mut self,
        id: i64,
        description: impl Into<String>,
    ) -> Result<()> {
        self.ledger.update_transaction_description(id, description)
    }

    pub fn on_entities_changed(&mut self, callback: impl Fn() + 'static) -> ObserverToken {
        self.ledger.on_entities_changed(callback)
    }

    pub fn on_transactions_changed(&mut self, callback: impl Fn() + 'static) -> ObserverToken {
        self.ledger.on_transactions_changed(callback)
    }

    pub fn on_receipts_changed(&mut self, callback: impl Fn() + 'static) -> ObserverToken {
        self.receipt_observers.subscribe(callback)
    }

    pub fn unsubscribe_receipts(&mut self, token: ObserverToken) -> bool {
        self.receipt_observers.unsubscribe(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::entity::AccountKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn base() -> ReceiptLedger {
        let mut ledger = ReceiptLedger::new();
        ledger
            .add_entity(AccountingEntity::new(0, "Cash box", AccountKind::Asset).unwrap())
            .unwrap();
        ledger
            .add_entity(AccountingEntity::new(1, "Anna", AccountKind::Resident).unwrap())
            .unwrap();
        ledger
    }

    fn transfer(id: i64, amount: f64, day: u32) -> Transaction {
        Transaction::new(id, 0, 1, amount, date(2021, 3, day), "market purchases").unwrap()
    }

    #[test]
    fn add_receipt_collects_existing_transactions() {
        let mut ledger = base();
        ledger.add_transaction(transfer(0, 10.0, 1)).unwrap();
        ledger.add_transaction(transfer(1, 20.0, 1)).unwrap();

        let receipt = Receipt::new(0, "market run", date(2021, 3, 1), 1)
            .unwrap()
            .with_transactions([0, 1]);
        ledger.add_receipt(receipt).unwrap();

        assert_eq!(ledger.receipt(0).unwrap().transaction_ids.len(), 2);
        assert_eq!(ledger.receipt_of_transaction(1).unwrap().id, 0);
    }

    #[test]
    fn add_receipt_accepts_members_pretagged_with_its_own_id() {
        // Tagged transactions normally require the receipt first; go through
        // from_parts to simulate a load where the member is already tagged.
        let mut entities = BTreeMap::new();
        entities.insert(
            0,
            AccountingEntity::new(0, "Cash box", AccountKind::Asset).unwrap(),
        );
        entities.insert(
            1,
            AccountingEntity::new(1, "Anna", AccountKind::Resident).unwrap(),
        );
        let mut transactions = BTreeMap::new();
        transactions.insert(0, transfer(0, 10.0, 1).with_receipt(5));
        let mut ledger =
            ReceiptLedger::from_parts(entities, transactions, BTreeMap::new()).unwrap();

        let receipt = Receipt::new(5, "market run", date(2021, 3, 1), 1)
            .unwrap()
            .with_transactions([0]);
        assert!(ledger.add_receipt(receipt).is_ok());
    }

    #[test]
    fn add_receipt_rejects_an_unknown_payer() {
        let mut ledger = base();
        let receipt = Receipt::new(0, "market run", date(2021, 3, 1), 99).unwrap();
        assert!(matches!(
            ledger.add_receipt(receipt),
            Err(LedgerError::UnknownEntity(99))
        ));
        assert_eq!(ledger.receipt_count(), 0);
    }

    #[test]
    fn add_receipt_is_transactional() {
        let mut ledger = base();
        ledger.add_transaction(transfer(0, 10.0, 1)).unwrap();

        let receipt = Receipt::new(0, "market run", date(2021, 3, 1), 1)
            .unwrap()
            .with_transactions([0, 42]);
        assert!(matches!(
            ledger.add_receipt(receipt),
            Err(LedgerError::UnknownTransaction(42))
        ));
        assert_eq!(ledger.receipt_count(), 0);
        assert_eq!(ledger.fresh_receipt_id(), 0);
        // the existing transaction was not altered
        assert_eq!(ledger.transaction(0).unwrap().receipt_id, None);
    }

    #[test]
    fn mismatched_receipt_tags_are_rejected() {
        let mut ledger = base();
        ledger.add_transaction(transfer(0, 10.0, 1)).unwrap();
        ledger
            .add_receipt(
                Receipt::new(0, "first run", date(2021, 3, 1), 1)
                    .unwrap()
                    .with_transactions([0]),
            )
            .unwrap();
        ledger
            .add_transaction(transfer(1, 5.0, 1).with_receipt(0))
            .unwrap();

        let other = Receipt::new(1, "second run", date(2021, 3, 2), 1)
            .unwrap()
            .with_transactions([1]);
        assert!(matches!(
            ledger.add_receipt(other),
            Err(LedgerError::ReceiptTransactionMismatch {
                receipt_id: 1,
                transaction_id: 1,
                tagged_receipt_id: 0,
            })
        ));
    }

    #[test]
    fn tagged_transaction_requires_existing_receipt() {
        let mut ledger = base();
        assert!(matches!(
            ledger.add_transaction(transfer(0, 10.0, 1).with_receipt(3)),
            Err(LedgerError::UnknownReceipt(3))
        ));

        ledger
            .add_receipt(Receipt::new(3, "market run", date(2021, 3, 1), 1).unwrap())
            .unwrap();
        ledger
            .add_transaction(transfer(0, 10.0, 1).with_receipt(3))
            .unwrap();
        assert!(ledger.receipt(3).unwrap().contains(0));
    }

    #[test]
    fn removing_a_transaction_scrubs_receipts() {
        let mut ledger = base();
        ledger
            .add_receipt(Receipt::new(0, "market run", date(2021, 3, 1), 1).unwrap())
            .unwrap();
        ledger
            .add_transaction(transfer(0, 10.0, 1).with_receipt(0))
            .unwrap();

        ledger.remove_transaction(0).expect("stored transaction");
        assert!(ledger.receipt(0).unwrap().transaction_ids.is_empty());
        assert_eq!(ledger.entity(0).unwrap().balance, 0.0);
    }

    #[test]
    fn from_parts_rejects_dangling_receipt_members() {
        let mut entities = BTreeMap::new();
        entities.insert(
            1,
            AccountingEntity::new(1, "Anna", AccountKind::Resident).unwrap(),
        );
        let mut receipts = BTreeMap::new();
        receipts.insert(
            0,
            Receipt::new(0, "market run", date(2021, 3, 1), 1)
                .unwrap()
                .with_transactions([7]),
        );
        assert!(matches!(
            ReceiptLedger::from_parts(entities, BTreeMap::new(), receipts),
            Err(LedgerError::InvalidState(_))
        ));
    }

    #[test]
    fn receipt_observers_fire_on_membership_changes() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut ledger = base();
        let hits = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&hits);
        ledger.on_receipts_changed(move || *counter.borrow_mut() += 1);

        ledger
            .add_receipt(Receipt::new(0, "market run", date(2021, 3, 1), 1).unwrap())
            .unwrap();
        assert_eq!(*hits.borrow(), 1);

        ledger
            .add_transaction(transfer(0, 10.0, 1).with_receipt(0))
            .unwrap();
        assert_eq!(*hits.borrow(), 2);

        ledger.remove_transaction(0);
        assert_eq!(*hits.borrow(), 3);
    }
}
