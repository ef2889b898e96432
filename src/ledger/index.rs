use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::transaction::Transaction;

/// Two-level ordered index over transactions: by date, then by per-date id.
///
/// A date key is present if and only if its bucket is non-empty; the bucket
/// is dropped as soon as its last transaction is removed, so date iteration
/// stays proportional to the number of occupied dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionIndex {
    buckets: BTreeMap<NaiveDate, BTreeMap<i64, Transaction>>,
    count: usize,
}

impl TransactionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Inserts or replaces the transaction stored under `(t.date, t.id)`,
    /// returning the previous occupant of that key.
    pub fn put(&mut self, transaction: Transaction) -> Option<Transaction> {
        let bucket = self.buckets.entry(transaction.date).or_default();
        let previous = bucket.insert(transaction.id, transaction);
        if previous.is_none() {
            self.count += 1;
        }
        previous
    }

    /// Removes and returns the transaction at `(date, id)`. An emptied date
    /// bucket is removed along with it.
    pub fn remove(&mut self, date: NaiveDate, id: i64) -> Option<Transaction> {
        let bucket = self.buckets.get_mut(&date)?;
        let removed = bucket.remove(&id);
        if removed.is_some() {
            self.count -= 1;
            if bucket.is_empty() {
                self.buckets.remove(&date);
            }
        }
        removed
    }

    pub fn get(&self, date: NaiveDate, id: i64) -> Option<&Transaction> {
        self.buckets.get(&date).and_then(|bucket| bucket.get(&id))
    }

    pub fn contains_key(&self, date: NaiveDate, id: i64) -> bool {
        self.get(date, id).is_some()
    }

    pub fn contains_value(&self, transaction: &Transaction) -> bool {
        self.get(transaction.date, transaction.id) == Some(transaction)
    }

    /// Largest id stored under `date`, or `None` when the bucket is absent.
    pub fn highest_id(&self, date: NaiveDate) -> Option<i64> {
        self.buckets
            .get(&date)
            .and_then(|bucket| bucket.keys().next_back().copied())
    }

    /// Transactions with `from <= date < to`, ascending by `(date, id)`.
    /// An inverted window is empty, not an error.
    ///
    /// Scans only the buckets inside the window, so the cost is proportional
    /// to the buckets touched plus the results yielded.
    pub fn range(&self, from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = &Transaction> {
        let buckets = (from < to).then(|| self.buckets.range(from..to));
        buckets
            .into_iter()
            .flatten()
            .flat_map(|(_, bucket)| bucket.values())
    }

    /// Transactions with `from <= date <= to`, ascending by `(date, id)`.
    /// An inverted window is empty, not an error.
    pub fn range_inclusive(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> impl Iterator<Item = &Transaction> {
        let buckets = (from <= to).then(|| self.buckets.range(from..=to));
        buckets
            .into_iter()
            .flatten()
            .flat_map(|(_, bucket)| bucket.values())
    }

    /// All transactions, ascending by `(date, id)`.
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.buckets.values().flat_map(|bucket| bucket.values())
    }

    /// Occupied dates, ascending.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.buckets.keys().copied()
    }
}

impl FromIterator<Transaction> for TransactionIndex {
    fn from_iter<I: IntoIterator<Item = Transaction>>(iter: I) -> Self {
        let mut index = Self::new();
        for transaction in iter {
            index.put(transaction);
        }
        index
    }
}
