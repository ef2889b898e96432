//! Period invoices: aggregates an entity's activity over a date range into a
//! rendered report, with receipt-grouped transactions collapsed into one
//! synthetic line each.

use chrono::NaiveDate;

use crate::errors::{LedgerError, Result};
use crate::ledger::{AccountingEntity, ReceiptLedger, Transaction};

/// Version marker a template's first line must carry.
pub const TEMPLATE_VERSION: &str = "huisboek-invoice v1";

/// Counter-party label for receipt aggregate rows.
pub const VARIOUS_COUNTER_PARTY: &str = "various";

const PLACEHOLDERS: [&str; 5] = [
    "{{entity_name}}",
    "{{intro}}",
    "{{opening_balance}}",
    "{{closing_balance}}",
    "{{rows}}",
];

/// Built-in template, usable as-is or as a starting point for custom ones.
pub const DEFAULT_TEMPLATE: &str = "\
huisboek-invoice v1
Invoice for {{entity_name}}

{{intro}}

Opening balance: {{opening_balance}}

{{rows}}

Closing balance: {{closing_balance}}
";

/// A validated invoice template: recognized version line, each placeholder
/// present exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceTemplate {
    body: String,
}

impl InvoiceTemplate {
    pub fn parse(text: &str) -> Result<Self> {
        let (version_line, body) = text.split_once('\n').ok_or_else(|| {
            LedgerError::MalformedTemplate("template has no body after the version line".into())
        })?;
        let version = version_line.trim();
        if version != TEMPLATE_VERSION {
            return Err(LedgerError::UnsupportedTemplateVersion(version.to_owned()));
        }
        for placeholder in PLACEHOLDERS {
            match body.matches(placeholder).count() {
                1 => {}
                0 => {
                    return Err(LedgerError::MalformedTemplate(format!(
                        "missing placeholder {placeholder}"
                    )))
                }
                n => {
                    return Err(LedgerError::MalformedTemplate(format!(
                        "placeholder {placeholder} appears {n} times"
                    )))
                }
            }
        }
        Ok(Self {
            body: body.to_owned(),
        })
    }

    fn render(
        &self,
        entity_name: &str,
        intro: &str,
        opening: f64,
        closing: f64,
        rows: &str,
    ) -> String {
        self.body
            .replacen("{{entity_name}}", entity_name, 1)
            .replacen("{{intro}}", intro, 1)
            .replacen("{{opening_balance}}", &format!("{opening:.2}"), 1)
            .replacen("{{closing_balance}}", &format!("{closing:.2}"), 1)
            .replacen("{{rows}}", rows, 1)
    }
}

impl Default for InvoiceTemplate {
    fn default() -> Self {
        Self::parse(DEFAULT_TEMPLATE).expect("built-in template is valid")
    }
}

/// One line of the invoice table: either a stand-alone transaction or the
/// synthetic aggregate of a receipt the entity paid for.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceRow {
    pub date: NaiveDate,
    pub description: String,
    pub counter_party: String,
    /// Signed: positive when the flow increases the entity's reported
    /// balance direction.
    pub amount: f64,
    source_id: i64,
}

/// Builds a rendered invoice from a consistent snapshot of the ledger.
pub struct InvoiceBuilder;

impl InvoiceBuilder {
    /// Renders the invoice for `entity_id` over `[from, to]` (both bounds
    /// inclusive) using `template`.
    pub fn build(
        ledger: &ReceiptLedger,
        entity_id: i64,
        from: NaiveDate,
        to: NaiveDate,
        template: &InvoiceTemplate,
    ) -> Result<String> {
        let entity = ledger
            .entity(entity_id)
            .ok_or(LedgerError::UnknownEntity(entity_id))?;
        let period = ledger.transactions_touching_in_range(entity_id, from, to);

        let rows = Self::rows(ledger, entity, &period);
        let opening: f64 = ledger
            .transactions()
            .filter(|t| t.date < from && t.touches(entity_id))
            .map(|t| signed_delta(entity, t))
            .sum();
        let period_delta: f64 = period
            .iter()
            .map(|&t| signed_delta(entity, t))
            .sum::<f64>();

        tracing::debug!(
            entity_id,
            rows = rows.len(),
            %from,
            %to,
            "invoice assembled"
        );
        let intro = format!(
            "Overview of account activity between {from} and {to}, receipts aggregated."
        );
        Ok(template.render(
            &entity.name,
            &intro,
            opening,
            opening + period_delta,
            &render_rows(&rows),
        ))
    }

    /// The invoice rows for `entity` over the given period snapshot, sorted
    /// by date, then source id, then description.
    pub fn rows(
        ledger: &ReceiptLedger,
        entity: &AccountingEntity,
        period: &[&Transaction],
    ) -> Vec<InvoiceRow> {
        let mut rows = Vec::new();
        let mut grouped: std::collections::BTreeMap<i64, f64> = std::collections::BTreeMap::new();

        for &transaction in period {
            match ledger.receipt_of_transaction(transaction.id) {
                Some(receipt) => {
                    // Non-payer groups contribute no row; their effect shows
                    // up on the payer's invoice.
                    if receipt.payer_id == entity.id {
                        *grouped.entry(receipt.id).or_default() +=
                            signed_delta(entity, transaction);
                    }
                }
                None => {
                    let counter_party = transaction
                        .counter_party(entity.id)
                        .and_then(|id| ledger.entity(id))
                        .map(|e| e.name.clone())
                        .unwrap_or_else(|| entity.name.clone());
                    rows.push(InvoiceRow {
                        date: transaction.date,
                        description: transaction.description().to_owned(),
                        counter_party,
                        amount: signed_delta(entity, transaction),
                        source_id: transaction.id,
                    });
                }
            }
        }

        for (receipt_id, net) in grouped {
            if let Some(receipt) = ledger.receipt(receipt_id) {
                rows.push(InvoiceRow {
                    date: receipt.date,
                    description: receipt.name.clone(),
                    counter_party: VARIOUS_COUNTER_PARTY.to_owned(),
                    amount: net,
                    source_id: receipt.id,
                });
            }
        }

        rows.sort_by(|a, b| {
            (a.date, a.source_id, &a.description).cmp(&(b.date, b.source_id, &b.description))
        });
        rows
    }
}

/// Signed balance effect of `transaction` on `entity`, per its normal side.
fn signed_delta(entity: &AccountingEntity, transaction: &Transaction) -> f64 {
    match (
        transaction.debtor_id == entity.id,
        transaction.creditor_id == entity.id,
    ) {
        (true, true) => 0.0,
        (true, false) => entity.debit_balance_change(transaction.amount),
        (false, true) => entity.credit_balance_change(transaction.amount),
        (false, false) => 0.0,
    }
}

fn render_rows(rows: &[InvoiceRow]) -> String {
    let mut table = format!(
        "{:<12} {:<32} {:<24} {:>12}",
        "Date", "Description", "Counter-party", "Amount"
    );
    for row in rows {
        table.push('\n');
        table.push_str(&format!(
            "{:<12} {:<32} {:<24} {:>12.2}",
            row.date, row.description, row.counter_party, row.amount
        ));
    }
    table
}
