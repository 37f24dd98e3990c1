// balances.rs
// Balance reconciliation: folds the pre-grouped bill, credit note and payment
// aggregates of a company into one running balance per client (a customer,
// optionally paired with a third-party payer). Pure; the aggregates are fetched
// by `state::balances` and handed over as a `BillingSnapshot`.

use std::collections::HashSet;

use mongodb::bson::{DateTime, oid::ObjectId};
use serde::Deserialize;
use thiserror::Error;

use crate::models::{Customer, Funding, FundingVersion, Mandate, PaymentNature, ThirdPartyPayer};

/// Share of the bill owed by a customer without any funding.
pub const FULL_PARTICIPATION: f64 = 100.0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BalanceError {
    #[error("a bill is required to check direct debit eligibility")]
    MissingBill,
}

/// Billing counterparty: the customer alone, or the customer through a third-party payer.
///
/// A payer stored as `null` and a missing payer field both deserialize to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct ClientKey {
    pub customer: ObjectId,
    #[serde(default)]
    pub third_party_payer: Option<ObjectId>,
}

impl ClientKey {
    pub fn customer(customer: ObjectId) -> Self {
        Self {
            customer,
            third_party_payer: None,
        }
    }

    pub fn with_third_party_payer(customer: ObjectId, third_party_payer: ObjectId) -> Self {
        Self {
            customer,
            third_party_payer: Some(third_party_payer),
        }
    }

    pub fn is_third_party_payer(&self) -> bool {
        self.third_party_payer.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BillAggregate {
    #[serde(rename = "_id")]
    pub key: ClientKey,
    pub billed: f64,
    pub customer: Customer,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreditNoteAggregate {
    #[serde(rename = "_id")]
    pub key: ClientKey,
    pub refund: f64,
    pub customer: Customer,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentEntry {
    pub nature: PaymentNature,
    pub net_incl_taxes: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentAggregate {
    #[serde(rename = "_id")]
    pub key: ClientKey,
    #[serde(default)]
    pub payments: Vec<PaymentEntry>,
    pub customer: Customer,
}

/// Common view over the three aggregate shapes.
pub trait ClientAggregate {
    fn key(&self) -> &ClientKey;
    fn customer(&self) -> &Customer;
}

impl ClientAggregate for BillAggregate {
    fn key(&self) -> &ClientKey {
        &self.key
    }

    fn customer(&self) -> &Customer {
        &self.customer
    }
}

impl ClientAggregate for CreditNoteAggregate {
    fn key(&self) -> &ClientKey {
        &self.key
    }

    fn customer(&self) -> &Customer {
        &self.customer
    }
}

impl ClientAggregate for PaymentAggregate {
    fn key(&self) -> &ClientKey {
        &self.key
    }

    fn customer(&self) -> &Customer {
        &self.customer
    }
}

/// Everything the reconciliation needs for one company.
#[derive(Debug, Clone, Default)]
pub struct BillingSnapshot {
    pub bills: Vec<BillAggregate>,
    pub customer_credit_notes: Vec<CreditNoteAggregate>,
    pub third_party_payer_credit_notes: Vec<CreditNoteAggregate>,
    pub payments: Vec<PaymentAggregate>,
    pub third_party_payers: Vec<ThirdPartyPayer>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BalanceRecord {
    pub key: ClientKey,
    pub customer_name: String,
    pub participation_rate: f64,
    pub billed: f64,
    pub paid: f64,
    pub balance: f64,
    pub to_pay: f64,
}

impl BalanceRecord {
    fn new(
        aggregate: &impl ClientAggregate,
        third_party_payers: &[ThirdPartyPayer],
        billed: f64,
        paid: f64,
        to_pay: f64,
    ) -> Self {
        Self {
            key: aggregate.key().clone(),
            customer_name: aggregate.customer().name.clone(),
            participation_rate: participation_rate(aggregate, third_party_payers),
            billed,
            paid,
            balance: paid - billed,
            to_pay,
        }
    }
}

/// Records carrying a creation timestamp, such as mandates and funding versions.
pub trait CreatedAt {
    fn created_at(&self) -> DateTime;
}

impl CreatedAt for Mandate {
    fn created_at(&self) -> DateTime {
        self.created_at
    }
}

impl CreatedAt for FundingVersion {
    fn created_at(&self) -> DateTime {
        self.created_at
    }
}

/// Most recently created record; on equal timestamps the last one in input order wins.
pub fn latest_by_creation<T: CreatedAt>(items: &[T]) -> Option<&T> {
    items.iter().max_by_key(|item| item.created_at())
}

/// The payer of a funding paired with the rate of its latest version.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedFunding {
    pub third_party_payer_id: ObjectId,
    pub customer_participation_rate: f64,
}

/// `None` when the funding has no version yet.
pub fn resolve_funding(funding: &Funding) -> Option<ResolvedFunding> {
    let version = latest_by_creation(&funding.versions)?;
    Some(ResolvedFunding {
        third_party_payer_id: funding.third_party_payer_id,
        customer_participation_rate: version.customer_participation_rate,
    })
}

/// Signed total: genuine payments add, refunds subtract.
pub fn payments_total(payments: &[PaymentEntry]) -> f64 {
    payments.iter().fold(0.0, |total, entry| {
        if entry.nature.is_payment() {
            total + entry.net_incl_taxes
        } else {
            total - entry.net_incl_taxes
        }
    })
}

/// Percentage of the billed amount the customer pays personally.
pub fn participation_rate(
    aggregate: &impl ClientAggregate,
    third_party_payers: &[ThirdPartyPayer],
) -> f64 {
    if aggregate.key().is_third_party_payer() {
        return 0.0;
    }

    let fundings = &aggregate.customer().fundings;
    if fundings.is_empty() {
        return FULL_PARTICIPATION;
    }

    let apa_payers: HashSet<&ObjectId> = third_party_payers
        .iter()
        .filter(|tpp| tpp.is_apa)
        .filter_map(|tpp| tpp.id.as_ref())
        .collect();

    let mut resolved: Vec<ResolvedFunding> = fundings
        .iter()
        .filter_map(resolve_funding)
        .filter(|funding| apa_payers.contains(&funding.third_party_payer_id))
        .collect();
    resolved.sort_by(|a, b| {
        b.customer_participation_rate
            .total_cmp(&a.customer_participation_rate)
    });

    resolved
        .first()
        .map_or(FULL_PARTICIPATION, |funding| funding.customer_participation_rate)
}

/// Whether the amount still owed on `bill` can be collected by direct debit.
pub fn can_be_direct_debited(bill: Option<&BillAggregate>) -> Result<bool, BalanceError> {
    let bill = bill.ok_or(BalanceError::MissingBill)?;
    if bill.key.is_third_party_payer() {
        return Ok(false);
    }

    let Some(payment) = bill.customer.payment.as_ref() else {
        return Ok(false);
    };
    if !payment.has_bank_details() {
        return Ok(false);
    }

    Ok(latest_by_creation(&payment.mandates).is_some_and(|mandate| mandate.signed_at.is_some()))
}

fn find_by_key<'a, T: ClientAggregate>(aggregates: &'a [T], key: &ClientKey) -> Option<&'a T> {
    aggregates.iter().find(|aggregate| aggregate.key() == key)
}

fn paid_for(payments: &[PaymentAggregate], key: &ClientKey) -> f64 {
    find_by_key(payments, key).map_or(0.0, |matched| payments_total(&matched.payments))
}

pub fn bill_balance(
    bill: &BillAggregate,
    customer_credit_notes: &[CreditNoteAggregate],
    third_party_payer_credit_notes: &[CreditNoteAggregate],
    payments: &[PaymentAggregate],
    third_party_payers: &[ThirdPartyPayer],
) -> Result<BalanceRecord, BalanceError> {
    let credit_notes = if bill.key.is_third_party_payer() {
        third_party_payer_credit_notes
    } else {
        customer_credit_notes
    };
    let refund =
        find_by_key(credit_notes, &bill.key).map_or(0.0, |credit_note| credit_note.refund);

    let paid = paid_for(payments, &bill.key);
    let billed = bill.billed - refund;
    let to_pay = if can_be_direct_debited(Some(bill))? && paid - billed < 0.0 {
        (paid - billed).abs()
    } else {
        0.0
    };

    Ok(BalanceRecord::new(
        bill,
        third_party_payers,
        billed,
        paid,
        to_pay,
    ))
}

pub fn credit_note_balance(
    credit_note: &CreditNoteAggregate,
    payments: &[PaymentAggregate],
    third_party_payers: &[ThirdPartyPayer],
) -> BalanceRecord {
    let paid = paid_for(payments, &credit_note.key);
    BalanceRecord::new(credit_note, third_party_payers, -credit_note.refund, paid, 0.0)
}

pub fn payment_balance(
    payment: &PaymentAggregate,
    third_party_payers: &[ThirdPartyPayer],
) -> BalanceRecord {
    let paid = payments_total(&payment.payments);
    BalanceRecord::new(payment, third_party_payers, 0.0, paid, 0.0)
}

/// Bill-sourced records first, then credit notes without a bill, then payments
/// matching neither. Each client key appears at most once.
pub fn compute_balances(snapshot: &BillingSnapshot) -> Result<Vec<BalanceRecord>, BalanceError> {
    let tpps = &snapshot.third_party_payers;

    let mut balances = snapshot
        .bills
        .iter()
        .map(|bill| {
            bill_balance(
                bill,
                &snapshot.customer_credit_notes,
                &snapshot.third_party_payer_credit_notes,
                &snapshot.payments,
                tpps,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    let covered: HashSet<&ClientKey> = snapshot.bills.iter().map(|bill| &bill.key).collect();

    let orphan_credit_notes = uncovered(
        snapshot
            .customer_credit_notes
            .iter()
            .chain(&snapshot.third_party_payer_credit_notes),
        &covered,
    );
    balances.extend(
        orphan_credit_notes
            .iter()
            .map(|credit_note| credit_note_balance(credit_note, &snapshot.payments, tpps)),
    );
    let covered: HashSet<&ClientKey> = covered
        .into_iter()
        .chain(orphan_credit_notes.iter().map(|&credit_note| &credit_note.key))
        .collect();

    let orphan_payments = uncovered(snapshot.payments.iter(), &covered);
    balances.extend(
        orphan_payments
            .iter()
            .map(|payment| payment_balance(payment, tpps)),
    );

    Ok(balances)
}

fn uncovered<'a, T: ClientAggregate>(
    aggregates: impl Iterator<Item = &'a T>,
    covered: &HashSet<&ClientKey>,
) -> Vec<&'a T> {
    let mut seen = HashSet::new();
    aggregates
        .filter(|&aggregate| !covered.contains(aggregate.key()) && seen.insert(aggregate.key()))
        .collect()
}
