use anyhow::Result;
use mongodb::bson::{DateTime, oid::ObjectId};

use crate::{
    balances::{BalanceRecord, BillingSnapshot, compute_balances},
    models::{Bill, CreditNote, Payment},
};

use super::{
    AppState, bills_grouped_by_client, credit_notes_grouped_by_customer,
    credit_notes_grouped_by_third_party_payer, list_customer_bills, list_customer_credit_notes,
    list_customer_payments, list_third_party_payers, payments_grouped_by_client,
};

/// Balances of a customer at the start of a period, with the documents issued during it.
#[derive(Debug, Clone)]
pub struct BalancesWithDetails {
    pub balances: Vec<BalanceRecord>,
    pub bills: Vec<Bill>,
    pub payments: Vec<Payment>,
    pub credit_notes: Vec<CreditNote>,
}

/// Fetches the four aggregates and the payer list concurrently.
pub async fn load_billing_snapshot(
    state: &AppState,
    company_id: &ObjectId,
    customer_id: Option<&ObjectId>,
    max_date: Option<DateTime>,
) -> Result<BillingSnapshot> {
    let (
        bills,
        customer_credit_notes,
        third_party_payer_credit_notes,
        payments,
        third_party_payers,
    ) = tokio::try_join!(
        bills_grouped_by_client(state, company_id, customer_id, max_date),
        credit_notes_grouped_by_customer(state, company_id, customer_id, max_date),
        credit_notes_grouped_by_third_party_payer(state, company_id, customer_id, max_date),
        payments_grouped_by_client(state, company_id, customer_id, max_date),
        list_third_party_payers(state, company_id),
    )?;

    Ok(BillingSnapshot {
        bills,
        customer_credit_notes,
        third_party_payer_credit_notes,
        payments,
        third_party_payers,
    })
}

#[tracing::instrument(skip(state))]
pub async fn get_balances(
    state: &AppState,
    company_id: &ObjectId,
    customer_id: Option<&ObjectId>,
    max_date: Option<DateTime>,
) -> Result<Vec<BalanceRecord>> {
    let snapshot = load_billing_snapshot(state, company_id, customer_id, max_date).await?;
    let balances = compute_balances(&snapshot)?;
    tracing::debug!(
        bills = snapshot.bills.len(),
        payments = snapshot.payments.len(),
        records = balances.len(),
        "balances computed"
    );
    Ok(balances)
}

#[tracing::instrument(skip(state))]
pub async fn get_balances_with_details(
    state: &AppState,
    company_id: &ObjectId,
    customer_id: &ObjectId,
    start: DateTime,
    end: DateTime,
) -> Result<BalancesWithDetails> {
    // Opening balances stop just before the period so no document is counted twice.
    let opening = DateTime::from_millis(start.timestamp_millis() - 1);
    let (balances, bills, payments, credit_notes) = tokio::try_join!(
        get_balances(state, company_id, Some(customer_id), Some(opening)),
        list_customer_bills(state, company_id, customer_id, start, end),
        list_customer_payments(state, company_id, customer_id, start, end),
        list_customer_credit_notes(state, company_id, customer_id, start, end),
    )?;

    Ok(BalancesWithDetails {
        balances,
        bills,
        payments,
        credit_notes,
    })
}
