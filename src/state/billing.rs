use anyhow::{Context, Result};
use futures::stream::TryStreamExt;
use mongodb::{
    Collection,
    bson::{DateTime, Document, doc, from_document, oid::ObjectId},
};
use serde::de::DeserializeOwned;
use std::time::SystemTime;

use crate::{
    balances::{BillAggregate, CreditNoteAggregate, PaymentAggregate},
    models::{Bill, CreditNote, Payment, PaymentNature, PaymentType},
};

use super::{AppState, CUSTOMERS};

fn client_filter(
    company_id: &ObjectId,
    customer_id: Option<&ObjectId>,
    max_date: Option<DateTime>,
) -> Document {
    let mut filter = doc! { "company_id": company_id };
    if let Some(customer_id) = customer_id {
        filter.insert("customer_id", customer_id);
    }
    if let Some(max_date) = max_date {
        filter.insert("date", doc! { "$lte": max_date });
    }
    filter
}

/// Group key shared by bills, payer credit notes and payments. A missing payer
/// field is folded into `null` so both shapes land in the same group.
fn client_group_id() -> Document {
    doc! {
        "customer": "$customer_id",
        "third_party_payer": { "$ifNull": ["$third_party_payer_id", null] },
    }
}

fn with_customer(mut pipeline: Vec<Document>) -> Vec<Document> {
    pipeline.extend([
        doc! { "$lookup": {
            "from": CUSTOMERS,
            "localField": "_id.customer",
            "foreignField": "_id",
            "as": "customer",
        }},
        doc! { "$unwind": "$customer" },
        doc! { "$sort": { "_id.customer": 1, "_id.third_party_payer": 1 } },
    ]);
    pipeline
}

async fn aggregate_into<C, T>(collection: &Collection<C>, pipeline: Vec<Document>) -> Result<Vec<T>>
where
    C: Send + Sync,
    T: DeserializeOwned,
{
    let mut cursor = collection.aggregate(pipeline).await?;
    let mut items = Vec::new();
    while let Some(document) = cursor.try_next().await? {
        items.push(from_document(document)?);
    }
    Ok(items)
}

pub async fn bills_grouped_by_client(
    state: &AppState,
    company_id: &ObjectId,
    customer_id: Option<&ObjectId>,
    max_date: Option<DateTime>,
) -> Result<Vec<BillAggregate>> {
    let pipeline = with_customer(vec![
        doc! { "$match": client_filter(company_id, customer_id, max_date) },
        doc! { "$group": {
            "_id": client_group_id(),
            "billed": { "$sum": "$net_incl_taxes" },
        }},
    ]);
    aggregate_into(&state.bills, pipeline).await
}

/// Customer share of credit notes, one group per customer.
pub async fn credit_notes_grouped_by_customer(
    state: &AppState,
    company_id: &ObjectId,
    customer_id: Option<&ObjectId>,
    max_date: Option<DateTime>,
) -> Result<Vec<CreditNoteAggregate>> {
    let mut filter = client_filter(company_id, customer_id, max_date);
    filter.insert("incl_taxes_customer", doc! { "$gt": 0 });
    let pipeline = with_customer(vec![
        doc! { "$match": filter },
        doc! { "$group": {
            "_id": { "customer": "$customer_id" },
            "refund": { "$sum": "$incl_taxes_customer" },
        }},
    ]);
    aggregate_into(&state.credit_notes, pipeline).await
}

/// Payer share of credit notes, one group per (customer, payer).
pub async fn credit_notes_grouped_by_third_party_payer(
    state: &AppState,
    company_id: &ObjectId,
    customer_id: Option<&ObjectId>,
    max_date: Option<DateTime>,
) -> Result<Vec<CreditNoteAggregate>> {
    let mut filter = client_filter(company_id, customer_id, max_date);
    filter.insert("third_party_payer_id", doc! { "$ne": null });
    filter.insert("incl_taxes_tpp", doc! { "$gt": 0 });
    let pipeline = with_customer(vec![
        doc! { "$match": filter },
        doc! { "$group": {
            "_id": client_group_id(),
            "refund": { "$sum": "$incl_taxes_tpp" },
        }},
    ]);
    aggregate_into(&state.credit_notes, pipeline).await
}

/// Payments pushed in date order so each group keeps its chronology.
pub async fn payments_grouped_by_client(
    state: &AppState,
    company_id: &ObjectId,
    customer_id: Option<&ObjectId>,
    max_date: Option<DateTime>,
) -> Result<Vec<PaymentAggregate>> {
    let pipeline = with_customer(vec![
        doc! { "$match": client_filter(company_id, customer_id, max_date) },
        doc! { "$sort": { "date": 1, "_id": 1 } },
        doc! { "$group": {
            "_id": client_group_id(),
            "payments": { "$push": {
                "nature": "$nature",
                "net_incl_taxes": "$net_incl_taxes",
            }},
        }},
    ]);
    aggregate_into(&state.payments, pipeline).await
}

fn period_filter(
    company_id: &ObjectId,
    customer_id: &ObjectId,
    start: DateTime,
    end: DateTime,
) -> Document {
    doc! {
        "company_id": company_id,
        "customer_id": customer_id,
        "date": { "$gte": start, "$lte": end },
    }
}

pub async fn list_customer_bills(
    state: &AppState,
    company_id: &ObjectId,
    customer_id: &ObjectId,
    start: DateTime,
    end: DateTime,
) -> Result<Vec<Bill>> {
    let mut cursor = state
        .bills
        .find(period_filter(company_id, customer_id, start, end))
        .sort(doc! { "date": 1 })
        .await?;
    let mut items = Vec::new();
    while let Some(bill) = cursor.try_next().await? {
        items.push(bill);
    }
    Ok(items)
}

pub async fn list_customer_credit_notes(
    state: &AppState,
    company_id: &ObjectId,
    customer_id: &ObjectId,
    start: DateTime,
    end: DateTime,
) -> Result<Vec<CreditNote>> {
    let mut cursor = state
        .credit_notes
        .find(period_filter(company_id, customer_id, start, end))
        .sort(doc! { "date": 1 })
        .await?;
    let mut items = Vec::new();
    while let Some(credit_note) = cursor.try_next().await? {
        items.push(credit_note);
    }
    Ok(items)
}

pub async fn list_customer_payments(
    state: &AppState,
    company_id: &ObjectId,
    customer_id: &ObjectId,
    start: DateTime,
    end: DateTime,
) -> Result<Vec<Payment>> {
    let mut cursor = state
        .payments
        .find(period_filter(company_id, customer_id, start, end))
        .sort(doc! { "date": 1 })
        .await?;
    let mut items = Vec::new();
    while let Some(payment) = cursor.try_next().await? {
        items.push(payment);
    }
    Ok(items)
}

pub async fn create_bill(
    state: &AppState,
    company_id: &ObjectId,
    customer_id: &ObjectId,
    third_party_payer_id: Option<ObjectId>,
    number: &str,
    date: DateTime,
    net_incl_taxes: f64,
) -> Result<ObjectId> {
    let res = state
        .bills
        .insert_one(Bill {
            id: None,
            company_id: *company_id,
            number: number.to_string(),
            customer_id: *customer_id,
            third_party_payer_id,
            date,
            net_incl_taxes,
            created_at: Some(DateTime::from_system_time(SystemTime::now())),
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("bill insert missing _id")
}

pub async fn create_credit_note(
    state: &AppState,
    company_id: &ObjectId,
    customer_id: &ObjectId,
    third_party_payer_id: Option<ObjectId>,
    number: &str,
    date: DateTime,
    incl_taxes_customer: f64,
    incl_taxes_tpp: f64,
) -> Result<ObjectId> {
    let res = state
        .credit_notes
        .insert_one(CreditNote {
            id: None,
            company_id: *company_id,
            number: number.to_string(),
            customer_id: *customer_id,
            third_party_payer_id,
            date,
            incl_taxes_customer,
            incl_taxes_tpp,
            created_at: Some(DateTime::from_system_time(SystemTime::now())),
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("credit note insert missing _id")
}

pub async fn create_payment(
    state: &AppState,
    company_id: &ObjectId,
    customer_id: &ObjectId,
    third_party_payer_id: Option<ObjectId>,
    number: &str,
    date: DateTime,
    net_incl_taxes: f64,
    nature: PaymentNature,
    payment_type: PaymentType,
) -> Result<ObjectId> {
    let res = state
        .payments
        .insert_one(Payment {
            id: None,
            company_id: *company_id,
            number: number.to_string(),
            customer_id: *customer_id,
            third_party_payer_id,
            date,
            net_incl_taxes,
            nature,
            payment_type,
            created_at: Some(DateTime::from_system_time(SystemTime::now())),
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("payment insert missing _id")
}
