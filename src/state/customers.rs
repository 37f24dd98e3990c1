use anyhow::{Context, Result};
use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, doc, oid::ObjectId};
use std::time::SystemTime;

use crate::models::{Customer, Funding, PaymentDetails, ThirdPartyPayer};

use super::AppState;

pub async fn get_customer_by_id(state: &AppState, id: &ObjectId) -> Result<Option<Customer>> {
    state
        .customers
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

pub async fn create_customer(
    state: &AppState,
    company_id: &ObjectId,
    name: &str,
    payment: Option<PaymentDetails>,
    fundings: Vec<Funding>,
) -> Result<ObjectId> {
    let res = state
        .customers
        .insert_one(Customer {
            id: None,
            company_id: *company_id,
            name: name.to_string(),
            payment,
            fundings,
            created_at: Some(DateTime::from_system_time(SystemTime::now())),
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("customer insert missing _id")
}

pub async fn list_third_party_payers(
    state: &AppState,
    company_id: &ObjectId,
) -> Result<Vec<ThirdPartyPayer>> {
    let mut cursor = state
        .third_party_payers
        .find(doc! { "company_id": company_id })
        .sort(doc! { "name": 1 })
        .await?;
    let mut items = Vec::new();
    while let Some(tpp) = cursor.try_next().await? {
        items.push(tpp);
    }
    Ok(items)
}

pub async fn create_third_party_payer(
    state: &AppState,
    company_id: &ObjectId,
    name: &str,
    is_apa: bool,
) -> Result<ObjectId> {
    let res = state
        .third_party_payers
        .insert_one(ThirdPartyPayer {
            id: None,
            company_id: *company_id,
            name: name.to_string(),
            is_apa,
            created_at: Some(DateTime::from_system_time(SystemTime::now())),
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("third party payer insert missing _id")
}
