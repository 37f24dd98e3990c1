use anyhow::{Context, Result};
use mongodb::{
    Database, IndexModel,
    bson::{Bson, Document, doc},
};
use std::{env, fs, path::Path};

use crate::models::Customer;

use super::{BILLS, CREDIT_NOTES, CUSTOMERS, PAYMENTS, THIRD_PARTY_PAYERS};

/// Collections seeded from `SEED_DIR`, in insertion order.
const SEEDED: [&str; 5] = [THIRD_PARTY_PAYERS, CUSTOMERS, BILLS, CREDIT_NOTES, PAYMENTS];

pub(super) async fn is_database_empty(db: &Database) -> Result<bool> {
    let customers = db.collection::<Customer>(CUSTOMERS);
    let count = customers.estimated_document_count().await?;
    Ok(count == 0)
}

pub(super) async fn ensure_collections(db: &Database) -> Result<()> {
    let existing = db.list_collection_names().await?;
    for name in SEEDED {
        if !existing.iter().any(|collection| collection == name) {
            db.create_collection(name).await?;
        }
    }

    // Every provider filters on company, customer and date.
    for name in [BILLS, CREDIT_NOTES, PAYMENTS] {
        db.collection::<Document>(name)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "company_id": 1, "customer_id": 1, "date": 1 })
                    .options(
                        mongodb::options::IndexOptions::builder()
                            .name(format!("{name}_company_customer_date"))
                            .build(),
                    )
                    .build(),
            )
            .await?;
    }
    db.collection::<Document>(THIRD_PARTY_PAYERS)
        .create_index(IndexModel::builder().keys(doc! { "company_id": 1 }).build())
        .await?;
    Ok(())
}

/// Inserts `<SEED_DIR>/<collection>.json` (extended JSON arrays) when present.
pub(super) async fn seed_sample_billing(db: &Database) -> Result<()> {
    let dir = env::var("SEED_DIR").unwrap_or_else(|_| "./data".to_string());
    for name in SEEDED {
        let path = Path::new(&dir).join(format!("{name}.json"));
        let docs = load_extended_json_array(&path)?;
        if docs.is_empty() {
            continue;
        }
        let count = docs.len();
        db.collection::<Document>(name).insert_many(docs).await?;
        tracing::info!(collection = name, count, "seeded sample documents");
    }
    Ok(())
}

fn load_extended_json_array(path: &Path) -> Result<Vec<Document>> {
    let Ok(contents) = fs::read_to_string(path) else {
        return Ok(Vec::new());
    };
    let values = serde_json::from_str::<Vec<serde_json::Value>>(&contents)
        .with_context(|| format!("invalid seed file {}", path.display()))?;

    values
        .into_iter()
        .map(|value| match Bson::try_from(value) {
            Ok(Bson::Document(doc)) => Ok(doc),
            Ok(other) => {
                anyhow::bail!("seed entry in {} is not a document: {other}", path.display())
            }
            Err(err) => {
                Err(err).with_context(|| format!("invalid extended json in {}", path.display()))
            }
        })
        .collect()
}
