// state module: AppState, initialization, and re-exports of submodules.

use anyhow::Result;
use mongodb::{Client, Collection, Database};
use std::env;

use crate::models::{Bill, CreditNote, Customer, Payment, ThirdPartyPayer};

mod balances;
mod billing;
mod customers;
mod seed;

pub use balances::*;
pub use billing::*;
pub use customers::*;

pub const CUSTOMERS: &str = "customers";
pub const THIRD_PARTY_PAYERS: &str = "third_party_payers";
pub const BILLS: &str = "bills";
pub const CREDIT_NOTES: &str = "credit_notes";
pub const PAYMENTS: &str = "payments";

#[derive(Clone)]
pub struct AppState {
    pub customers: Collection<Customer>,
    pub third_party_payers: Collection<ThirdPartyPayer>,
    pub bills: Collection<Bill>,
    pub credit_notes: Collection<CreditNote>,
    pub payments: Collection<Payment>,
}

impl AppState {
    /// Binds collection handles without touching the server.
    pub fn from_database(db: &Database) -> Self {
        AppState {
            customers: db.collection::<Customer>(CUSTOMERS),
            third_party_payers: db.collection::<ThirdPartyPayer>(THIRD_PARTY_PAYERS),
            bills: db.collection::<Bill>(BILLS),
            credit_notes: db.collection::<CreditNote>(CREDIT_NOTES),
            payments: db.collection::<Payment>(PAYMENTS),
        }
    }
}

pub async fn init_state() -> Result<AppState> {
    let uri = env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let db_name = env::var("MONGODB_DB").unwrap_or_else(|_| "compani".to_string());

    let client = Client::with_uri_str(uri).await?;
    let db = client.database(&db_name);

    seed::ensure_collections(&db).await?;

    // Only seed when the database is effectively empty (no customers).
    if seed::is_database_empty(&db).await? {
        seed::seed_sample_billing(&db).await?;
    }

    tracing::info!(database = %db_name, "mongodb state ready");
    Ok(AppState::from_database(&db))
}
