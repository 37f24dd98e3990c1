#![allow(dead_code)]

use std::{
    env,
    sync::{Mutex, MutexGuard, OnceLock},
    time::{SystemTime, UNIX_EPOCH},
};

use mongodb::{
    Client,
    bson::{DateTime, oid::ObjectId},
};

use compani::models::{Mandate, PaymentDetails};
use compani::state::{AppState, init_state};

/// Global lock so integration tests that mutate the DB run one-at-a-time.
static TEST_DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub struct TestContext {
    pub state: AppState,
    pub db_name: String,
    _guard: MutexGuard<'static, ()>,
}

pub async fn setup_state() -> Option<TestContext> {
    let guard = TEST_DB_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let uri = env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let db_name = format!(
        "companitest_{}",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis()
    );
    unsafe {
        env::set_var("MONGODB_DB", &db_name);
        env::set_var("SEED_DIR", "./tests/no-seed");
    }

    let client = match Client::with_uri_str(&uri).await {
        Ok(c) => c,
        Err(err) => {
            eprintln!("Skipping test; cannot connect to MongoDB: {err:?}");
            drop(guard);
            return None;
        }
    };
    if let Err(err) = client.database(&db_name).drop().await {
        eprintln!("Skipping test; cannot drop test DB: {err:?}");
        drop(guard);
        return None;
    }

    match init_state().await {
        Ok(state) => Some(TestContext {
            state,
            db_name,
            _guard: guard,
        }),
        Err(err) => {
            eprintln!("Skipping test; init_state failed: {err:?}");
            drop(guard);
            None
        }
    }
}

pub async fn teardown(ctx: Option<TestContext>) {
    if let Some(ctx) = ctx {
        let uri =
            env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        if let Ok(client) = Client::with_uri_str(&uri).await {
            let _ = client.database(&ctx.db_name).drop().await;
        }
        drop(ctx);
    }
}

/// Fixed dates keep the as-of filters deterministic.
pub fn day(n: i64) -> DateTime {
    DateTime::from_millis(1_704_067_200_000 + n * 86_400_000)
}

pub fn signed_bank_details() -> PaymentDetails {
    PaymentDetails {
        bank_account_owner: Some("Jeanne Martin".into()),
        bic: Some("BNPAFRPP".into()),
        iban: Some("FR7630006000011234567890189".into()),
        mandates: vec![Mandate {
            rum: "R-0001".into(),
            signed_at: Some(day(1)),
            created_at: day(0),
        }],
    }
}

pub fn new_company() -> ObjectId {
    ObjectId::new()
}
