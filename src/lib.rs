pub mod balances;
pub mod models;
pub mod routes;
pub mod scope;
pub mod state;
pub mod telemetry;
