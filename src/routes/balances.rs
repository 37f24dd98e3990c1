use std::{str::FromStr, sync::Arc};

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::{DateTime as ChronoDateTime, SecondsFormat, Utc};
use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::{
    balances::BalanceRecord,
    models::{Bill, CreditNote, Payment},
    scope::CompanyScope,
    state::{AppState, get_balances, get_balances_with_details},
};

#[derive(Deserialize)]
pub struct BalancesQuery {
    #[serde(default)]
    customer: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Deserialize)]
pub struct BalanceDetailsQuery {
    customer: String,
    start_date: String,
    end_date: String,
}

#[derive(Debug, Serialize)]
pub struct BalanceRow {
    customer_id: String,
    customer_name: String,
    third_party_payer_id: Option<String>,
    participation_rate: f64,
    billed: f64,
    paid: f64,
    balance: f64,
    to_pay: f64,
}

impl From<BalanceRecord> for BalanceRow {
    fn from(record: BalanceRecord) -> Self {
        BalanceRow {
            customer_id: record.key.customer.to_hex(),
            customer_name: record.customer_name,
            third_party_payer_id: record.key.third_party_payer.map(|id| id.to_hex()),
            participation_rate: record.participation_rate,
            billed: record.billed,
            paid: record.paid,
            balance: record.balance,
            to_pay: record.to_pay,
        }
    }
}

#[derive(Serialize)]
pub struct BillRow {
    id: String,
    number: String,
    date: String,
    third_party_payer_id: Option<String>,
    net_incl_taxes: f64,
}

#[derive(Serialize)]
pub struct CreditNoteRow {
    id: String,
    number: String,
    date: String,
    third_party_payer_id: Option<String>,
    incl_taxes_customer: f64,
    incl_taxes_tpp: f64,
}

#[derive(Serialize)]
pub struct PaymentRow {
    id: String,
    number: String,
    date: String,
    third_party_payer_id: Option<String>,
    nature: &'static str,
    payment_type: &'static str,
    net_incl_taxes: f64,
}

#[derive(Serialize)]
pub struct BalanceDetailsResponse {
    balances: Vec<BalanceRow>,
    bills: Vec<BillRow>,
    payments: Vec<PaymentRow>,
    credit_notes: Vec<CreditNoteRow>,
}

/// GET /balances?customer=<id>&date=<rfc3339>
pub async fn balances_index(
    scope: CompanyScope,
    State(state): State<Arc<AppState>>,
    Query(query): Query<BalancesQuery>,
) -> Result<Json<Vec<BalanceRow>>, StatusCode> {
    let customer_id = clean_opt(query.customer)
        .map(|value| parse_object_id(&value))
        .transpose()?;
    let max_date = clean_opt(query.date)
        .map(|value| parse_date(&value))
        .transpose()?;

    let balances = get_balances(&state, scope.company_id(), customer_id.as_ref(), max_date)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "balances lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(balances.into_iter().map(BalanceRow::from).collect()))
}

/// GET /balances/details?customer=<id>&start_date=<rfc3339>&end_date=<rfc3339>
pub async fn balances_details(
    scope: CompanyScope,
    State(state): State<Arc<AppState>>,
    Query(query): Query<BalanceDetailsQuery>,
) -> Result<Json<BalanceDetailsResponse>, StatusCode> {
    let customer_id = parse_object_id(&query.customer)?;
    let start = parse_date(&query.start_date)?;
    let end = parse_date(&query.end_date)?;
    if start > end {
        return Err(StatusCode::BAD_REQUEST);
    }

    let details = get_balances_with_details(&state, scope.company_id(), &customer_id, start, end)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "balance details lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(BalanceDetailsResponse {
        balances: details.balances.into_iter().map(BalanceRow::from).collect(),
        bills: details.bills.into_iter().filter_map(bill_row).collect(),
        payments: details.payments.into_iter().filter_map(payment_row).collect(),
        credit_notes: details
            .credit_notes
            .into_iter()
            .filter_map(credit_note_row)
            .collect(),
    }))
}

fn bill_row(bill: Bill) -> Option<BillRow> {
    Some(BillRow {
        id: bill.id?.to_hex(),
        number: bill.number,
        date: fmt_iso(bill.date),
        third_party_payer_id: bill.third_party_payer_id.map(|id| id.to_hex()),
        net_incl_taxes: bill.net_incl_taxes,
    })
}

fn credit_note_row(credit_note: CreditNote) -> Option<CreditNoteRow> {
    Some(CreditNoteRow {
        id: credit_note.id?.to_hex(),
        number: credit_note.number,
        date: fmt_iso(credit_note.date),
        third_party_payer_id: credit_note.third_party_payer_id.map(|id| id.to_hex()),
        incl_taxes_customer: credit_note.incl_taxes_customer,
        incl_taxes_tpp: credit_note.incl_taxes_tpp,
    })
}

fn payment_row(payment: Payment) -> Option<PaymentRow> {
    Some(PaymentRow {
        id: payment.id?.to_hex(),
        number: payment.number,
        date: fmt_iso(payment.date),
        third_party_payer_id: payment.third_party_payer_id.map(|id| id.to_hex()),
        nature: payment.nature.as_str(),
        payment_type: payment.payment_type.as_str(),
        net_incl_taxes: payment.net_incl_taxes,
    })
}

fn clean_opt(input: Option<String>) -> Option<String> {
    input.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_object_id(value: &str) -> Result<ObjectId, StatusCode> {
    ObjectId::from_str(value.trim()).map_err(|_| StatusCode::BAD_REQUEST)
}

fn parse_date(value: &str) -> Result<DateTime, StatusCode> {
    ChronoDateTime::parse_from_rfc3339(value.trim())
        .map(|dt| DateTime::from_chrono(dt.with_timezone(&Utc)))
        .map_err(|_| StatusCode::BAD_REQUEST)
}

fn fmt_iso(date: DateTime) -> String {
    date.to_chrono().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balances::ClientKey;

    #[test]
    fn parse_date_accepts_offsets() {
        let date = parse_date("2024-03-01T10:00:00+01:00").unwrap();
        assert_eq!(fmt_iso(date), "2024-03-01T09:00:00.000Z");
        assert_eq!(parse_date("yesterday"), Err(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn balance_row_uses_hex_ids() {
        let customer = ObjectId::new();
        let payer = ObjectId::new();
        let row = BalanceRow::from(BalanceRecord {
            key: ClientKey::with_third_party_payer(customer, payer),
            customer_name: "Paul Durand".into(),
            participation_rate: 0.0,
            billed: 12.0,
            paid: 2.0,
            balance: -10.0,
            to_pay: 0.0,
        });
        assert_eq!(row.customer_id, customer.to_hex());
        assert_eq!(row.third_party_payer_id, Some(payer.to_hex()));
        assert_eq!(row.balance, -10.0);
    }

    #[test]
    fn blank_query_values_are_ignored() {
        assert_eq!(clean_opt(Some("   ".into())), None);
        assert_eq!(clean_opt(Some(" abc ".into())), Some("abc".into()));
    }
}
