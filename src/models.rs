// models.rs
// Domain models for the MongoDB collections read and written by the billing service.

use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// Whether a payment brings money in or sends it back to the client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentNature {
    Payment,
    Refund,
}

impl PaymentNature {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentNature::Payment => "payment",
            PaymentNature::Refund => "refund",
        }
    }

    pub fn is_payment(&self) -> bool {
        matches!(self, PaymentNature::Payment)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    DirectDebit,
    BankTransfer,
    Check,
    Cash,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::DirectDebit => "direct_debit",
            PaymentType::BankTransfer => "bank_transfer",
            PaymentType::Check => "check",
            PaymentType::Cash => "cash",
        }
    }
}

impl Default for PaymentType {
    fn default() -> Self {
        PaymentType::BankTransfer
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FundingNature {
    Hourly,
    Fixed,
}

/// SEPA mandate signed (or pending signature) by a customer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mandate {
    pub rum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime>,
    pub created_at: DateTime,
}

/// Bank details used for direct debit collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PaymentDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_account_owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    #[serde(default)]
    pub mandates: Vec<Mandate>,
}

impl PaymentDetails {
    pub fn has_bank_details(&self) -> bool {
        let filled =
            |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
        filled(&self.bank_account_owner) && filled(&self.bic) && filled(&self.iban)
    }
}

/// One dated revision of a funding agreement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FundingVersion {
    #[serde(default)]
    pub customer_participation_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_ttc_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_ttc: Option<f64>,
    #[serde(default)]
    pub care_days: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime>,
    pub created_at: DateTime,
}

/// Funding granted to a customer by a third-party payer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Funding {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub third_party_payer_id: ObjectId,
    pub nature: FundingNature,
    #[serde(default)]
    pub versions: Vec<FundingVersion>,
}

/// Customer document stored in MongoDB.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub company_id: ObjectId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentDetails>,
    #[serde(default)]
    pub fundings: Vec<Funding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

/// Third-party payer (public funding body, insurer...) attached to a company.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThirdPartyPayer {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub company_id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub is_apa: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub company_id: ObjectId,
    pub number: String,
    pub customer_id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub third_party_payer_id: Option<ObjectId>,
    pub date: DateTime,
    pub net_incl_taxes: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

/// Credit note; the customer and payer shares are refunded separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditNote {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub company_id: ObjectId,
    pub number: String,
    pub customer_id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub third_party_payer_id: Option<ObjectId>,
    pub date: DateTime,
    #[serde(default)]
    pub incl_taxes_customer: f64,
    #[serde(default)]
    pub incl_taxes_tpp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub company_id: ObjectId,
    pub number: String,
    pub customer_id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub third_party_payer_id: Option<ObjectId>,
    pub date: DateTime,
    pub net_incl_taxes: f64,
    pub nature: PaymentNature,
    #[serde(default)]
    pub payment_type: PaymentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}
