// models.rs
// Domain models stored in MongoDB plus the closed vocabularies they use.

use mongodb::bson::{DateTime, Decimal128, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::depreciation::DepreciationMethod;

/// Company document stored in MongoDB. Every other record belongs to one company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub slug: String,
    pub default_currency: String,
    pub is_active: bool,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
    pub notes: Option<String>,
}

/// Company definition as read from the seed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedCompany {
    pub name: String,
    #[serde(default)]
    pub default_currency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub company_id: ObjectId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

/// Payment received from a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub company_id: ObjectId,
    pub customer_id: ObjectId,
    pub amount: Decimal128,
    pub payment_date: DateTime,
    pub mode: String,
    pub reference: Option<String>,
    pub status: PaymentStatus,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Credit,
    Debit,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Credit => "credit",
            AccountType::Debit => "debit",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountMedium {
    Cash,
    Cheque,
}

impl AccountMedium {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountMedium::Cash => "cash",
            AccountMedium::Cheque => "cheque",
        }
    }
}

/// Financial account. `account_id` is the human-facing code and is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub company_id: ObjectId,
    pub account_id: String,
    pub name: String,
    pub account_type: AccountType,
    pub medium: AccountMedium,
    pub is_primary: bool,
    pub balance: Decimal128,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LiabilityStatus {
    Active,
    Closed,
}

impl LiabilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LiabilityStatus::Active => "active",
            LiabilityStatus::Closed => "closed",
        }
    }
}

/// Loan or other obligation owed by the company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Liability {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub company_id: ObjectId,
    pub name: String,
    pub lender: String,
    pub principal: Decimal128,
    pub outstanding: Decimal128,
    /// Annual rate in percent.
    pub interest_rate: Decimal128,
    pub start_date: DateTime,
    pub due_date: DateTime,
    pub status: LiabilityStatus,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Active,
    UnderMaintenance,
    UnderRepair,
    Inactive,
    Disposed,
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::Active => "active",
            AssetStatus::UnderMaintenance => "under_maintenance",
            AssetStatus::UnderRepair => "under_repair",
            AssetStatus::Inactive => "inactive",
            AssetStatus::Disposed => "disposed",
        }
    }

    /// Statuses the maintenance sweep is allowed to move between.
    pub fn is_date_driven(&self) -> bool {
        matches!(
            self,
            AssetStatus::Active | AssetStatus::UnderMaintenance | AssetStatus::UnderRepair
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceKind {
    Maintenance,
    Repair,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaintenanceRecord {
    pub kind: MaintenanceKind,
    pub start_date: DateTime,
    pub end_date: Option<DateTime>,
    pub description: String,
    pub cost: Option<Decimal128>,
}

impl MaintenanceRecord {
    /// A record is open from its start until its end (inclusive), or indefinitely
    /// while no end is set.
    pub fn is_open_at(&self, now: DateTime) -> bool {
        self.start_date <= now && self.end_date.is_none_or(|end| now <= end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub company_id: ObjectId,
    pub name: String,
    pub asset_code: String,
    pub category: String,
    pub purchase_date: DateTime,
    pub cost: Decimal128,
    pub salvage_value: Decimal128,
    pub useful_life_years: u32,
    pub depreciation_method: DepreciationMethod,
    /// Percent per year, used by written-down value.
    pub depreciation_rate: Option<Decimal128>,
    pub total_units: Option<Decimal128>,
    pub units_used: Option<Decimal128>,
    pub status: AssetStatus,
    #[serde(default)]
    pub maintenance: Vec<MaintenanceRecord>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
    Payment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
            TransactionType::Transfer => "transfer",
            TransactionType::Payment => "payment",
        }
    }

    pub fn sub_types(&self) -> &'static [&'static str] {
        match self {
            TransactionType::Income => &["sales", "service", "interest", "other_income"],
            TransactionType::Expense => &[
                "purchase",
                "salary",
                "rent",
                "utilities",
                "maintenance",
                "other_expense",
            ],
            TransactionType::Transfer => &["internal", "bank_deposit", "cash_withdrawal"],
            TransactionType::Payment => &["customer_receipt", "supplier_payment", "loan_repayment"],
        }
    }

    pub fn allows_sub_type(&self, sub_type: &str) -> bool {
        self.sub_types().contains(&sub_type)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ModeCategory {
    Cash,
    Bank,
    Digital,
    Credit,
}

impl ModeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModeCategory::Cash => "cash",
            ModeCategory::Bank => "bank",
            ModeCategory::Digital => "digital",
            ModeCategory::Credit => "credit",
        }
    }

    pub fn modes(&self) -> &'static [&'static str] {
        match self {
            ModeCategory::Cash => &["cash"],
            ModeCategory::Bank => &["cheque", "bank_transfer", "demand_draft"],
            ModeCategory::Digital => &["upi", "card", "wallet"],
            ModeCategory::Credit => &["on_account"],
        }
    }

    pub fn allows_mode(&self, mode: &str) -> bool {
        self.modes().contains(&mode)
    }

    /// Category a mode belongs to, if the mode is known at all.
    pub fn for_mode(mode: &str) -> Option<ModeCategory> {
        [
            ModeCategory::Cash,
            ModeCategory::Bank,
            ModeCategory::Digital,
            ModeCategory::Credit,
        ]
        .into_iter()
        .find(|category| category.allows_mode(mode))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Approved => "approved",
            TransactionStatus::Rejected => "rejected",
            TransactionStatus::Cancelled => "cancelled",
        }
    }
}

/// Kind of record a transaction can be raised for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    Customer,
    Payment,
    Asset,
    Account,
    Liability,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionParty {
    pub kind: PartyKind,
    pub ref_id: ObjectId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub company_id: ObjectId,
    pub transaction_id: String,
    pub entered_by: ObjectId,
    pub approved_by: Option<ObjectId>,
    pub transaction_date: DateTime,
    pub transaction_type: TransactionType,
    pub transaction_sub_type: String,
    pub transaction_mode_category: ModeCategory,
    pub transaction_mode: String,
    #[serde(default)]
    pub transaction_for: Vec<TransactionParty>,
    pub amount: Decimal128,
    pub debit_account_id: ObjectId,
    pub credit_account_id: ObjectId,
    pub status: TransactionStatus,
    pub narration: Option<String>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}
