// validation.rs
// Pure field rules checked before records are written; `state` turns the typed
// error into an anyhow error for the caller.

use mongodb::bson::{DateTime, oid::ObjectId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{ModeCategory, TransactionParty, TransactionType};

pub const NARRATION_MAX_CHARS: usize = 500;
pub const MAX_USEFUL_LIFE_YEARS: u32 = 100;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    #[error("{0} must be non-negative, got {1}")]
    Negative(&'static str, Decimal),

    #[error("transaction date cannot be in the future")]
    FutureDated,

    #[error("sub type '{sub_type}' is not valid for transaction type '{transaction_type}'")]
    UnknownSubType {
        transaction_type: &'static str,
        sub_type: String,
    },

    #[error("mode '{mode}' is not valid for mode category '{category}'")]
    UnknownMode {
        category: &'static str,
        mode: String,
    },

    #[error("narration must be at most 500 characters, got {0}")]
    NarrationTooLong(usize),

    #[error("debit and credit account must differ")]
    SameAccount,

    #[error("email '{0}' is not a valid address")]
    InvalidEmail(String),

    #[error("{0} must not be before its start date")]
    EndBeforeStart(&'static str),

    #[error("outstanding {outstanding} exceeds principal {principal}")]
    OutstandingExceedsPrincipal {
        principal: Decimal,
        outstanding: Decimal,
    },

    #[error("salvage value {salvage} must not exceed cost {cost}")]
    SalvageExceedsCost { cost: Decimal, salvage: Decimal },

    #[error("useful life must be between 1 and 100 years, got {0}")]
    LifeOutOfRange(u32),

    #[error("rate must be above 0 and at most 100 percent, got {0}")]
    RateOutOfRange(Decimal),

    #[error("units used {used} exceed total units {total}")]
    UnitsExceedTotal { total: Decimal, used: Decimal },
}

/// Input for a new transaction. The id, status and audit fields are filled in
/// by `state::create_transaction`.
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    pub entered_by: ObjectId,
    pub transaction_date: DateTime,
    pub transaction_type: TransactionType,
    pub transaction_sub_type: String,
    pub transaction_mode_category: ModeCategory,
    pub transaction_mode: String,
    pub transaction_for: Vec<TransactionParty>,
    pub amount: Decimal,
    pub debit_account_id: ObjectId,
    pub credit_account_id: ObjectId,
    pub narration: Option<String>,
}

pub fn validate_transaction(
    draft: &TransactionDraft,
    now: DateTime,
) -> Result<(), ValidationError> {
    if draft.transaction_date > now {
        return Err(ValidationError::FutureDated);
    }

    if !draft
        .transaction_type
        .allows_sub_type(&draft.transaction_sub_type)
    {
        return Err(ValidationError::UnknownSubType {
            transaction_type: draft.transaction_type.as_str(),
            sub_type: draft.transaction_sub_type.clone(),
        });
    }

    if !draft
        .transaction_mode_category
        .allows_mode(&draft.transaction_mode)
    {
        return Err(ValidationError::UnknownMode {
            category: draft.transaction_mode_category.as_str(),
            mode: draft.transaction_mode.clone(),
        });
    }

    validate_amount("amount", draft.amount)?;

    if let Some(narration) = &draft.narration {
        let len = narration.chars().count();
        if len > NARRATION_MAX_CHARS {
            return Err(ValidationError::NarrationTooLong(len));
        }
    }

    if draft.debit_account_id == draft.credit_account_id {
        return Err(ValidationError::SameAccount);
    }

    Ok(())
}

pub fn validate_amount(field: &'static str, amount: Decimal) -> Result<(), ValidationError> {
    if amount < Decimal::ZERO {
        return Err(ValidationError::Negative(field, amount));
    }
    Ok(())
}

pub fn validate_account(
    account_id: &str,
    name: &str,
    balance: Decimal,
) -> Result<(), ValidationError> {
    require_text("account_id", account_id)?;
    require_text("name", name)?;
    validate_amount("balance", balance)
}

pub fn validate_customer(name: &str, email: Option<&str>) -> Result<(), ValidationError> {
    require_text("name", name)?;
    if let Some(email) = email {
        if !looks_like_email(email) {
            return Err(ValidationError::InvalidEmail(email.to_string()));
        }
    }
    Ok(())
}

pub fn validate_liability(
    name: &str,
    principal: Decimal,
    outstanding: Decimal,
    interest_rate: Decimal,
    start_date: DateTime,
    due_date: DateTime,
) -> Result<(), ValidationError> {
    require_text("name", name)?;
    validate_amount("principal", principal)?;
    validate_amount("outstanding", outstanding)?;
    validate_amount("interest_rate", interest_rate)?;
    if outstanding > principal {
        return Err(ValidationError::OutstandingExceedsPrincipal {
            principal,
            outstanding,
        });
    }
    if due_date < start_date {
        return Err(ValidationError::EndBeforeStart("due_date"));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct AssetFigures {
    pub cost: Decimal,
    pub salvage_value: Decimal,
    pub useful_life_years: u32,
    pub depreciation_rate: Option<Decimal>,
    pub total_units: Option<Decimal>,
    pub units_used: Option<Decimal>,
}

pub fn validate_asset(
    name: &str,
    asset_code: &str,
    figures: &AssetFigures,
) -> Result<(), ValidationError> {
    require_text("name", name)?;
    require_text("asset_code", asset_code)?;
    validate_amount("cost", figures.cost)?;
    validate_amount("salvage_value", figures.salvage_value)?;
    if figures.salvage_value > figures.cost {
        return Err(ValidationError::SalvageExceedsCost {
            cost: figures.cost,
            salvage: figures.salvage_value,
        });
    }
    if figures.useful_life_years == 0 || figures.useful_life_years > MAX_USEFUL_LIFE_YEARS {
        return Err(ValidationError::LifeOutOfRange(figures.useful_life_years));
    }
    if let Some(rate) = figures.depreciation_rate {
        if rate <= Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
            return Err(ValidationError::RateOutOfRange(rate));
        }
    }
    if let Some(total) = figures.total_units {
        validate_amount("total_units", total)?;
    }
    if let Some(used) = figures.units_used {
        validate_amount("units_used", used)?;
        if let Some(total) = figures.total_units {
            if used > total {
                return Err(ValidationError::UnitsExceedTotal { total, used });
            }
        }
    }
    Ok(())
}

pub fn validate_maintenance_window(
    start: DateTime,
    end: Option<DateTime>,
) -> Result<(), ValidationError> {
    match end {
        Some(end) if end < start => Err(ValidationError::EndBeforeStart("end_date")),
        _ => Ok(()),
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Empty(field))
    } else {
        Ok(())
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}
