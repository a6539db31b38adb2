use anyhow::{Context, Result, bail};
use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, doc, oid::ObjectId};
use rust_decimal::Decimal;

use crate::{
    models::{Liability, LiabilityStatus},
    money::{to_decimal, to_decimal128},
    validation::{validate_amount, validate_liability},
};

use super::{
    AppState, companies::require_active_company, transactions::is_referenced_by_transaction,
};

pub async fn list_liabilities(state: &AppState, company_id: &ObjectId) -> Result<Vec<Liability>> {
    let mut cursor = state
        .liabilities
        .find(doc! { "company_id": company_id })
        .sort(doc! { "due_date": 1 })
        .await?;
    let mut items = Vec::new();
    while let Some(liability) = cursor.try_next().await? {
        items.push(liability);
    }
    Ok(items)
}

pub async fn get_liability_by_id(state: &AppState, id: &ObjectId) -> Result<Option<Liability>> {
    state
        .liabilities
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

fn status_for(outstanding: Decimal) -> LiabilityStatus {
    if outstanding.is_zero() {
        LiabilityStatus::Closed
    } else {
        LiabilityStatus::Active
    }
}

pub async fn create_liability(
    state: &AppState,
    company_id: &ObjectId,
    name: &str,
    lender: &str,
    principal: Decimal,
    outstanding: Decimal,
    interest_rate: Decimal,
    start_date: DateTime,
    due_date: DateTime,
    notes: Option<String>,
) -> Result<ObjectId> {
    validate_liability(name, principal, outstanding, interest_rate, start_date, due_date)?;
    require_active_company(state, company_id).await?;

    let res = state
        .liabilities
        .insert_one(Liability {
            id: None,
            company_id: *company_id,
            name: name.trim().to_string(),
            lender: lender.trim().to_string(),
            principal: to_decimal128(principal)?,
            outstanding: to_decimal128(outstanding)?,
            interest_rate: to_decimal128(interest_rate)?,
            start_date,
            due_date,
            status: status_for(outstanding),
            created_at: Some(DateTime::now()),
            updated_at: None,
            notes,
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("liability insert missing _id")
}

pub async fn update_liability(
    state: &AppState,
    id: &ObjectId,
    name: &str,
    lender: &str,
    principal: Decimal,
    outstanding: Decimal,
    interest_rate: Decimal,
    start_date: DateTime,
    due_date: DateTime,
    notes: Option<String>,
) -> Result<()> {
    validate_liability(name, principal, outstanding, interest_rate, start_date, due_date)?;

    let res = state
        .liabilities
        .update_one(
            doc! { "_id": id },
            doc! { "$set": {
                "name": name.trim(),
                "lender": lender.trim(),
                "principal": to_decimal128(principal)?,
                "outstanding": to_decimal128(outstanding)?,
                "interest_rate": to_decimal128(interest_rate)?,
                "start_date": start_date,
                "due_date": due_date,
                "status": status_for(outstanding).as_str(),
                "notes": notes,
                "updated_at": DateTime::now(),
            } },
        )
        .await?;
    if res.matched_count == 0 {
        bail!("liability not found");
    }
    Ok(())
}

/// Reduces the outstanding amount and closes the liability once it reaches zero.
/// Returns the new outstanding amount.
pub async fn record_liability_repayment(
    state: &AppState,
    id: &ObjectId,
    amount: Decimal,
) -> Result<Decimal> {
    validate_amount("amount", amount)?;
    let liability = get_liability_by_id(state, id)
        .await?
        .context("liability not found")?;
    if liability.status == LiabilityStatus::Closed {
        bail!("liability '{}' is already closed", liability.name);
    }

    let outstanding = to_decimal(&liability.outstanding)?;
    if amount > outstanding {
        bail!("repayment {amount} exceeds outstanding {outstanding}");
    }
    let remaining = outstanding - amount;

    // Guard on the value read so concurrent repayments cannot both apply.
    let res = state
        .liabilities
        .update_one(
            doc! { "_id": id, "outstanding": liability.outstanding },
            doc! { "$set": {
                "outstanding": to_decimal128(remaining)?,
                "status": status_for(remaining).as_str(),
                "updated_at": DateTime::now(),
            } },
        )
        .await?;
    if res.modified_count == 0 {
        bail!("liability changed while recording repayment; retry");
    }
    Ok(remaining)
}

pub async fn delete_liability(state: &AppState, id: &ObjectId) -> Result<()> {
    if is_referenced_by_transaction(state, id).await? {
        bail!("liability is referenced by transactions; it cannot be deleted");
    }
    state.liabilities.delete_one(doc! { "_id": id }).await?;
    Ok(())
}
