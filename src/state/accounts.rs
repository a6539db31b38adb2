use anyhow::{Context, Result, bail};
use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, doc, oid::ObjectId};
use rust_decimal::Decimal;

use crate::{
    models::{Account, AccountMedium, AccountType},
    money::to_decimal128,
    validation::validate_account,
};

use super::{AppState, companies::require_active_company};

pub async fn list_accounts(state: &AppState, company_id: &ObjectId) -> Result<Vec<Account>> {
    let mut cursor = state
        .accounts
        .find(doc! { "company_id": company_id })
        .sort(doc! { "account_id": 1 })
        .await?;
    let mut items = Vec::new();
    while let Some(account) = cursor.try_next().await? {
        items.push(account);
    }
    Ok(items)
}

pub async fn get_account_by_id(state: &AppState, id: &ObjectId) -> Result<Option<Account>> {
    state
        .accounts
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

pub async fn get_primary_account(
    state: &AppState,
    company_id: &ObjectId,
) -> Result<Option<Account>> {
    state
        .accounts
        .find_one(doc! { "company_id": company_id, "is_primary": true })
        .await
        .map_err(Into::into)
}

async fn clear_primary(state: &AppState, company_id: &ObjectId, except: &ObjectId) -> Result<()> {
    state
        .accounts
        .update_many(
            doc! { "company_id": company_id, "is_primary": true, "_id": { "$ne": except } },
            doc! { "$set": { "is_primary": false, "updated_at": DateTime::now() } },
        )
        .await?;
    Ok(())
}

/// Creates an account. `account_id` must be unique; marking it primary moves
/// the primary flag away from the company's previous primary account.
pub async fn create_account(
    state: &AppState,
    company_id: &ObjectId,
    account_id: &str,
    name: &str,
    account_type: AccountType,
    medium: AccountMedium,
    is_primary: bool,
    balance: Decimal,
    notes: Option<String>,
) -> Result<ObjectId> {
    let account_id = account_id.trim();
    validate_account(account_id, name, balance)?;
    require_active_company(state, company_id).await?;

    if state
        .accounts
        .find_one(doc! { "account_id": account_id })
        .await?
        .is_some()
    {
        bail!("account id '{account_id}' is already in use");
    }

    let res = state
        .accounts
        .insert_one(Account {
            id: None,
            company_id: *company_id,
            account_id: account_id.to_string(),
            name: name.trim().to_string(),
            account_type,
            medium,
            is_primary,
            balance: to_decimal128(balance)?,
            created_at: Some(DateTime::now()),
            updated_at: None,
            notes,
        })
        .await?;
    let id = res
        .inserted_id
        .as_object_id()
        .context("account insert missing _id")?;

    if is_primary {
        clear_primary(state, company_id, &id).await?;
    }
    Ok(id)
}

pub async fn update_account(
    state: &AppState,
    id: &ObjectId,
    name: &str,
    account_type: AccountType,
    medium: AccountMedium,
    balance: Decimal,
    notes: Option<String>,
) -> Result<()> {
    let existing = get_account_by_id(state, id)
        .await?
        .context("account not found")?;
    validate_account(&existing.account_id, name, balance)?;

    state
        .accounts
        .update_one(
            doc! { "_id": id },
            doc! { "$set": {
                "name": name.trim(),
                "account_type": account_type.as_str(),
                "medium": medium.as_str(),
                "balance": to_decimal128(balance)?,
                "notes": notes,
                "updated_at": DateTime::now(),
            } },
        )
        .await?;
    Ok(())
}

pub async fn set_primary_account(state: &AppState, id: &ObjectId) -> Result<()> {
    let account = get_account_by_id(state, id)
        .await?
        .context("account not found")?;

    state
        .accounts
        .update_one(
            doc! { "_id": id },
            doc! { "$set": { "is_primary": true, "updated_at": DateTime::now() } },
        )
        .await?;
    clear_primary(state, &account.company_id, id).await
}

pub async fn delete_account(state: &AppState, id: &ObjectId) -> Result<()> {
    let has_transactions = state
        .transactions
        .find_one(doc! { "$or": [
            { "debit_account_id": id },
            { "credit_account_id": id },
            { "transaction_for.ref_id": id }
        ]})
        .await?
        .is_some();

    if has_transactions {
        bail!("account has related transactions; it cannot be deleted");
    }

    state.accounts.delete_one(doc! { "_id": id }).await?;
    Ok(())
}
