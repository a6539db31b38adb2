use anyhow::{Context, Result, bail};
use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, Document, doc, oid::ObjectId};
use rand::{Rng, distr::Alphanumeric};
use tracing::debug;

use crate::{
    models::{PartyKind, Transaction, TransactionParty, TransactionStatus, TransactionType},
    money::to_decimal128,
    validation::{TransactionDraft, validate_transaction},
};

use super::{AppState, companies::require_active_company};

const ID_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub transaction_type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub from: Option<DateTime>,
    pub to: Option<DateTime>,
}

impl TransactionFilter {
    fn to_document(&self, company_id: &ObjectId) -> Document {
        let mut filter = doc! { "company_id": company_id };
        if let Some(ty) = self.transaction_type {
            filter.insert("transaction_type", ty.as_str());
        }
        if let Some(status) = self.status {
            filter.insert("status", status.as_str());
        }
        let mut range = Document::new();
        if let Some(from) = self.from {
            range.insert("$gte", from);
        }
        if let Some(to) = self.to {
            range.insert("$lte", to);
        }
        if !range.is_empty() {
            filter.insert("transaction_date", range);
        }
        filter
    }
}

pub async fn list_transactions(
    state: &AppState,
    company_id: &ObjectId,
    filter: &TransactionFilter,
) -> Result<Vec<Transaction>> {
    let mut cursor = state
        .transactions
        .find(filter.to_document(company_id))
        .sort(doc! { "transaction_date": -1 })
        .await?;
    let mut items = Vec::new();
    while let Some(tx) = cursor.try_next().await? {
        items.push(tx);
    }
    Ok(items)
}

pub async fn get_transaction_by_id(state: &AppState, id: &ObjectId) -> Result<Option<Transaction>> {
    state
        .transactions
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

pub async fn get_transaction_by_code(
    state: &AppState,
    transaction_id: &str,
) -> Result<Option<Transaction>> {
    state
        .transactions
        .find_one(doc! { "transaction_id": transaction_id })
        .await
        .map_err(Into::into)
}

/// True when any transaction lists the record in `transaction_for`.
pub(super) async fn is_referenced_by_transaction(state: &AppState, id: &ObjectId) -> Result<bool> {
    Ok(state
        .transactions
        .find_one(doc! { "transaction_for.ref_id": id })
        .await?
        .is_some())
}

/// `TXN-YYYYMMDD-XXXXXX` with the transaction date and a random suffix.
pub fn generate_transaction_id(date: DateTime) -> String {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!(
        "TXN-{}-{}",
        date.to_chrono().format("%Y%m%d"),
        suffix.to_uppercase()
    )
}

async fn unused_transaction_id(state: &AppState, date: DateTime) -> Result<String> {
    for _ in 0..ID_ATTEMPTS {
        let candidate = generate_transaction_id(date);
        if get_transaction_by_code(state, &candidate).await?.is_none() {
            return Ok(candidate);
        }
        debug!(candidate, "transaction id collision");
    }
    bail!("could not generate a unique transaction id")
}

async fn ensure_account_in_company(
    state: &AppState,
    account_id: &ObjectId,
    company_id: &ObjectId,
    role: &str,
) -> Result<()> {
    let found = state
        .accounts
        .find_one(doc! { "_id": account_id, "company_id": company_id })
        .await?
        .is_some();
    if !found {
        bail!("{role} account {account_id} not found for this company");
    }
    Ok(())
}

async fn ensure_party_in_company(
    state: &AppState,
    party: &TransactionParty,
    company_id: &ObjectId,
) -> Result<()> {
    let filter = doc! { "_id": party.ref_id, "company_id": company_id };
    let found = match party.kind {
        PartyKind::Customer => state.customers.find_one(filter).await?.is_some(),
        PartyKind::Payment => state.payments.find_one(filter).await?.is_some(),
        PartyKind::Asset => state.assets.find_one(filter).await?.is_some(),
        PartyKind::Account => state.accounts.find_one(filter).await?.is_some(),
        PartyKind::Liability => state.liabilities.find_one(filter).await?.is_some(),
    };
    if !found {
        bail!("{:?} {} not found for this company", party.kind, party.ref_id);
    }
    Ok(())
}

/// Validates and stores a new pending transaction.
pub async fn create_transaction(
    state: &AppState,
    company_id: &ObjectId,
    draft: TransactionDraft,
) -> Result<ObjectId> {
    let now = DateTime::now();
    validate_transaction(&draft, now)?;
    require_active_company(state, company_id).await?;

    ensure_account_in_company(state, &draft.debit_account_id, company_id, "debit").await?;
    ensure_account_in_company(state, &draft.credit_account_id, company_id, "credit").await?;
    for party in &draft.transaction_for {
        ensure_party_in_company(state, party, company_id).await?;
    }

    let transaction_id = unused_transaction_id(state, draft.transaction_date).await?;
    let res = state
        .transactions
        .insert_one(Transaction {
            id: None,
            company_id: *company_id,
            transaction_id,
            entered_by: draft.entered_by,
            approved_by: None,
            transaction_date: draft.transaction_date,
            transaction_type: draft.transaction_type,
            transaction_sub_type: draft.transaction_sub_type,
            transaction_mode_category: draft.transaction_mode_category,
            transaction_mode: draft.transaction_mode,
            transaction_for: draft.transaction_for,
            amount: to_decimal128(draft.amount)?,
            debit_account_id: draft.debit_account_id,
            credit_account_id: draft.credit_account_id,
            status: TransactionStatus::Pending,
            narration: draft.narration.map(|n| n.trim().to_string()),
            created_at: Some(now),
            updated_at: None,
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("transaction insert missing _id")
}

// Moves a pending transaction to `next`; anything else is refused.
async fn decide_pending(
    state: &AppState,
    id: &ObjectId,
    next: TransactionStatus,
    approved_by: Option<ObjectId>,
) -> Result<()> {
    let res = state
        .transactions
        .update_one(
            doc! { "_id": id, "status": TransactionStatus::Pending.as_str() },
            doc! { "$set": {
                "status": next.as_str(),
                "approved_by": approved_by,
                "updated_at": DateTime::now(),
            } },
        )
        .await?;
    if res.matched_count == 0 {
        let tx = get_transaction_by_id(state, id)
            .await?
            .context("transaction not found")?;
        bail!(
            "transaction {} is {}; only pending transactions can be {}",
            tx.transaction_id,
            tx.status.as_str(),
            next.as_str()
        );
    }
    Ok(())
}

/// The approver must be someone other than the user who entered it.
pub async fn approve_transaction(
    state: &AppState,
    id: &ObjectId,
    approver: &ObjectId,
) -> Result<()> {
    let tx = get_transaction_by_id(state, id)
        .await?
        .context("transaction not found")?;
    if tx.entered_by == *approver {
        bail!("a transaction cannot be approved by the user who entered it");
    }
    decide_pending(state, id, TransactionStatus::Approved, Some(*approver)).await
}

pub async fn reject_transaction(state: &AppState, id: &ObjectId) -> Result<()> {
    decide_pending(state, id, TransactionStatus::Rejected, None).await
}

pub async fn cancel_transaction(state: &AppState, id: &ObjectId) -> Result<()> {
    decide_pending(state, id, TransactionStatus::Cancelled, None).await
}

pub async fn delete_transaction(state: &AppState, id: &ObjectId) -> Result<()> {
    let tx = get_transaction_by_id(state, id)
        .await?
        .context("transaction not found")?;
    if tx.status == TransactionStatus::Approved {
        bail!("approved transaction {} cannot be deleted", tx.transaction_id);
    }
    state.transactions.delete_one(doc! { "_id": id }).await?;
    Ok(())
}
