use anyhow::{Context, Result, bail};
use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, doc, oid::ObjectId};
use slug::slugify;

use crate::models::Company;

use super::AppState;

pub async fn list_companies(state: &AppState) -> Result<Vec<Company>> {
    let mut cursor = state.companies.find(doc! {}).await?;
    let mut companies = Vec::new();
    while let Some(company) = cursor.try_next().await? {
        companies.push(company);
    }
    Ok(companies)
}

pub async fn get_company_by_id(state: &AppState, id: &ObjectId) -> Result<Option<Company>> {
    state
        .companies
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

fn company_slug(name: &str, slug: &str) -> String {
    if slug.trim().is_empty() {
        slugify(name)
    } else {
        slugify(slug)
    }
}

fn company_currency(state: &AppState, default_currency: &str) -> String {
    if default_currency.trim().is_empty() {
        state.default_currency.clone()
    } else {
        default_currency.trim().to_uppercase()
    }
}

async fn ensure_slug_free(state: &AppState, slug: &str, except: Option<&ObjectId>) -> Result<()> {
    let mut filter = doc! { "slug": slug };
    if let Some(id) = except {
        filter.insert("_id", doc! { "$ne": id });
    }
    if state.companies.find_one(filter).await?.is_some() {
        bail!("company slug '{slug}' is already taken");
    }
    Ok(())
}

pub async fn create_company(
    state: &AppState,
    name: &str,
    slug: &str,
    default_currency: &str,
    is_active: bool,
    notes: Option<String>,
) -> Result<ObjectId> {
    let slug = company_slug(name, slug);
    ensure_slug_free(state, &slug, None).await?;

    let res = state
        .companies
        .insert_one(Company {
            id: None,
            name: name.trim().to_string(),
            slug,
            default_currency: company_currency(state, default_currency),
            is_active,
            created_at: Some(DateTime::now()),
            updated_at: None,
            notes,
        })
        .await?;

    res.inserted_id
        .as_object_id()
        .context("company insert missing _id")
}

pub async fn update_company(
    state: &AppState,
    id: &ObjectId,
    name: &str,
    slug: &str,
    default_currency: &str,
    is_active: bool,
    notes: Option<String>,
) -> Result<()> {
    let slug = company_slug(name, slug);
    ensure_slug_free(state, &slug, Some(id)).await?;
    let currency = company_currency(state, default_currency);

    let res = state
        .companies
        .update_one(
            doc! { "_id": id },
            doc! { "$set": {
                "name": name.trim(),
                "slug": slug,
                "default_currency": currency,
                "is_active": is_active,
                "notes": notes,
                "updated_at": DateTime::now()
            } },
        )
        .await?;
    if res.matched_count == 0 {
        bail!("company not found");
    }
    Ok(())
}

/// Deletes the company, or only deactivates it when any record still belongs to it.
pub async fn delete_company(state: &AppState, id: &ObjectId) -> Result<()> {
    let filter = doc! { "company_id": id };
    let has_dependents = state.customers.find_one(filter.clone()).await?.is_some()
        || state.payments.find_one(filter.clone()).await?.is_some()
        || state.accounts.find_one(filter.clone()).await?.is_some()
        || state.liabilities.find_one(filter.clone()).await?.is_some()
        || state.assets.find_one(filter.clone()).await?.is_some()
        || state.transactions.find_one(filter).await?.is_some();

    if has_dependents {
        state
            .companies
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "is_active": false,
                    "updated_at": DateTime::now()
                } },
            )
            .await?;
        return Ok(());
    }

    state.companies.delete_one(doc! { "_id": id }).await?;
    Ok(())
}

/// Fails unless the company exists and is active.
pub(super) async fn require_active_company(
    state: &AppState,
    company_id: &ObjectId,
) -> Result<Company> {
    let company = state
        .companies
        .find_one(doc! { "_id": company_id })
        .await?
        .context("company not found")?;
    if !company.is_active {
        bail!("company '{}' is inactive", company.name);
    }
    Ok(company)
}
