use anyhow::{Context, Result};
use mongodb::{
    Database, IndexModel,
    bson::{DateTime, Document, doc, oid::ObjectId},
    options::IndexOptions,
};
use rust_decimal::Decimal;
use slug::slugify;
use std::{collections::HashSet, fs};
use tracing::{debug, warn};

use crate::{
    models::{Account, AccountMedium, AccountType, Company, SeedCompany},
    money::to_decimal128,
};

const COLLECTIONS: [&str; 7] = [
    "company",
    "customers",
    "payments",
    "accounts",
    "liabilities",
    "assets",
    "transactions",
];

// (collection, keys, index name) for every uniqueness rule.
fn unique_indexes() -> [(&'static str, Document, &'static str); 4] {
    [
        ("company", doc! { "slug": 1 }, "slug_unique"),
        ("accounts", doc! { "account_id": 1 }, "account_id_unique"),
        ("transactions", doc! { "transaction_id": 1 }, "transaction_id_unique"),
        (
            "assets",
            doc! { "company_id": 1, "asset_code": 1 },
            "company_asset_code_unique",
        ),
    ]
}

const PRIMARY_CASH_ACCOUNT: &str = "CASH-001";

pub(super) async fn is_database_empty(db: &Database) -> Result<bool> {
    let count = db
        .collection::<Company>("company")
        .estimated_document_count()
        .await?;
    Ok(count == 0)
}

pub(super) async fn ensure_collections(db: &Database) -> Result<()> {
    let existing = db.list_collection_names().await?;
    for name in COLLECTIONS {
        if !existing.iter().any(|found| found == name) {
            db.create_collection(name).await?;
            debug!(collection = name, "created collection");
        }
    }

    for (collection, keys, name) in unique_indexes() {
        db.collection::<Document>(collection)
            .create_index(
                IndexModel::builder()
                    .keys(keys)
                    .options(
                        IndexOptions::builder()
                            .unique(true)
                            .name(name.to_string())
                            .build(),
                    )
                    .build(),
            )
            .await
            .with_context(|| format!("creating unique index {name} on {collection}"))?;
    }
    Ok(())
}

/// Reads the seed file; a missing file yields one default company.
pub(super) fn load_seed_companies(path: &str) -> Result<Vec<SeedCompany>> {
    let companies = match fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str::<Vec<SeedCompany>>(&contents)
            .with_context(|| format!("invalid seed file {path}"))?,
        Err(err) => {
            warn!(path, error = %err, "seed file not readable, using default company");
            Vec::new()
        }
    };

    if companies.is_empty() {
        return Ok(vec![SeedCompany {
            name: "Default Company".to_string(),
            default_currency: None,
        }]);
    }

    // Same name twice would collide on slug.
    let mut seen = HashSet::new();
    Ok(companies
        .into_iter()
        .filter(|company| seen.insert(slugify(&company.name)))
        .collect())
}

pub(super) async fn seed_companies(
    db: &Database,
    companies: &[SeedCompany],
    fallback_currency: &str,
) -> Result<Vec<ObjectId>> {
    let companies_coll = db.collection::<Company>("company");
    let mut ids = Vec::with_capacity(companies.len());
    for company in companies {
        let currency = company
            .default_currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(fallback_currency)
            .to_uppercase();

        let result = companies_coll
            .insert_one(Company {
                id: None,
                name: company.name.clone(),
                slug: slugify(&company.name),
                default_currency: currency,
                is_active: true,
                created_at: Some(DateTime::now()),
                updated_at: None,
                notes: None,
            })
            .await?;
        let id = result
            .inserted_id
            .as_object_id()
            .context("company insert missing _id")?;
        ids.push(id);
    }
    Ok(ids)
}

/// Every seeded company starts with an empty primary cash account.
pub(super) async fn seed_primary_accounts(
    db: &Database,
    company_ids: &[ObjectId],
) -> Result<()> {
    let accounts = db.collection::<Account>("accounts");
    for (idx, company_id) in company_ids.iter().enumerate() {
        // account_id is unique across companies.
        let code = if idx == 0 {
            PRIMARY_CASH_ACCOUNT.to_string()
        } else {
            format!("{PRIMARY_CASH_ACCOUNT}-{}", company_id.to_hex())
        };
        accounts
            .insert_one(Account {
                id: None,
                company_id: *company_id,
                account_id: code,
                name: "Cash in hand".to_string(),
                account_type: AccountType::Debit,
                medium: AccountMedium::Cash,
                is_primary: true,
                balance: to_decimal128(Decimal::ZERO)?,
                created_at: Some(DateTime::now()),
                updated_at: None,
                notes: None,
            })
            .await?;
    }
    Ok(())
}
