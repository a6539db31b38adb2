// state module: AppState, initialization, and re-exports of submodules.

use anyhow::Result;
use mongodb::{Client, Collection};
use tracing::info;

use crate::{
    config::Config,
    models::{Account, Asset, Company, Customer, Liability, Payment, Transaction},
};

mod seed;
mod companies;
mod customers;
mod accounts;
mod liabilities;
mod assets;
mod transactions;

pub use companies::*;
pub use customers::*;
pub use accounts::*;
pub use liabilities::*;
pub use assets::*;
pub use transactions::*;

#[derive(Clone)]
pub struct AppState {
    pub companies: Collection<Company>,
    pub customers: Collection<Customer>,
    pub payments: Collection<Payment>,
    pub accounts: Collection<Account>,
    pub liabilities: Collection<Liability>,
    pub assets: Collection<Asset>,
    pub transactions: Collection<Transaction>,
    pub default_currency: String,
}

pub async fn init_state(config: &Config) -> Result<AppState> {
    let client = Client::with_uri_str(&config.mongodb_uri).await?;
    let db = client.database(&config.mongodb_db);

    seed::ensure_collections(&db).await?;

    // Only seed when the database is effectively empty (no companies).
    if seed::is_database_empty(&db).await? {
        let companies = seed::load_seed_companies(&config.seed_file)?;
        let ids = seed::seed_companies(&db, &companies, &config.default_currency).await?;
        seed::seed_primary_accounts(&db, &ids).await?;
        info!(companies = ids.len(), db = %config.mongodb_db, "seeded empty database");
    }

    Ok(AppState {
        companies: db.collection::<Company>("company"),
        customers: db.collection::<Customer>("customers"),
        payments: db.collection::<Payment>("payments"),
        accounts: db.collection::<Account>("accounts"),
        liabilities: db.collection::<Liability>("liabilities"),
        assets: db.collection::<Asset>("assets"),
        transactions: db.collection::<Transaction>("transactions"),
        default_currency: config.default_currency.clone(),
    })
}
