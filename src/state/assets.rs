use anyhow::{Context, Result, bail};
use futures::stream::TryStreamExt;
use mongodb::bson::{self, DateTime, doc, oid::ObjectId};
use rust_decimal::Decimal;

use crate::{
    depreciation::{
        DepreciationInput, DepreciationMethod, ScheduleRow, accumulated_depreciation,
        annual_schedule, elapsed_years,
    },
    maintenance::next_status,
    models::{Asset, AssetStatus, MaintenanceRecord},
    money::{opt_to_decimal, opt_to_decimal128, to_decimal, to_decimal128},
    validation::{AssetFigures, validate_asset, validate_maintenance_window},
};

use super::{
    AppState, companies::require_active_company, transactions::is_referenced_by_transaction,
};

/// Editable fields of an asset.
#[derive(Debug, Clone)]
pub struct AssetInput {
    pub name: String,
    pub asset_code: String,
    pub category: String,
    pub purchase_date: DateTime,
    pub depreciation_method: DepreciationMethod,
    pub figures: AssetFigures,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetValuation {
    pub method: DepreciationMethod,
    pub elapsed_years: Decimal,
    pub accumulated_depreciation: Decimal,
    pub book_value: Decimal,
}

fn depreciation_input(figures: &AssetFigures) -> DepreciationInput {
    DepreciationInput {
        cost: figures.cost,
        salvage_value: figures.salvage_value,
        useful_life_years: figures.useful_life_years,
        rate_percent: figures.depreciation_rate,
        total_units: figures.total_units,
        units_used: figures.units_used,
    }
}

fn stored_figures(asset: &Asset) -> Result<AssetFigures> {
    Ok(AssetFigures {
        cost: to_decimal(&asset.cost)?,
        salvage_value: to_decimal(&asset.salvage_value)?,
        useful_life_years: asset.useful_life_years,
        depreciation_rate: opt_to_decimal(asset.depreciation_rate.as_ref())?,
        total_units: opt_to_decimal(asset.total_units.as_ref())?,
        units_used: opt_to_decimal(asset.units_used.as_ref())?,
    })
}

// Field checks plus a zero-time run of the method, so a method missing its
// rate or units is refused up front.
fn check_input(input: &AssetInput) -> Result<()> {
    validate_asset(&input.name, &input.asset_code, &input.figures)?;
    accumulated_depreciation(
        input.depreciation_method,
        &depreciation_input(&input.figures),
        Decimal::ZERO,
    )?;
    Ok(())
}

pub async fn list_assets(state: &AppState, company_id: &ObjectId) -> Result<Vec<Asset>> {
    let mut cursor = state
        .assets
        .find(doc! { "company_id": company_id })
        .sort(doc! { "asset_code": 1 })
        .await?;
    let mut items = Vec::new();
    while let Some(asset) = cursor.try_next().await? {
        items.push(asset);
    }
    Ok(items)
}

pub async fn get_asset_by_id(state: &AppState, id: &ObjectId) -> Result<Option<Asset>> {
    state
        .assets
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

async fn ensure_code_free(
    state: &AppState,
    company_id: &ObjectId,
    code: &str,
    except: Option<&ObjectId>,
) -> Result<()> {
    let mut filter = doc! { "company_id": company_id, "asset_code": code };
    if let Some(id) = except {
        filter.insert("_id", doc! { "$ne": id });
    }
    if state.assets.find_one(filter).await?.is_some() {
        bail!("asset code '{code}' is already in use");
    }
    Ok(())
}

pub async fn create_asset(
    state: &AppState,
    company_id: &ObjectId,
    input: &AssetInput,
) -> Result<ObjectId> {
    check_input(input)?;
    require_active_company(state, company_id).await?;

    let code = input.asset_code.trim();
    ensure_code_free(state, company_id, code, None).await?;

    let figures = &input.figures;
    let res = state
        .assets
        .insert_one(Asset {
            id: None,
            company_id: *company_id,
            name: input.name.trim().to_string(),
            asset_code: code.to_string(),
            category: input.category.trim().to_string(),
            purchase_date: input.purchase_date,
            cost: to_decimal128(figures.cost)?,
            salvage_value: to_decimal128(figures.salvage_value)?,
            useful_life_years: figures.useful_life_years,
            depreciation_method: input.depreciation_method,
            depreciation_rate: opt_to_decimal128(figures.depreciation_rate)?,
            total_units: opt_to_decimal128(figures.total_units)?,
            units_used: opt_to_decimal128(figures.units_used)?,
            status: AssetStatus::Active,
            maintenance: Vec::new(),
            created_at: Some(DateTime::now()),
            updated_at: None,
            notes: input.notes.clone(),
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("asset insert missing _id")
}

pub async fn update_asset(state: &AppState, id: &ObjectId, input: &AssetInput) -> Result<()> {
    check_input(input)?;
    let existing = get_asset_by_id(state, id).await?.context("asset not found")?;
    let code = input.asset_code.trim();
    ensure_code_free(state, &existing.company_id, code, Some(id)).await?;
    let figures = &input.figures;

    let res = state
        .assets
        .update_one(
            doc! { "_id": id },
            doc! { "$set": {
                "name": input.name.trim(),
                "asset_code": code,
                "category": input.category.trim(),
                "purchase_date": input.purchase_date,
                "cost": to_decimal128(figures.cost)?,
                "salvage_value": to_decimal128(figures.salvage_value)?,
                "useful_life_years": i64::from(figures.useful_life_years),
                "depreciation_method": input.depreciation_method.as_str(),
                "depreciation_rate": opt_to_decimal128(figures.depreciation_rate)?,
                "total_units": opt_to_decimal128(figures.total_units)?,
                "units_used": opt_to_decimal128(figures.units_used)?,
                "notes": input.notes.clone(),
                "updated_at": DateTime::now(),
            } },
        )
        .await?;
    if res.matched_count == 0 {
        bail!("asset not found");
    }
    Ok(())
}

/// Disposed assets are kept for history; the status sweep no longer touches them.
pub async fn dispose_asset(state: &AppState, id: &ObjectId) -> Result<()> {
    let res = state
        .assets
        .update_one(
            doc! { "_id": id },
            doc! { "$set": {
                "status": AssetStatus::Disposed.as_str(),
                "updated_at": DateTime::now(),
            } },
        )
        .await?;
    if res.matched_count == 0 {
        bail!("asset not found");
    }
    Ok(())
}

pub async fn delete_asset(state: &AppState, id: &ObjectId) -> Result<()> {
    if is_referenced_by_transaction(state, id).await? {
        bail!("asset is referenced by transactions; dispose it instead of deleting");
    }
    state.assets.delete_one(doc! { "_id": id }).await?;
    Ok(())
}

// Writes the new records only if the status and records are still the ones
// that were read, so a concurrent dispose or schedule is never overwritten.
async fn store_maintenance(
    state: &AppState,
    asset: &Asset,
    records: &[MaintenanceRecord],
    now: DateTime,
) -> Result<AssetStatus> {
    let id = asset.id.context("asset without _id")?;
    let status = next_status(asset.status, records, now);
    let res = state
        .assets
        .update_one(
            doc! {
                "_id": id,
                "status": asset.status.as_str(),
                "maintenance": bson::to_bson(&asset.maintenance)?,
            },
            doc! { "$set": {
                "maintenance": bson::to_bson(records)?,
                "status": status.as_str(),
                "updated_at": now,
            } },
        )
        .await?;
    if res.matched_count == 0 {
        bail!("asset {id} changed while its maintenance was being updated; retry");
    }
    Ok(status)
}

/// Appends a maintenance or repair record and returns the asset's resulting status.
pub async fn schedule_maintenance(
    state: &AppState,
    id: &ObjectId,
    record: MaintenanceRecord,
) -> Result<AssetStatus> {
    validate_maintenance_window(record.start_date, record.end_date)?;
    if let Some(cost) = &record.cost {
        if to_decimal(cost)? < Decimal::ZERO {
            bail!("maintenance cost must be non-negative");
        }
    }

    let asset = get_asset_by_id(state, id).await?.context("asset not found")?;
    if !asset.status.is_date_driven() {
        bail!("asset is {}; maintenance cannot be scheduled", asset.status.as_str());
    }

    let mut records = asset.maintenance.clone();
    records.push(record);
    store_maintenance(state, &asset, &records, DateTime::now()).await
}

/// Closes the open-ended record at `index` and returns the asset's resulting status.
pub async fn complete_maintenance(
    state: &AppState,
    id: &ObjectId,
    index: usize,
    end_date: DateTime,
) -> Result<AssetStatus> {
    let asset = get_asset_by_id(state, id).await?.context("asset not found")?;
    let mut records = asset.maintenance.clone();
    let record = records
        .get_mut(index)
        .context("maintenance record not found")?;
    if record.end_date.is_some() {
        bail!("maintenance record is already closed");
    }
    validate_maintenance_window(record.start_date, Some(end_date))?;
    record.end_date = Some(end_date);

    store_maintenance(state, &asset, &records, DateTime::now()).await
}

pub async fn asset_valuation(
    state: &AppState,
    id: &ObjectId,
    as_of: DateTime,
) -> Result<AssetValuation> {
    let asset = get_asset_by_id(state, id).await?.context("asset not found")?;
    let input = depreciation_input(&stored_figures(&asset)?);
    let elapsed = elapsed_years(
        asset.purchase_date.to_chrono().date_naive(),
        as_of.to_chrono().date_naive(),
    );
    let accumulated = accumulated_depreciation(asset.depreciation_method, &input, elapsed)?;

    Ok(AssetValuation {
        method: asset.depreciation_method,
        elapsed_years: elapsed.round_dp(4),
        accumulated_depreciation: accumulated,
        book_value: (input.cost - accumulated).round_dp(2),
    })
}

pub async fn asset_depreciation_schedule(
    state: &AppState,
    id: &ObjectId,
) -> Result<Vec<ScheduleRow>> {
    let asset = get_asset_by_id(state, id).await?.context("asset not found")?;
    let input = depreciation_input(&stored_figures(&asset)?);
    Ok(annual_schedule(asset.depreciation_method, &input)?)
}
