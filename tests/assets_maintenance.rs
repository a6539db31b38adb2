#[path = "common/mod.rs"]
mod common;

use std::str::FromStr;

use bizledger::depreciation::DepreciationMethod;
use bizledger::maintenance::refresh_asset_statuses;
use bizledger::models::{
    AccountMedium, AccountType, AssetStatus, MaintenanceKind, MaintenanceRecord, ModeCategory,
    PartyKind, TransactionParty, TransactionType,
};
use bizledger::money::to_decimal;
use bizledger::state::{
    asset_depreciation_schedule, asset_valuation, complete_maintenance, create_account,
    create_asset, create_transaction, delete_asset, dispose_asset, get_asset_by_id,
    get_primary_account, list_assets, list_companies, schedule_maintenance, update_asset,
    AssetInput,
};
use bizledger::validation::{AssetFigures, TransactionDraft};
use mongodb::bson::{oid::ObjectId, DateTime};
use rust_decimal::Decimal;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

fn dec(text: &str) -> Decimal {
    Decimal::from_str(text).unwrap()
}

fn days_from_now(days: i64) -> DateTime {
    DateTime::from_millis(DateTime::now().timestamp_millis() + days * DAY_MS)
}

fn generator(method: DepreciationMethod) -> AssetInput {
    AssetInput {
        name: "Diesel generator".into(),
        asset_code: "AST-GEN-1".into(),
        category: "machinery".into(),
        // 2023-01-01T00:00:00Z
        purchase_date: DateTime::from_millis(1_672_531_200_000),
        depreciation_method: method,
        figures: AssetFigures {
            cost: dec("10000"),
            salvage_value: dec("1000"),
            useful_life_years: 5,
            depreciation_rate: None,
            total_units: None,
            units_used: None,
        },
        notes: None,
    }
}

#[tokio::test]
async fn asset_valuation_uses_stored_method() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();
    let company_id = ctx.company_id().await;

    let asset_id = create_asset(&state, &company_id, &generator(DepreciationMethod::StraightLine))
        .await
        .unwrap();
    assert_eq!(list_assets(&state, &company_id).await.unwrap().len(), 1);

    // 2025-01-01: 731 days after purchase.
    let as_of = DateTime::from_millis(1_735_689_600_000);
    let valuation = asset_valuation(&state, &asset_id, as_of).await.unwrap();
    assert_eq!(valuation.method, DepreciationMethod::StraightLine);
    assert_eq!(valuation.accumulated_depreciation, dec("3604.93"));
    assert_eq!(valuation.book_value, dec("6395.07"));

    let schedule = asset_depreciation_schedule(&state, &asset_id).await.unwrap();
    assert_eq!(schedule.len(), 5);
    assert_eq!(schedule[4].closing, dec("1000"));

    // Same code twice within a company is refused.
    assert!(create_asset(&state, &company_id, &generator(DepreciationMethod::StraightLine))
        .await
        .is_err());

    // Written-down value without a rate is refused up front.
    let mut wdv = generator(DepreciationMethod::WrittenDownValue);
    wdv.asset_code = "AST-GEN-2".into();
    assert!(create_asset(&state, &company_id, &wdv).await.is_err());
    wdv.figures.depreciation_rate = Some(dec("20"));
    assert!(create_asset(&state, &company_id, &wdv).await.is_ok());

    delete_asset(&state, &asset_id).await.unwrap();
    assert!(get_asset_by_id(&state, &asset_id).await.unwrap().is_none());

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn maintenance_windows_drive_asset_status() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();
    let company_id = ctx.company_id().await;
    let asset_id =
        create_asset(&state, &company_id, &generator(DepreciationMethod::SumOfYearsDigits))
            .await
            .unwrap();

    // Future window leaves the asset active for now.
    let status = schedule_maintenance(
        &state,
        &asset_id,
        MaintenanceRecord {
            kind: MaintenanceKind::Maintenance,
            start_date: days_from_now(2),
            end_date: Some(days_from_now(4)),
            description: "Annual service".into(),
            cost: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(status, AssetStatus::Active);

    // Open-ended repair starting now takes over.
    let status = schedule_maintenance(
        &state,
        &asset_id,
        MaintenanceRecord {
            kind: MaintenanceKind::Repair,
            start_date: days_from_now(-1),
            end_date: None,
            description: "Alternator failure".into(),
            cost: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(status, AssetStatus::UnderRepair);

    // Sweeping at a time inside the service window, with the repair closed.
    let status = complete_maintenance(&state, &asset_id, 1, days_from_now(0))
        .await
        .unwrap();
    assert_eq!(status, AssetStatus::Active);
    assert!(complete_maintenance(&state, &asset_id, 1, days_from_now(0)).await.is_err());

    let changed = refresh_asset_statuses(&state, days_from_now(3)).await.unwrap();
    assert_eq!(changed, 1);
    let asset = get_asset_by_id(&state, &asset_id).await.unwrap().unwrap();
    assert_eq!(asset.status, AssetStatus::UnderMaintenance);

    let changed = refresh_asset_statuses(&state, days_from_now(5)).await.unwrap();
    assert_eq!(changed, 1);
    let asset = get_asset_by_id(&state, &asset_id).await.unwrap().unwrap();
    assert_eq!(asset.status, AssetStatus::Active);

    // Disposed assets are left out of the sweep and refuse new maintenance.
    dispose_asset(&state, &asset_id).await.unwrap();
    assert_eq!(refresh_asset_statuses(&state, days_from_now(3)).await.unwrap(), 0);
    assert!(schedule_maintenance(
        &state,
        &asset_id,
        MaintenanceRecord {
            kind: MaintenanceKind::Maintenance,
            start_date: days_from_now(0),
            end_date: None,
            description: "Too late".into(),
            cost: None,
        },
    )
    .await
    .is_err());

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn asset_updates_keep_codes_unique_per_company() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();
    let company_id = ctx.company_id().await;

    let first = create_asset(&state, &company_id, &generator(DepreciationMethod::StraightLine))
        .await
        .unwrap();
    let mut forklift = generator(DepreciationMethod::StraightLine);
    forklift.name = "Forklift".into();
    forklift.asset_code = "AST-FLT-1".into();
    let second = create_asset(&state, &company_id, &forklift).await.unwrap();

    // Renaming onto a code already used in the company is refused.
    forklift.asset_code = "AST-GEN-1".into();
    assert!(update_asset(&state, &second, &forklift).await.is_err());
    let unchanged = get_asset_by_id(&state, &second).await.unwrap().unwrap();
    assert_eq!(unchanged.asset_code, "AST-FLT-1");

    // Keeping its own code while switching method and figures is fine.
    forklift.asset_code = " AST-FLT-1 ".into();
    forklift.depreciation_method = DepreciationMethod::DoubleDeclining;
    forklift.figures.cost = dec("12000");
    update_asset(&state, &second, &forklift).await.unwrap();
    let updated = get_asset_by_id(&state, &second).await.unwrap().unwrap();
    assert_eq!(updated.asset_code, "AST-FLT-1");
    assert_eq!(updated.depreciation_method, DepreciationMethod::DoubleDeclining);
    assert_eq!(to_decimal(&updated.cost).unwrap(), dec("12000"));

    // The same code is free in another company.
    let other_company = list_companies(&state).await.unwrap()[1].id.unwrap();
    assert!(create_asset(&state, &other_company, &generator(DepreciationMethod::StraightLine))
        .await
        .is_ok());

    // Useful life beyond the supported range never reaches the database.
    let mut ancient = generator(DepreciationMethod::SumOfYearsDigits);
    ancient.figures.useful_life_years = 20_000;
    assert!(update_asset(&state, &first, &ancient).await.is_err());

    assert!(update_asset(&state, &ObjectId::new(), &generator(DepreciationMethod::StraightLine))
        .await
        .is_err());

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn assets_named_by_transactions_cannot_be_deleted() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();
    let company_id = ctx.company_id().await;

    let asset_id = create_asset(&state, &company_id, &generator(DepreciationMethod::StraightLine))
        .await
        .unwrap();
    let cash = get_primary_account(&state, &company_id).await.unwrap().unwrap().id.unwrap();
    let supplier = create_account(
        &state,
        &company_id,
        "PAY-GEN",
        "Generator supplier",
        AccountType::Credit,
        AccountMedium::Cheque,
        false,
        Decimal::ZERO,
        None,
    )
    .await
    .unwrap();

    create_transaction(
        &state,
        &company_id,
        TransactionDraft {
            entered_by: ObjectId::new(),
            transaction_date: days_from_now(-1),
            transaction_type: TransactionType::Expense,
            transaction_sub_type: "maintenance".into(),
            transaction_mode_category: ModeCategory::Bank,
            transaction_mode: "cheque".into(),
            transaction_for: vec![TransactionParty {
                kind: PartyKind::Asset,
                ref_id: asset_id,
            }],
            amount: dec("850"),
            debit_account_id: supplier,
            credit_account_id: cash,
            narration: Some("Generator overhaul".into()),
        },
    )
    .await
    .unwrap();

    assert!(delete_asset(&state, &asset_id).await.is_err());
    assert!(get_asset_by_id(&state, &asset_id).await.unwrap().is_some());

    dispose_asset(&state, &asset_id).await.unwrap();
    let disposed = get_asset_by_id(&state, &asset_id).await.unwrap().unwrap();
    assert_eq!(disposed.status, AssetStatus::Disposed);

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn concurrent_scheduling_never_loses_records() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = ctx.state.clone();
    let company_id = ctx.company_id().await;
    let asset_id = create_asset(&state, &company_id, &generator(DepreciationMethod::StraightLine))
        .await
        .unwrap();

    let service = |description: &str| MaintenanceRecord {
        kind: MaintenanceKind::Maintenance,
        start_date: days_from_now(10),
        end_date: Some(days_from_now(12)),
        description: description.into(),
        cost: None,
    };
    let (a, b) = tokio::join!(
        schedule_maintenance(&state, &asset_id, service("oil change")),
        schedule_maintenance(&state, &asset_id, service("filter swap")),
    );
    let written = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert!(written >= 1);

    let asset = get_asset_by_id(&state, &asset_id).await.unwrap().unwrap();
    assert_eq!(asset.maintenance.len(), written);

    // A maintenance write after disposal never revives the asset.
    dispose_asset(&state, &asset_id).await.unwrap();
    assert!(schedule_maintenance(&state, &asset_id, service("late")).await.is_err());
    let asset = get_asset_by_id(&state, &asset_id).await.unwrap().unwrap();
    assert_eq!(asset.status, AssetStatus::Disposed);

    common::teardown(Some(ctx)).await;
}
