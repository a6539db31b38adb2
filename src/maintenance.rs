// maintenance.rs
// Date-driven asset status: decides the status from open maintenance/repair
// records and periodically sweeps stored assets.

use anyhow::Result;
use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, doc};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    models::{AssetStatus, MaintenanceKind, MaintenanceRecord},
    state::AppState,
};

/// Status an asset should have at `now`. Inactive and disposed assets keep
/// their status; an open repair wins over an open maintenance.
pub fn next_status(
    current: AssetStatus,
    records: &[MaintenanceRecord],
    now: DateTime,
) -> AssetStatus {
    if !current.is_date_driven() {
        return current;
    }

    let mut maintenance_open = false;
    for record in records.iter().filter(|record| record.is_open_at(now)) {
        match record.kind {
            MaintenanceKind::Repair => return AssetStatus::UnderRepair,
            MaintenanceKind::Maintenance => maintenance_open = true,
        }
    }

    if maintenance_open {
        AssetStatus::UnderMaintenance
    } else {
        AssetStatus::Active
    }
}

/// Recomputes the status of every date-driven asset across all companies.
/// Returns how many assets changed.
pub async fn refresh_asset_statuses(state: &AppState, now: DateTime) -> Result<usize> {
    let mut cursor = state
        .assets
        .find(doc! { "status": { "$in": [
            AssetStatus::Active.as_str(),
            AssetStatus::UnderMaintenance.as_str(),
            AssetStatus::UnderRepair.as_str(),
        ] } })
        .await?;

    let mut changed = 0;
    while let Some(asset) = cursor.try_next().await? {
        let next = next_status(asset.status, &asset.maintenance, now);
        if next == asset.status {
            continue;
        }
        let Some(id) = asset.id else {
            continue;
        };

        // Matching on the old status skips assets edited since they were read.
        let res = state
            .assets
            .update_one(
                doc! { "_id": id, "status": asset.status.as_str() },
                doc! { "$set": { "status": next.as_str(), "updated_at": now } },
            )
            .await?;
        if res.modified_count > 0 {
            debug!(
                asset = %id,
                from = asset.status.as_str(),
                to = next.as_str(),
                "asset status changed"
            );
            changed += 1;
        }
    }
    Ok(changed)
}

pub fn spawn_status_updater(state: Arc<AppState>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match refresh_asset_statuses(&state, DateTime::now()).await {
                Ok(0) => debug!("asset status sweep found nothing to change"),
                Ok(changed) => info!(changed, "asset statuses refreshed"),
                Err(err) => warn!(error = %err, "asset status sweep failed"),
            }
        }
    })
}
