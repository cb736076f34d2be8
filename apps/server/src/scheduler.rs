//! Background refresh of an expiring dataset.
//!
//! Only runs when a maximum dataset age and a download URL are configured.

use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::main_lib::AppState;

/// Starts the dataset refresh scheduler if the provisioning policy expires.
///
/// Returns `false` when there is nothing to schedule.
pub fn start_dataset_refresh_scheduler(state: Arc<AppState>) -> bool {
    let Some(max_age) = state.provisioner.policy().max_age() else {
        return false;
    };
    if max_age.is_zero() {
        warn!("Dataset max age is zero; background refresh disabled");
        return false;
    }
    if !state.provisioner.has_download_url() {
        info!("No dataset download URL configured; background refresh disabled");
        return false;
    }

    tokio::spawn(async move {
        info!(
            "Dataset refresh scheduler started ({} min interval)",
            max_age.as_secs() / 60
        );

        // First tick is immediate and startup has already provisioned.
        let mut refresh_interval = interval(max_age);
        refresh_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        refresh_interval.tick().await;

        loop {
            refresh_interval.tick().await;
            run_scheduled_refresh(&state).await;
        }
    });
    true
}

async fn run_scheduled_refresh(state: &Arc<AppState>) {
    info!("Running scheduled dataset refresh...");
    let report = state.provisioner.refresh().await;
    match report.download_error {
        None => info!(
            "Scheduled dataset refresh completed: {} records",
            report.records
        ),
        Some(error) => warn!(
            "Scheduled dataset refresh failed, {} records stay in service: {}",
            report.records, error
        ),
    }
}
