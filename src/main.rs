// Main entry point - Dependency injection and a single sync run
mod application;
mod domain;
mod infrastructure;

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::application::errors::PriceError;
use crate::application::price_repository::PriceRepository;
use crate::application::price_service::{PriceService, UpcomingPeriod};
use crate::application::sync_service::{SyncOutcome, SyncService};
use crate::domain::calendar::{format_hour, local_day, next_day};
use crate::infrastructure::config::{load_config, AppConfig, StorageBackend};
use crate::infrastructure::esios_client::EsiosClient;
use crate::infrastructure::influx_repository::InfluxRepository;
use crate::infrastructure::memory_repository::MemoryRepository;
use crate::infrastructure::ree_client::ReeClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_config().context("Failed to load configuration")?;

    let http = reqwest::Client::builder()
        .timeout(config.sync.request_timeout())
        .build()
        .context("Failed to build HTTP client")?;

    // Create repository (infrastructure layer)
    let repository = build_repository(&config, http.clone())?;

    // Create services (application layer)
    let sync_service = SyncService::new(
        repository.clone(),
        Arc::new(ReeClient::new(config.sync.ree_base_url.clone(), http.clone())),
        Arc::new(EsiosClient::new(config.sync.esios_base_url.clone(), http)),
        config.sync.epoch,
        config.sync.request_timeout(),
    );
    let price_service = PriceService::new(repository);

    // Cancel the run on ctrl-c / SIGTERM
    let (cancel_tx, mut cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::warn!("Shutdown signal received, cancelling sync");
        let _ = cancel_tx.send(true);
    });

    let now = Utc::now();
    let end = now + chrono::Duration::days(1);
    match sync_service.sync(end, &mut cancel_rx).await? {
        SyncOutcome::Success { days_synced } => {
            tracing::info!("Synced successfully ({} new day(s))", days_synced);
        }
        SyncOutcome::PartialGap { date, days_synced } => {
            anyhow::bail!(
                "Failed to sync fully: no prices published for {} ({} day(s) synced)",
                date,
                days_synced
            );
        }
    }

    report_today(&price_service, now).await;
    Ok(())
}

fn build_repository(
    config: &AppConfig,
    http: reqwest::Client,
) -> anyhow::Result<Arc<dyn PriceRepository>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory price store, nothing will be persisted");
            Ok(Arc::new(MemoryRepository::new()))
        }
        StorageBackend::Influx => {
            let influx = config
                .influx
                .clone()
                .context("Missing [influx] configuration for the influx storage backend")?;
            Ok(Arc::new(InfluxRepository::new(
                influx.host,
                influx.token,
                influx.database,
                influx.retention_policy,
                influx.measurement,
                http,
            )))
        }
    }
}

async fn report_today(price_service: &PriceService, now: chrono::DateTime<Utc>) {
    let today = local_day(now);
    match price_service.daily_info(today).await {
        Ok(info) => tracing::info!(
            "{}: rating {}, average {:.4} €/kWh, thirty-day average {:.4} €/kWh, {} prices, {} cheap / {} expensive period(s)",
            today,
            info.day_rating,
            info.day_average,
            info.thirty_day_average,
            info.prices.len(),
            info.cheap_periods.len(),
            info.expensive_periods.len()
        ),
        Err(e) => {
            tracing::error!("Failed to build daily info for {}: {}", today, e);
            return;
        }
    }

    match price_service.price_at(now).await {
        Ok(Some(price)) => tracing::info!("Current price: {:.4} €/kWh", price.price),
        Ok(None) => tracing::warn!("No price stored for the current hour"),
        Err(e) => tracing::warn!("Failed to read the current price: {}", e),
    }

    match price_service.next_cheap_period(now).await {
        Ok(next) => tracing::info!("Next cheap period: {}", describe(next.as_ref())),
        Err(e) => tracing::warn!("No cheap period available: {}", e),
    }
    match price_service.next_expensive_period(now).await {
        Ok(next) => tracing::info!("Next expensive period: {}", describe(next.as_ref())),
        Err(e) => tracing::warn!("No expensive period available: {}", e),
    }

    // Tomorrow is usually published in the afternoon
    let tomorrow = next_day(today);
    match (
        price_service.day_rating(tomorrow).await,
        price_service.day_average(tomorrow).await,
    ) {
        (Ok(rating), Ok(average)) => {
            tracing::info!("{}: rating {}, average {:.4} €/kWh", tomorrow, rating, average)
        }
        (Err(PriceError::NoData(_)), _) | (_, Err(PriceError::NoData(_))) => {
            tracing::info!("{}: prices not published yet", tomorrow)
        }
        (Err(e), _) | (_, Err(e)) => tracing::warn!("Failed to rate {}: {}", tomorrow, e),
    }

    if let Ok(averages) = price_service.daily_averages(today, 7).await {
        for day in averages {
            tracing::debug!("{} average {:.4} €/kWh", day.date, day.average);
        }
    }
}

fn describe(next: Option<&UpcomingPeriod>) -> String {
    let Some(next) = next else {
        return "none left today".to_string();
    };
    match (next.period.start(), next.period.points().last()) {
        (Some(start), Some(last)) => format!(
            "{} - {}{}",
            format_hour(start),
            format_hour(last.end_time()),
            if next.started { " (in progress)" } else { "" }
        ),
        _ => "none left today".to_string(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
