// ESIOS PVPC archive client - secondary price source
use crate::application::errors::UpstreamError;
use crate::application::price_source::{FetchOutcome, PriceSource};
use crate::domain::calendar::{is_future_day, local_hour, local_hour_instants};
use crate::domain::price::PricePoint;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

const SOURCE_NAME: &str = "esios";

#[derive(Debug, Deserialize)]
struct EsiosResponse {
    #[serde(rename = "PVPC", default)]
    pvpc: Vec<EsiosPvpc>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct EsiosPvpc {
    /// dd/mm/yyyy
    #[serde(rename = "Dia")]
    day: String,
    /// hh-hh, local hour range
    #[serde(rename = "Hora")]
    hour: String,
    /// €/MWh with a decimal comma
    #[serde(rename = "PCB")]
    pcb: String,
}

#[derive(Debug, Clone)]
pub struct EsiosClient {
    base_url: String,
    client: reqwest::Client,
}

impl EsiosClient {
    pub fn new(base_url: String, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn day_url(&self, date: NaiveDate) -> String {
        format!(
            "{}/archives/70/download_json?date={}",
            self.base_url,
            date.format("%Y-%m-%d")
        )
    }
}

#[async_trait]
impl PriceSource for EsiosClient {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch_day(&self, date: NaiveDate) -> Result<FetchOutcome, UpstreamError> {
        let request_error = |e: reqwest::Error| UpstreamError::Request {
            source_name: SOURCE_NAME.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(self.day_url(date))
            .send()
            .await
            .map_err(request_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(request_error)?;

        interpret_response(status, &body, date, Utc::now())
    }
}

fn interpret_response(
    status: u16,
    body: &str,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<FetchOutcome, UpstreamError> {
    if !(200..300).contains(&status) {
        return Err(UpstreamError::Status {
            source_name: SOURCE_NAME.to_string(),
            status,
        });
    }

    let malformed = |reason: String| UpstreamError::Malformed {
        source_name: SOURCE_NAME.to_string(),
        date,
        reason,
    };

    let response: EsiosResponse =
        serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;

    if !response.message.is_empty() {
        tracing::debug!("esios has no prices for {}: {}", date, response.message);
        if is_future_day(date, now) {
            return Ok(FetchOutcome::Synced);
        }
        return Err(UpstreamError::NoPrices {
            source_name: SOURCE_NAME.to_string(),
            date,
        });
    }
    if response.pvpc.is_empty() {
        return Err(malformed("empty PVPC list".to_string()));
    }

    let mut prices: Vec<PricePoint> = Vec::with_capacity(response.pvpc.len());
    for row in &response.pvpc {
        let previous = prices.last().map(|p| p.date_time);
        prices.push(parse_row(row, previous).map_err(&malformed)?);
    }

    Ok(FetchOutcome::Prices(prices))
}

/// Parse one row. `previous` is the instant of the row before it, used to tell the
/// two occurrences of the repeated autumn hour apart.
fn parse_row(row: &EsiosPvpc, previous: Option<DateTime<Utc>>) -> Result<PricePoint, String> {
    let price: f64 = row
        .pcb
        .replace(',', ".")
        .parse()
        .map_err(|e| format!("error converting price {:?}: {}", row.pcb, e))?;

    let day = NaiveDate::parse_from_str(&row.day, "%d/%m/%Y")
        .map_err(|e| format!("error converting date {:?}: {}", row.day, e))?;
    let hour: u32 = row
        .hour
        .get(..2)
        .ok_or_else(|| format!("hour range {:?} is too short", row.hour))?
        .parse()
        .map_err(|e| format!("error converting hour {:?}: {}", row.hour, e))?;
    let instants = local_hour_instants(day, hour);
    let date_time = instants
        .iter()
        .copied()
        .find(|at| previous.is_none_or(|prev| *at > prev))
        .or_else(|| local_hour(day, hour))
        .ok_or_else(|| format!("{} {:02}:00 is not a valid local time", day, hour))?;

    Ok(PricePoint::new(date_time, price / 1000.0))
}
