// InfluxDB repository implementation
use crate::application::errors::StoreError;
use crate::application::price_repository::{PriceRepository, StoreResult};
use crate::domain::calendar::start_of_hour;
use crate::domain::price::PricePoint;
use crate::infrastructure::config::prepare_query;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Deserialize;
use std::collections::HashMap;

const LATEST_QUERY: &str = "SELECT LAST(price) FROM \"${measurement}\"";
const RANGE_QUERY: &str = "SELECT price FROM \"${measurement}\" WHERE time >= '${start}' AND time < '${end}' ORDER BY time ASC";
const HOUR_QUERY: &str = "SELECT price FROM \"${measurement}\" WHERE time = '${start}'";
const MEAN_QUERY: &str =
    "SELECT MEAN(price) FROM \"${measurement}\" WHERE time >= '${start}' AND time < '${end}'";

#[derive(Debug, Clone)]
pub struct InfluxRepository {
    host: String,
    token: String,
    database: String,
    retention_policy: String,
    measurement: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResponse {
    results: Vec<InfluxQLResult>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResult {
    #[serde(default)]
    series: Option<Vec<InfluxQLSeries>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLSeries {
    #[allow(dead_code)]
    name: String,
    columns: Vec<String>,
    values: Vec<Vec<serde_json::Value>>,
}

impl InfluxRepository {
    pub fn new(
        host: String,
        token: String,
        database: String,
        retention_policy: String,
        measurement: String,
        client: reqwest::Client,
    ) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            token,
            database,
            retention_policy,
            measurement,
            client,
        }
    }

    fn build_query_url(&self, query: &str) -> String {
        let encoded_query = urlencoding::encode(query);
        format!(
            "{}/query?db={}&rp={}&q={}",
            self.host, self.database, self.retention_policy, encoded_query
        )
    }

    fn build_write_url(&self) -> String {
        format!(
            "{}/write?db={}&rp={}&precision=s",
            self.host, self.database, self.retention_policy
        )
    }

    fn render(
        &self,
        template: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> String {
        let mut vars = HashMap::new();
        vars.insert("measurement".to_string(), self.measurement.clone());
        if let Some(start) = start {
            vars.insert("start".to_string(), rfc3339(start));
        }
        if let Some(end) = end {
            vars.insert("end".to_string(), rfc3339(end));
        }
        prepare_query(template, &vars)
    }

    async fn execute_query(&self, query: &str) -> StoreResult<InfluxQLResponse> {
        let url = self.build_query_url(query);
        tracing::debug!("Executing InfluxQL query: {}", query);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                StoreError::Request(format!("failed to send request to InfluxDB: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Request(format!(
                "InfluxDB query failed with status {}: {}",
                status, body
            )));
        }

        let data = response
            .json::<InfluxQLResponse>()
            .await
            .map_err(|e| {
                StoreError::InvalidResponse(format!("failed to parse InfluxDB response: {}", e))
            })?;

        // Check for errors in the response
        if let Some(result) = data.results.first() {
            if let Some(error) = &result.error {
                return Err(StoreError::InvalidResponse(format!("InfluxDB query error: {}", error)));
            }
        }

        Ok(data)
    }
}

#[async_trait]
impl PriceRepository for InfluxRepository {
    async fn latest_price(&self) -> StoreResult<Option<PricePoint>> {
        let response = self.execute_query(&self.render(LATEST_QUERY, None, None)).await?;
        Ok(parse_points(&response, "last")?.into_iter().next())
    }

    async fn save_prices(&self, date: NaiveDate, prices: &[PricePoint]) -> StoreResult<()> {
        // The whole day goes out in a single /write request. A failed request is
        // reported for the day and the next sync run rewrites it from scratch.
        let body = to_line_protocol(&self.measurement, prices);

        let response = self
            .client
            .post(self.build_write_url())
            .header("Authorization", format!("Token {}", self.token))
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::Write {
                date,
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Write {
                date,
                reason: format!("status {}: {}", status, body),
            });
        }

        tracing::debug!("Wrote {} prices for {} to InfluxDB", prices.len(), date);
        Ok(())
    }

    async fn prices_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<PricePoint>> {
        let query = self.render(RANGE_QUERY, Some(start), Some(end));
        let response = self.execute_query(&query).await?;
        parse_points(&response, "price")
    }

    async fn price_at(&self, at: DateTime<Utc>) -> StoreResult<Option<PricePoint>> {
        let query = self.render(HOUR_QUERY, Some(start_of_hour(at)), None);
        let response = self.execute_query(&query).await?;
        Ok(parse_points(&response, "price")?.into_iter().next())
    }

    async fn average_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Option<f64>> {
        let query = self.render(MEAN_QUERY, Some(start), Some(end));
        let response = self.execute_query(&query).await?;
        Ok(parse_points(&response, "mean")?.first().map(|p| p.price))
    }
}

fn rfc3339(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Read `(time, value_column)` rows from the first result.
fn parse_points(response: &InfluxQLResponse, value_column: &str) -> StoreResult<Vec<PricePoint>> {
    let mut points = Vec::new();
    let Some(series) = response.results.first().and_then(|r| r.series.as_ref()) else {
        return Ok(points);
    };

    for s in series {
        let time_idx = s.columns.iter().position(|c| c == "time").unwrap_or(0);
        let value_idx = s.columns.iter().position(|c| c == value_column).unwrap_or(1);

        for value_row in &s.values {
            let (Some(time), Some(value)) = (value_row.get(time_idx), value_row.get(value_idx))
            else {
                continue;
            };
            // MEAN over an empty window comes back as a null row
            let Some(price) = value.as_f64() else {
                continue;
            };
            let time_str = time.as_str().ok_or_else(|| {
                StoreError::InvalidResponse(format!("unexpected time value {}", time))
            })?;
            let date_time = DateTime::parse_from_rfc3339(time_str)
                .map_err(|e| StoreError::InvalidResponse(format!("bad time {}: {}", time_str, e)))?;
            points.push(PricePoint::new(date_time.with_timezone(&Utc), price));
        }
    }

    Ok(points)
}

fn to_line_protocol(measurement: &str, prices: &[PricePoint]) -> String {
    prices
        .iter()
        .map(|p| format!("{} price={} {}", measurement, p.price, p.date_time.timestamp()))
        .collect::<Vec<_>>()
        .join("\n")
}
