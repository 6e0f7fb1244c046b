// REE open data client - primary price source
use crate::application::errors::UpstreamError;
use crate::application::price_source::{FetchOutcome, PriceSource};
use crate::domain::calendar::is_future_day;
use crate::domain::price::PricePoint;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Deserialize;

const SOURCE_NAME: &str = "ree";
/// Indicator id of the PVPC tariff in the real-time market prices widget
const PVPC_INDICATOR_ID: &str = "1001";
const NO_DATA_DETAIL: &str = "There are no data for the selected filters.";

#[derive(Debug, Deserialize)]
struct ReeResponse {
    #[serde(default)]
    included: Vec<ReeIncluded>,
}

#[derive(Debug, Deserialize)]
struct ReeIncluded {
    id: String,
    attributes: ReeAttributes,
}

#[derive(Debug, Deserialize)]
struct ReeAttributes {
    #[serde(default)]
    values: Vec<ReeValue>,
}

#[derive(Debug, Deserialize)]
struct ReeValue {
    /// €/MWh
    value: f64,
    datetime: DateTime<FixedOffset>,
}

#[derive(Debug, Deserialize)]
struct ReeErrorResponse {
    #[serde(default)]
    errors: Vec<ReeError>,
}

#[derive(Debug, Deserialize)]
struct ReeError {
    #[serde(default)]
    detail: String,
}

#[derive(Debug, Clone)]
pub struct ReeClient {
    base_url: String,
    client: reqwest::Client,
}

impl ReeClient {
    pub fn new(base_url: String, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn day_url(&self, date: NaiveDate) -> String {
        let day = date.format("%Y-%m-%d");
        format!(
            "{}/en/datos/mercados/precios-mercados-tiempo-real?time_trunc=hour&start_date={}T00:00&end_date={}T23:59",
            self.base_url, day, day
        )
    }
}

#[async_trait]
impl PriceSource for ReeClient {
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

/// Map a REE HTTP response for `date` to prices, "synced" or an error.
fn interpret_response(
    status: u16,
    body: &str,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<FetchOutcome, UpstreamError> {
    let malformed = |reason: String| UpstreamError::Malformed {
        source_name: SOURCE_NAME.to_string(),
        date,
        reason,
    };

    match status {
        200..=299 => {
            let response: ReeResponse =
                serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;

            let values = response
                .included
                .into_iter()
                .find(|inc| inc.id == PVPC_INDICATOR_ID)
                .map(|inc| inc.attributes.values)
                .unwrap_or_default();
            if values.is_empty() {
                return Err(malformed("no PVPC values".to_string()));
            }

            Ok(FetchOutcome::Prices(
                values
                    .into_iter()
                    .map(|v| PricePoint::new(v.datetime.with_timezone(&Utc), v.value / 1000.0))
                    .collect(),
            ))
        }
        404 if is_future_day(date, now) => Ok(FetchOutcome::Synced),
        502 if is_future_day(date, now) => {
            let response: ReeErrorResponse =
                serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;
            match response.errors.first() {
                Some(error) if error.detail == NO_DATA_DETAIL => Ok(FetchOutcome::Synced),
                _ => Err(status_error(status)),
            }
        }
        _ => Err(status_error(status)),
    }
}

fn status_error(status: u16) -> UpstreamError {
    UpstreamError::Status {
        source_name: SOURCE_NAME.to_string(),
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const PRICES_BODY: &str = r#"{
        "data": {"type": "Precios mercado peninsular en tiempo real"},
        "included": [
            {"type": "PVPC (€/MWh)", "id": "1001", "groupId": null,
             "attributes": {"title": "PVPC", "values": [
                {"value": 123.45, "percentage": 1, "datetime": "2021-06-01T00:00:00.000+02:00"},
                {"value": 98.7, "percentage": 1, "datetime": "2021-06-01T01:00:00.000+02:00"}
             ]}},
            {"type": "Precio mercado spot (€/MWh)", "id": "600", "groupId": null,
             "attributes": {"title": "Spot", "values": [
                {"value": 70.0, "percentage": 1, "datetime": "2021-06-01T00:00:00.000+02:00"}
             ]}}
        ]
    }"#;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 6, 1).unwrap()
    }

    fn before(date: NaiveDate) -> DateTime<Utc> {
        crate::domain::calendar::start_of_day(date) - chrono::Duration::hours(3)
    }

    fn after(date: NaiveDate) -> DateTime<Utc> {
        crate::domain::calendar::start_of_day(date) + chrono::Duration::days(2)
    }

    #[test]
    fn test_day_url() {
        let client = ReeClient::new("https://apidatos.ree.es/".to_string(), reqwest::Client::new());
        assert_eq!(
            client.day_url(day()),
            "https://apidatos.ree.es/en/datos/mercados/precios-mercados-tiempo-real?time_trunc=hour&start_date=2021-06-01T00:00&end_date=2021-06-01T23:59"
        );
    }

    #[test]
    fn test_parse_pvpc_prices() {
        let outcome = interpret_response(200, PRICES_BODY, day(), after(day())).unwrap();
        let FetchOutcome::Prices(prices) = outcome else {
            panic!("expected prices");
        };

        assert_eq!(prices.len(), 2);
        assert_eq!(
            prices[0].date_time,
            Utc.with_ymd_and_hms(2021, 5, 31, 22, 0, 0).unwrap()
        );
        assert!((prices[0].price - 0.12345).abs() < 1e-9);
        assert!((prices[1].price - 0.0987).abs() < 1e-9);
    }

    #[test]
    fn test_missing_pvpc_indicator_is_malformed() {
        let body = r#"{"included": [{"id": "600", "attributes": {"values": []}}]}"#;
        let result = interpret_response(200, body, day(), after(day()));
        assert!(matches!(result, Err(UpstreamError::Malformed { .. })));
    }

    #[test]
    fn test_not_found_for_future_day_is_synced() {
        let result = interpret_response(404, "", day(), before(day()));
        assert_eq!(result.unwrap(), FetchOutcome::Synced);

        let result = interpret_response(404, "", day(), after(day()));
        assert!(matches!(result, Err(UpstreamError::Status { status: 404, .. })));
    }

    #[test]
    fn test_no_data_bad_gateway() {
        let body = r#"{"errors":[{"code":502,"status":"502","title":"Bad gateway","detail":"There are no data for the selected filters."}]}"#;
        assert_eq!(
            interpret_response(502, body, day(), before(day())).unwrap(),
            FetchOutcome::Synced
        );
        assert!(interpret_response(502, body, day(), after(day())).is_err());

        let other = r#"{"errors":[{"code":502,"detail":"Upstream down"}]}"#;
        assert!(matches!(
            interpret_response(502, other, day(), before(day())),
            Err(UpstreamError::Status { status: 502, .. })
        ));
    }

    #[test]
    fn test_server_error() {
        assert!(matches!(
            interpret_response(500, "oops", day(), before(day())),
            Err(UpstreamError::Status { status: 500, .. })
        ));
    }
}
