// Error taxonomy for the store, the upstream sources and the use cases
use chrono::NaiveDate;
use thiserror::Error;

/// Failure talking to the price store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("price store request failed: {0}")]
    Request(String),

    #[error("price store returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("failed to persist prices for {date}: {reason}")]
    Write { date: NaiveDate, reason: String },
}

/// Failure fetching prices from an upstream source.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to {source_name} failed: {reason}")]
    Request { source_name: String, reason: String },

    #[error("request to {source_name} timed out after {seconds}s")]
    Timeout { source_name: String, seconds: u64 },

    #[error("{source_name} responded with a non-successful status code: {status}")]
    Status { source_name: String, status: u16 },

    #[error("failed to parse {source_name} response for {date}: {reason}")]
    Malformed {
        source_name: String,
        date: NaiveDate,
        reason: String,
    },

    #[error("{source_name} has no prices for {date}")]
    NoPrices { source_name: String, date: NaiveDate },
}

/// Reasons a sync run aborts.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to read the latest persisted price: {0}")]
    Resume(#[source] StoreError),

    #[error("failed to fetch prices for {date}: {source}")]
    Upstream {
        date: NaiveDate,
        #[source]
        source: UpstreamError,
    },

    #[error("failed to persist prices for {date}: {source}")]
    Persistence {
        date: NaiveDate,
        #[source]
        source: StoreError,
    },

    #[error("sync cancelled before {date}")]
    Cancelled { date: NaiveDate },
}

/// Failure answering a reporting query.
#[derive(Debug, Error)]
pub enum PriceError {
    #[error("no prices found for {0}")]
    NoData(NaiveDate),

    #[error(transparent)]
    Store(#[from] StoreError),
}
