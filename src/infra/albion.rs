//! Asynchronous client for the Albion Online Data Project price endpoint.
//!
//! - `GET stats/prices/{item}.json?locations=..&qualities=..`
//! - Timestamps arrive as naive ISO strings in UTC; `0001-01-01T00:00:00`
//!   marks a price the market never reported.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;
use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::format_description,
    OffsetDateTime, PrimitiveDateTime,
};

use crate::domain::{
    MarketLocation, Observation, PriceQuote, PriceSource, PriceSourceError, Quality,
};
use crate::util::version::user_agent;

pub const DEFAULT_BASE_URL: &str = "https://west.albion-online-data.com/api/v2/";

const NAIVE_TIMESTAMP: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
);

#[derive(Debug, Error)]
pub enum AlbionClientError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
}

impl From<AlbionClientError> for PriceSourceError {
    fn from(error: AlbionClientError) -> Self {
        match error {
            AlbionClientError::Status(StatusCode::TOO_MANY_REQUESTS) => Self::RateLimited,
            AlbionClientError::Http(ref inner)
                if inner.status() == Some(StatusCode::TOO_MANY_REQUESTS) =>
            {
                Self::RateLimited
            }
            other => Self::Transient(other.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct AlbionDataClient {
    http: Client,
    base_url: Url,
    locations: Vec<MarketLocation>,
    qualities: Vec<Quality>,
}

impl AlbionDataClient {
    pub fn new() -> Result<Self, AlbionClientError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base: &str) -> Result<Self, AlbionClientError> {
        let base_url = Url::parse(base)?;
        let http = Client::builder().user_agent(user_agent()).build()?;
        Ok(Self {
            http,
            base_url,
            locations: MarketLocation::ALL.to_vec(),
            qualities: Quality::ALL.to_vec(),
        })
    }

    /// Restricts the markets asked for; the default is every known market.
    pub fn with_locations(mut self, locations: impl IntoIterator<Item = MarketLocation>) -> Self {
        self.locations = locations.into_iter().collect();
        self
    }

    pub async fn get_prices(&self, item_id: &str) -> Result<Vec<PriceQuote>, AlbionClientError> {
        let url = self.prices_url(item_id)?;
        debug!("[prices] Requesting {url}");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AlbionClientError::Status(status));
        }

        let rows: Vec<MarketPriceDto> = response.json().await?;
        let total = rows.len();
        let quotes: Vec<PriceQuote> = rows
            .into_iter()
            .filter_map(MarketPriceDto::into_quote)
            .collect();
        debug!(
            "[prices] Parsed {} of {total} rows for {item_id}",
            quotes.len()
        );
        Ok(quotes)
    }

    fn prices_url(&self, item_id: &str) -> Result<Url, url::ParseError> {
        let mut url = self.base_url.join(&format!("stats/prices/{item_id}.json"))?;
        let locations = self
            .locations
            .iter()
            .map(MarketLocation::api_name)
            .collect::<Vec<_>>()
            .join(",");
        let qualities = self
            .qualities
            .iter()
            .map(|quality| quality.level().to_string())
            .collect::<Vec<_>>()
            .join(",");
        url.query_pairs_mut()
            .append_pair("locations", &locations)
            .append_pair("qualities", &qualities);
        Ok(url)
    }
}

#[async_trait]
impl PriceSource for AlbionDataClient {
    async fn fetch_quotes(&self, item_id: &str) -> Result<Vec<PriceQuote>, PriceSourceError> {
        self.get_prices(item_id).await.map_err(PriceSourceError::from)
    }
}

#[derive(Debug, Deserialize)]
struct MarketPriceDto {
    city: String,
    #[serde(default)]
    quality: u8,
    #[serde(default)]
    sell_price_min: u64,
    #[serde(default)]
    sell_price_min_date: Option<String>,
    #[serde(default)]
    sell_price_max: u64,
    #[serde(default)]
    sell_price_max_date: Option<String>,
    #[serde(default)]
    buy_price_min: u64,
    #[serde(default)]
    buy_price_min_date: Option<String>,
    #[serde(default)]
    buy_price_max: u64,
    #[serde(default)]
    buy_price_max_date: Option<String>,
}

impl MarketPriceDto {
    fn into_quote(self) -> Option<PriceQuote> {
        let Some(location) = MarketLocation::from_api_name(&self.city) else {
            debug!("[prices] Skipping unknown market {}", self.city);
            return None;
        };
        let quality = Quality::from_level(self.quality)?;

        Some(PriceQuote {
            location,
            quality,
            sell_price_min: observation(self.sell_price_min, self.sell_price_min_date.as_deref()),
            sell_price_max: observation(self.sell_price_max, self.sell_price_max_date.as_deref()),
            buy_price_min: observation(self.buy_price_min, self.buy_price_min_date.as_deref()),
            buy_price_max: observation(self.buy_price_max, self.buy_price_max_date.as_deref()),
        })
    }
}

fn observation(price: u64, raw_date: Option<&str>) -> Observation {
    match raw_date.and_then(parse_timestamp) {
        Some(observed_at) => Observation::new(price, observed_at),
        None => Observation::unknown(),
    }
}

/// `None` for missing, unparsable or placeholder (year 1) timestamps.
fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let parsed = PrimitiveDateTime::parse(raw, NAIVE_TIMESTAMP)
        .map(PrimitiveDateTime::assume_utc)
        .or_else(|_| OffsetDateTime::parse(raw, &Rfc3339))
        .ok()?;
    (parsed.year() > 1).then_some(parsed)
}
