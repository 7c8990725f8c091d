//! Ticker → issuer (CIK) resolution.

use std::collections::HashMap;
use std::sync::Arc;

use pit_core::{IssuerId, PitError, Result, Ticker};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::client::RegulatorClient;

const COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

/// The regulator's published ticker→issuer registry, loaded once per
/// builder run and looked up read-only thereafter.
///
/// Unknown tickers are not an error here, the caller (the snapshot
/// builder) records them as coverage misses. The registry includes
/// historically delisted tickers, so a ticker absent from the map really
/// does mean "the regulator never assigned this ticker to an issuer",
/// not "this company is gone".
#[derive(Debug)]
pub struct CikMap {
    by_ticker: HashMap<Ticker, IssuerId>,
}

impl CikMap {
    /// Fetches and parses the full ticker→CIK registry.
    ///
    /// # Errors
    /// Propagates [`PitError::Network`]/[`PitError::Auth`]/[`PitError::NotFound`]
    /// from the underlying fetch, or [`PitError::Parse`] if the payload
    /// doesn't match the expected shape.
    #[instrument(skip(client))]
    pub async fn load(client: &RegulatorClient) -> Result<Self> {
        let body = client.get(COMPANY_TICKERS_URL).await?;
        let raw: HashMap<String, RawTickerEntry> = serde_json::from_slice(&body)
            .map_err(|e| PitError::Parse(format!("company_tickers.json: {e}")))?;

        let mut by_ticker = HashMap::with_capacity(raw.len());
        for entry in raw.into_values() {
            by_ticker.insert(Ticker::new(entry.ticker), IssuerId::new(entry.cik_str.to_string()));
        }

        debug!(count = by_ticker.len(), "loaded ticker registry");
        Ok(Self { by_ticker })
    }

    /// Builds a map directly from resolved entries, bypassing the network.
    /// Used by tests and by callers that already have a registry snapshot.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = (Ticker, IssuerId)>) -> Self {
        Self {
            by_ticker: entries.into_iter().collect(),
        }
    }

    /// Looks up a ticker's issuer id. Case-insensitive because [`Ticker`]
    /// normalizes to uppercase on construction.
    #[must_use]
    pub fn resolve(&self, ticker: &Ticker) -> Option<&IssuerId> {
        self.by_ticker.get(ticker)
    }

    /// Returns the shared map wrapped for cheap cloning into concurrent
    /// ticker pipelines.
    #[must_use]
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[derive(Debug, Deserialize)]
struct RawTickerEntry {
    cik_str: u64,
    ticker: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_is_case_insensitive() {
        let map = CikMap::from_entries([(Ticker::new("AAPL"), IssuerId::new("320193"))]);
        assert_eq!(
            map.resolve(&Ticker::new("aapl")).map(IssuerId::as_str),
            Some("0000320193")
        );
    }

    #[test]
    fn unknown_ticker_resolves_to_none() {
        let map = CikMap::from_entries([(Ticker::new("AAPL"), IssuerId::new("320193"))]);
        assert!(map.resolve(&Ticker::new("ZZZZ_DELISTED")).is_none());
    }
}
