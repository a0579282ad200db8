//! News aggregation across query terms
//!
//! Builds the candidate term set from the raw query and the extracted
//! entities, deduplicates by exact string, then fetches up to a fixed
//! count of articles per term. Duplicate headlines across distinct terms
//! are expected and not filtered.

use crate::market::{MarketData, NEWS_COUNT};
use crate::models::{EntitySet, RequestContext};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

pub struct NewsAggregator {
    market: Arc<dyn MarketData>,
}

impl NewsAggregator {
    pub fn new(market: Arc<dyn MarketData>) -> Self {
        Self { market }
    }

    /// Candidate search terms: the query itself, then ticker(s), sector,
    /// industry, region(s), deduplicated by exact match.
    pub fn collect_terms(query: &str, entities: &EntitySet) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut terms = Vec::new();

        let candidates = std::iter::once(query)
            .chain(entities.ticker.terms())
            .chain(entities.sector.terms())
            .chain(entities.industry.terms())
            .chain(entities.region.terms());

        for term in candidates {
            if seen.insert(term.to_string()) {
                terms.push(term.to_string());
            }
        }

        terms
    }

    /// One fetch per unique term, sequential; failed fetches log and
    /// contribute nothing.
    pub async fn aggregate(
        &self,
        query: &str,
        entities: &EntitySet,
        ctx: &mut RequestContext,
    ) -> Vec<Value> {
        let mut articles = Vec::new();

        for term in Self::collect_terms(query, entities) {
            match self.market.fetch_news(&term, NEWS_COUNT).await {
                Ok(items) => {
                    ctx.log(format!("Fetched news for '{}'", term));
                    articles.extend(items);
                }
                Err(e) => {
                    ctx.log(format!("Failed to fetch news for '{}': {}", term, e));
                }
            }
        }

        articles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::models::EntityValue;
    use async_trait::async_trait;
    use serde_json::{json, Map};
    use std::sync::Mutex;

    struct RecordingMarket {
        news_calls: Mutex<Vec<String>>,
    }

    impl RecordingMarket {
        fn new() -> Self {
            Self {
                news_calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MarketData for RecordingMarket {
        async fn fetch_ticker(&self, _symbol: &str) -> Result<Map<String, Value>, FetchError> {
            Ok(Map::new())
        }
        async fn fetch_sector(&self, _sector: &str) -> Result<Map<String, Value>, FetchError> {
            Ok(Map::new())
        }
        async fn fetch_industry(&self, _industry: &str) -> Result<Map<String, Value>, FetchError> {
            Ok(Map::new())
        }
        async fn fetch_market_summary(
            &self,
            _region: &str,
        ) -> Result<Map<String, Value>, FetchError> {
            Ok(Map::new())
        }
        async fn fetch_news(&self, term: &str, _count: usize) -> Result<Vec<Value>, FetchError> {
            self.news_calls.lock().unwrap().push(term.to_string());
            if term == "broken" {
                return Err(FetchError::Payload("simulated".to_string()));
            }
            Ok(vec![json!({"headline": format!("story about {}", term)})])
        }
    }

    #[test]
    fn test_terms_deduplicate_ticker_equal_to_query() {
        let entities = EntitySet {
            ticker: EntityValue::One("AAPL".to_string()),
            ..Default::default()
        };
        let terms = NewsAggregator::collect_terms("AAPL", &entities);
        assert_eq!(terms, vec!["AAPL".to_string()]);
    }

    #[test]
    fn test_terms_cover_all_entity_fields() {
        let entities = EntitySet {
            ticker: EntityValue::Many(vec!["AAPL".to_string(), "MSFT".to_string()]),
            sector: EntityValue::One("technology".to_string()),
            industry: EntityValue::One("semiconductors".to_string()),
            region: EntityValue::Many(vec!["US".to_string(), "EU".to_string()]),
            ..Default::default()
        };
        let terms = NewsAggregator::collect_terms("chip stocks", &entities);
        assert_eq!(
            terms,
            vec![
                "chip stocks",
                "AAPL",
                "MSFT",
                "technology",
                "semiconductors",
                "US",
                "EU"
            ]
        );
    }

    #[tokio::test]
    async fn test_aggregate_issues_one_fetch_per_unique_term() {
        let market = Arc::new(RecordingMarket::new());
        let aggregator = NewsAggregator::new(market.clone());
        let entities = EntitySet {
            ticker: EntityValue::One("AAPL".to_string()),
            ..Default::default()
        };

        let mut ctx = RequestContext::new();
        let articles = aggregator.aggregate("AAPL", &entities, &mut ctx).await;

        assert_eq!(*market.news_calls.lock().unwrap(), vec!["AAPL".to_string()]);
        assert_eq!(articles.len(), 1);
    }

    #[tokio::test]
    async fn test_aggregate_concatenates_and_survives_failures() {
        let market = Arc::new(RecordingMarket::new());
        let aggregator = NewsAggregator::new(market.clone());
        let entities = EntitySet {
            ticker: EntityValue::Many(vec!["AAPL".to_string(), "broken".to_string()]),
            ..Default::default()
        };

        let mut ctx = RequestContext::new();
        let articles = aggregator.aggregate("market update", &entities, &mut ctx).await;

        // "market update" and "AAPL" contribute one article each; "broken" logs a failure.
        assert_eq!(articles.len(), 2);
        assert_eq!(
            ctx.logs
                .iter()
                .filter(|l| l.contains("Failed to fetch news for 'broken'"))
                .count(),
            1
        );
    }
}
