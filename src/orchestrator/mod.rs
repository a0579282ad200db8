//! Sequential orchestration pipeline
//!
//! RECEIVE → EXTRACT → FETCH FAN-OUT → NEWS → SYNTHESIZE → SPEECH
//!
//! Strictly linear: no retries, no back-edges, no cancellation. A step
//! that degrades (empty fetch, empty entities, parse failure) feeds its
//! degraded output straight into the next step. Only entity extraction
//! and synthesis can abort a request (missing model credential or model
//! transport failure).

use crate::error::FetchError;
use crate::extractor::EntityExtractor;
use crate::gemini::LanguageModel;
use crate::market::MarketData;
use crate::models::{
    AssistantRequest, EntityValue, OrchestrationResult, RequestContext,
};
use crate::news::NewsAggregator;
use crate::synthesizer::AnswerSynthesizer;
use crate::voice::VoiceGateway;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

/// Narrative used when the synthesis object carries no response field.
const FALLBACK_RESPONSE: &str = "Here are the latest insights based on available data and news.";

pub struct Orchestrator {
    extractor: EntityExtractor,
    market: Arc<dyn MarketData>,
    news: NewsAggregator,
    synthesizer: AnswerSynthesizer,
    voice: Arc<dyn VoiceGateway>,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        market: Arc<dyn MarketData>,
        voice: Arc<dyn VoiceGateway>,
    ) -> Self {
        Self {
            extractor: EntityExtractor::new(model.clone()),
            market: market.clone(),
            news: NewsAggregator::new(market),
            synthesizer: AnswerSynthesizer::new(model),
            voice,
        }
    }

    /// Transcribe an uploaded voice query. Fail-soft: an empty transcript
    /// flows into the pipeline as the query.
    pub async fn transcribe(&self, api_key: &str, audio: Vec<u8>) -> String {
        self.voice.speech_to_text(api_key, audio).await
    }

    /// Uniform degrade adapter: any fetch error becomes an empty mapping
    /// plus exactly one log entry describing the failure.
    fn absorb(
        ctx: &mut RequestContext,
        label: &str,
        result: Result<Map<String, Value>, FetchError>,
    ) -> Value {
        match result {
            Ok(fields) => {
                ctx.log(format!("Fetched {}", label));
                Value::Object(fields)
            }
            Err(e) => {
                ctx.log(format!("Failed to fetch {}: {}", label, e));
                Value::Object(Map::new())
            }
        }
    }

    /// Run the full pipeline for one request.
    pub async fn run(&self, request: AssistantRequest) -> crate::Result<OrchestrationResult> {
        let mut ctx = RequestContext::new();
        ctx.log(format!("Received query: {}", request.query));

        // === EXTRACT ===
        let entities = self
            .extractor
            .extract(&request.query, &request.gemini_api_key, &mut ctx)
            .await?;
        ctx.log(format!(
            "Entities extracted: {}",
            serde_json::to_string(&entities)?
        ));

        // === FETCH FAN-OUT (sequential) ===
        let mut data = Map::new();

        match &entities.ticker {
            EntityValue::Absent => {}
            EntityValue::One(symbol) => {
                let fetched = Self::absorb(
                    &mut ctx,
                    &format!("market data for {}", symbol),
                    self.market.fetch_ticker(symbol).await,
                );
                data.insert("ticker_data".to_string(), fetched);
            }
            EntityValue::Many(symbols) => {
                let mut per_ticker = Map::new();
                for symbol in symbols {
                    let fetched = Self::absorb(
                        &mut ctx,
                        &format!("market data for {}", symbol),
                        self.market.fetch_ticker(symbol).await,
                    );
                    per_ticker.insert(symbol.clone(), fetched);
                }
                data.insert("ticker_data".to_string(), Value::Object(per_ticker));
            }
        }

        if let Some(sector) = entities.sector.primary() {
            let fetched = Self::absorb(
                &mut ctx,
                &format!("sector data for {}", sector),
                self.market.fetch_sector(sector).await,
            );
            data.insert("sector_data".to_string(), fetched);
        }

        if let Some(industry) = entities.industry.primary() {
            let fetched = Self::absorb(
                &mut ctx,
                &format!("industry data for {}", industry),
                self.market.fetch_industry(industry).await,
            );
            data.insert("industry_data".to_string(), fetched);
        }

        match &entities.region {
            EntityValue::Absent => {}
            EntityValue::One(region) => {
                let fetched = Self::absorb(
                    &mut ctx,
                    &format!("market summary for {}", region),
                    self.market.fetch_market_summary(region).await,
                );
                data.insert("market_summary".to_string(), fetched);
            }
            EntityValue::Many(regions) => {
                for region in regions {
                    let fetched = Self::absorb(
                        &mut ctx,
                        &format!("market summary for {}", region),
                        self.market.fetch_market_summary(region).await,
                    );
                    data.insert(format!("market_{}", region), fetched);
                }
            }
        }

        // === NEWS (unconditional) ===
        let articles = self
            .news
            .aggregate(&request.query, &entities, &mut ctx)
            .await;
        data.insert("news".to_string(), Value::Array(articles));

        // === SYNTHESIZE ===
        let outcome = self
            .synthesizer
            .synthesize(&request.query, &entities, &data, &request.gemini_api_key)
            .await?;
        ctx.logs.extend(outcome.logs);

        let text = outcome
            .response
            .unwrap_or_else(|| FALLBACK_RESPONSE.to_string());

        // === SPEECH ===
        let audio_bytes = self
            .voice
            .text_to_speech(&request.elevenlabs_api_key, &request.voice_id, &text)
            .await;
        if audio_bytes.is_some() {
            ctx.log("Audio generated successfully.");
        } else {
            ctx.log("Audio generation failed.");
        }

        info!(
            request_id = %ctx.request_id,
            sources = data.len(),
            "Orchestration complete"
        );

        Ok(OrchestrationResult {
            text,
            audio_bytes,
            logs: ctx.logs,
            plan: outcome.plan,
            data,
        })
    }
}
