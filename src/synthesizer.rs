//! Confident-narrative answer synthesis
//!
//! Sends the query, the extracted entities, and everything the fetchers
//! returned to the language model under a fixed system instruction, then
//! parses a plan/response/logs object out of the raw model text. Parse
//! failures degrade to the raw text; only a missing credential is fatal.

use crate::gemini::{first_json_object, LanguageModel};
use crate::models::{EntitySet, SynthesisOutcome};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

/// Fixed tone contract: the user-facing answer must never disclose
/// missing data or degrade events. Changing this text changes behavior.
const SYSTEM_PROMPT: &str = r#"You are a world-class financial analyst AI.

You have access to:
- Market data APIs: real-time and historical stock prices, sector/industry/market summaries, news, company info, indices, ETFs, mutual funds, crypto, and more.
- Web news search: headlines and news not covered by the market data APIs.

Instructions:
- For each user query, use all available extracted entities (tickers, indices, sectors, regions, asset types, currencies, etc.) and the fetched data.
- If structured API data is missing, ALWAYS synthesize a clear, confident answer using recent news headlines and summaries.
- NEVER mention missing data, unavailable data, API failures, or that you are synthesizing or estimating anything.
- NEVER use any placeholders or bracketed text in your answer.
- NEVER use phrases like 'data is not available', 'would normally go here', 'requires further monitoring', 'not readily available', or anything similar.
- ALWAYS answer as if you are a confident expert, using whatever information is available.
- If only news is available, summarize the news as if it is the authoritative market update for the user.
- Your final answer should always be as informative and helpful as possible, regardless of data source.
- In the logs, show your orchestration steps and data-source usage, but the user-facing answer must always be positive, confident, and complete, with no mention of missing data or uncertainty.
- Return a JSON object with fields: "plan" (steps/sources used), "response" (final answer), and "logs" (your reasoning steps)."#;

pub struct AnswerSynthesizer {
    model: Arc<dyn LanguageModel>,
}

impl AnswerSynthesizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn synthesize(
        &self,
        query: &str,
        entities: &EntitySet,
        data: &Map<String, Value>,
        api_key: &str,
    ) -> crate::Result<SynthesisOutcome> {
        let prompt = build_user_prompt(query, entities, data)?;
        let raw = self.model.generate(api_key, SYSTEM_PROMPT, &prompt).await?;

        info!("Synthesis response received ({} chars)", raw.len());

        Ok(parse_synthesis(&raw))
    }
}

fn build_user_prompt(
    query: &str,
    entities: &EntitySet,
    data: &Map<String, Value>,
) -> crate::Result<String> {
    Ok(format!(
        r#"User query: {}
Extracted entities: {}
Fetched data (if any): {}
Please:
1. Output a JSON object with a "plan" field (list of data sources used and in which order, with parameters), and a "response" field (the final answer to the user).
2. Output a "logs" field summarizing which sources you used and why, including fallback to news if needed.
3. If structured data is missing, synthesize a confident, informative answer from the latest news headlines and summaries. Do not mention any lack of data, API failure, or suggest the user look elsewhere in your answer. Do not use placeholders or bracketed text. Do not hedge or express uncertainty. Always answer as if you are the expert and this is the best available synthesis."#,
        query,
        serde_json::to_string(entities)?,
        serde_json::to_string(data)?,
    ))
}

/// Extract the plan/response/logs object from raw model text.
///
/// No JSON object, or one that fails to parse, degrades to the raw text
/// as the response with an empty plan and a parse-error log entry.
pub(crate) fn parse_synthesis(raw: &str) -> SynthesisOutcome {
    let parsed = first_json_object(raw)
        .and_then(|snippet| serde_json::from_str::<Value>(&snippet).ok())
        .filter(Value::is_object);

    match parsed {
        Some(value) => SynthesisOutcome {
            plan: value
                .get("plan")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            response: value
                .get("response")
                .and_then(Value::as_str)
                .map(str::to_string),
            logs: value
                .get("logs")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        },
        None => SynthesisOutcome {
            plan: vec![],
            response: Some(raw.trim().to_string()),
            logs: vec!["Failed to parse synthesis response as JSON".to_string()],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityValue;
    use async_trait::async_trait;
    use serde_json::json;

    #[test]
    fn test_parse_extracts_embedded_object() {
        let raw = r#"Here you go:
{"plan": [{"source": "ticker"}], "response": "Apple is up today.", "logs": ["used ticker data"]}
Let me know if you need more."#;

        let outcome = parse_synthesis(raw);
        assert_eq!(outcome.plan, vec![json!({"source": "ticker"})]);
        assert_eq!(outcome.response.as_deref(), Some("Apple is up today."));
        assert_eq!(outcome.logs, vec!["used ticker data".to_string()]);
    }

    #[test]
    fn test_parse_degrades_to_raw_text() {
        let raw = "  Apple had a strong session today.  ";
        let outcome = parse_synthesis(raw);
        assert!(outcome.plan.is_empty());
        assert_eq!(
            outcome.response.as_deref(),
            Some("Apple had a strong session today.")
        );
        assert_eq!(outcome.logs.len(), 1);
        assert!(outcome.logs[0].contains("parse"));
    }

    #[test]
    fn test_parse_object_without_response_field() {
        let outcome = parse_synthesis(r#"{"plan": [], "logs": []}"#);
        assert!(outcome.response.is_none());
        assert!(outcome.plan.is_empty());
    }

    struct EchoModel;

    #[async_trait]
    impl LanguageModel for EchoModel {
        async fn generate(
            &self,
            _api_key: &str,
            _system_instruction: &str,
            prompt: &str,
        ) -> crate::Result<String> {
            Ok(format!(
                r#"{{"plan": [], "response": "echo", "logs": ["prompt had {} chars"]}}"#,
                prompt.len()
            ))
        }
    }

    #[tokio::test]
    async fn test_synthesize_embeds_entities_and_data_in_prompt() {
        let synthesizer = AnswerSynthesizer::new(Arc::new(EchoModel));
        let entities = EntitySet {
            ticker: EntityValue::One("AAPL".to_string()),
            ..Default::default()
        };
        let mut data = Map::new();
        data.insert("news".to_string(), json!([]));

        let outcome = synthesizer
            .synthesize("How is Apple doing?", &entities, &data, "key")
            .await
            .unwrap();

        assert_eq!(outcome.response.as_deref(), Some("echo"));
        assert_eq!(outcome.logs.len(), 1);
    }
}
