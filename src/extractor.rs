//! Entity extraction from free-text queries
//!
//! Sends the raw query to the language model and coerces whatever JSON
//! comes back into a typed `EntitySet`. Unparseable model output degrades
//! to the empty set; a missing credential aborts the request.

use crate::gemini::{first_json_object, LanguageModel};
use crate::models::{EntitySet, RequestContext};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

const EXTRACTION_SYSTEM: &str =
    "You are a financial entity extraction engine. Return only a JSON object.";

pub struct EntityExtractor {
    model: Arc<dyn LanguageModel>,
}

impl EntityExtractor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn extract(
        &self,
        query: &str,
        api_key: &str,
        ctx: &mut RequestContext,
    ) -> crate::Result<EntitySet> {
        let prompt = build_extraction_prompt(query);
        let raw = self.model.generate(api_key, EXTRACTION_SYSTEM, &prompt).await?;

        let entities = match first_json_object(&raw)
            .and_then(|snippet| serde_json::from_str::<Value>(&snippet).ok())
        {
            Some(value) => EntitySet::from_value(&value),
            None => {
                warn!("Entity extraction response was not valid JSON");
                ctx.log("Failed to parse entity extraction response; proceeding without entities");
                EntitySet::default()
            }
        };

        Ok(entities)
    }
}

fn build_extraction_prompt(query: &str) -> String {
    format!(
        r#"Extract the following entities from the user query for financial analysis:
- ticker (list or string)
- index_name
- sector
- industry
- region (list or string)
- asset_type
- market
- from_currency
- to_currency

Return a JSON object with these fields (use null if not found).
Query: "{}""#,
        query
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistantError;
    use crate::models::EntityValue;
    use async_trait::async_trait;

    struct CannedModel {
        reply: String,
    }

    #[async_trait]
    impl LanguageModel for CannedModel {
        async fn generate(
            &self,
            api_key: &str,
            _system_instruction: &str,
            _prompt: &str,
        ) -> crate::Result<String> {
            if api_key.is_empty() {
                return Err(AssistantError::MissingCredential("GEMINI_API_KEY"));
            }
            Ok(self.reply.clone())
        }
    }

    fn extractor(reply: &str) -> EntityExtractor {
        EntityExtractor::new(Arc::new(CannedModel {
            reply: reply.to_string(),
        }))
    }

    #[tokio::test]
    async fn test_extracts_entities_from_prose_wrapped_json() {
        let mut ctx = RequestContext::new();
        let entities = extractor(r#"Sure: {"ticker": "AAPL", "sector": null} done"#)
            .extract("How is Apple doing?", "key", &mut ctx)
            .await
            .unwrap();

        assert_eq!(entities.ticker, EntityValue::One("AAPL".to_string()));
        assert!(entities.sector.is_absent());
    }

    #[tokio::test]
    async fn test_malformed_response_degrades_to_empty_set() {
        for reply in ["no json at all", "{\"broken\": ", "[1, 2, 3]"] {
            let mut ctx = RequestContext::new();
            let entities = extractor(reply)
                .extract("anything", "key", &mut ctx)
                .await
                .unwrap();
            assert!(entities.is_empty(), "reply {:?} should yield empty set", reply);
        }
    }

    #[tokio::test]
    async fn test_missing_credential_is_fatal() {
        let mut ctx = RequestContext::new();
        let result = extractor("{}").extract("anything", "", &mut ctx).await;
        assert!(matches!(
            result,
            Err(AssistantError::MissingCredential("GEMINI_API_KEY"))
        ));
    }
}
