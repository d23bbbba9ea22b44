//! Post-import description enhancement.
//!
//! A bounded number of recently created products get their descriptions
//! rewritten by an external text-generation call. Strictly best-effort: a
//! failed item is logged and keeps its original description, and the pass
//! never aborts the run.

use crate::catalog::model::Product;
use crate::catalog::store::{CatalogStore, StoreError};
use crate::util::env as env_util;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Products touched per enhancement pass when nothing else is configured.
pub const DEFAULT_ENHANCE_LIMIT: i64 = 10;

#[derive(Debug, Error)]
pub enum EnhancementError {
    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response shape: {0}")]
    Response(String),
    #[error("description generation is disabled")]
    Disabled,
}

/// One call: prompt in, generated text out. Any provider with that shape is
/// substitutable; the fallback-to-original policy lives in the caller.
#[async_trait]
pub trait DescriptionGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, EnhancementError>;
}

/// OpenAI chat-completions backend.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    base_url: String,
}

impl OpenAiGenerator {
    /// Env: OPENAI_API_KEY (required), OPENAI_MODEL, OPENAI_TIMEOUT_SECS,
    /// OPENAI_BASE_URL.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = env_util::env_req("OPENAI_API_KEY")?;
        let model =
            env_util::env_opt("OPENAI_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".to_string());
        let timeout_secs: u64 = env_util::env_parse("OPENAI_TIMEOUT_SECS", 30u64);
        let base_url = env_util::env_opt("OPENAI_BASE_URL")
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model,
            temperature: 0.5,
            base_url,
        })
    }
}

#[async_trait]
impl DescriptionGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, EnhancementError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let payload: serde_json::Value = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                EnhancementError::Response("missing choices[0].message.content".to_string())
            })
    }
}

/// Stand-in used when no generation backend is configured (e.g. the one-shot
/// CLI with --skip-enhance). Always fails, so descriptions are left alone.
pub struct DisabledGenerator;

#[async_trait]
impl DescriptionGenerator for DisabledGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, EnhancementError> {
        Err(EnhancementError::Disabled)
    }
}

pub fn build_prompt(product: &Product) -> String {
    let category = if product.category.secondary_category_name.is_empty() {
        product.category.primary_category_name.clone()
    } else {
        format!(
            "{} / {}",
            product.category.primary_category_name, product.category.secondary_category_name
        )
    };
    format!(
        "You are an expert in medical sales. Your specialty is medical consumables used by hospitals on a daily basis.\n\
         Your task is to enhance the description of a product based on the information provided.\n\
         Product name: {}\n\
         Product description: {}\n\
         Category: {}\n\
         New Description:",
        product.name, product.description, category
    )
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnhanceOutcome {
    pub enhanced: u64,
    pub failed: u64,
}

/// Rewrite descriptions of the `limit` most recently created products.
///
/// Generation failures are item-scoped and logged; a store failure (read or
/// write) is phase-scoped and propagates.
pub async fn enhance_recent(
    store: &dyn CatalogStore,
    generator: &dyn DescriptionGenerator,
    limit: i64,
) -> Result<EnhanceOutcome, StoreError> {
    let mut outcome = EnhanceOutcome::default();
    if limit <= 0 {
        return Ok(outcome);
    }

    let products = store.recent_products(limit).await?;
    debug!(candidates = products.len(), "starting enhancement pass");

    for product in &products {
        match generator.generate(&build_prompt(product)).await {
            Ok(text) => {
                store
                    .update_product_description(&product.product_id, &text)
                    .await?;
                outcome.enhanced += 1;
            }
            Err(err) => {
                warn!(
                    product_id = %product.product_id,
                    error = %err,
                    "description enhancement failed; keeping original"
                );
                outcome.failed += 1;
            }
        }
    }

    info!(
        enhanced = outcome.enhanced,
        failed = outcome.failed,
        "enhancement pass complete"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::store::CatalogStore;
    use crate::ids::testing::SeqIdSource;
    use crate::importer::testing::{row, MemoryStore};
    use crate::importer::transform::transform_row;

    struct FixedGenerator(&'static str);

    #[async_trait]
    impl DescriptionGenerator for FixedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, EnhancementError> {
            Ok(self.0.to_string())
        }
    }

    struct FlakyGenerator;

    #[async_trait]
    impl DescriptionGenerator for FlakyGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, EnhancementError> {
            if prompt.contains("Product P2") {
                Err(EnhancementError::Response("boom".to_string()))
            } else {
                Ok("better text".to_string())
            }
        }
    }

    async fn seed(store: &MemoryStore, ids: &SeqIdSource, product_id: &str) {
        let out = transform_row(store, ids, &row("V1", "Acme", product_id, "1.00", "1"))
            .await
            .expect("transforms");
        store
            .upsert_products(std::slice::from_ref(&out.product))
            .await
            .expect("flush");
    }

    #[tokio::test]
    async fn success_overwrites_stored_description() {
        let store = MemoryStore::default();
        let ids = SeqIdSource::default();
        seed(&store, &ids, "P1").await;

        let outcome = enhance_recent(&store, &FixedGenerator("shiny new copy"), 10)
            .await
            .expect("pass runs");

        assert_eq!(outcome.enhanced, 1);
        assert_eq!(outcome.failed, 0);
        assert_eq!(
            store.product("P1").expect("exists").description,
            "shiny new copy"
        );
    }

    #[tokio::test]
    async fn failure_keeps_original_and_does_not_stop_the_pass() {
        let store = MemoryStore::default();
        let ids = SeqIdSource::default();
        seed(&store, &ids, "P1").await;
        seed(&store, &ids, "P2").await;
        seed(&store, &ids, "P3").await;

        let outcome = enhance_recent(&store, &FlakyGenerator, 10)
            .await
            .expect("pass runs");

        assert_eq!(outcome.enhanced, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(
            store.product("P2").expect("exists").description,
            "A product."
        );
        assert_eq!(
            store.product("P1").expect("exists").description,
            "better text"
        );
    }

    #[tokio::test]
    async fn respects_the_recent_limit() {
        let store = MemoryStore::default();
        let ids = SeqIdSource::default();
        for n in 0..5 {
            seed(&store, &ids, &format!("P{n}")).await;
        }

        let outcome = enhance_recent(&store, &FixedGenerator("x"), 2)
            .await
            .expect("pass runs");
        assert_eq!(outcome.enhanced, 2);

        // Newest first: P4 and P3 touched, P0 untouched.
        assert_eq!(store.product("P4").expect("exists").description, "x");
        assert_eq!(store.product("P3").expect("exists").description, "x");
        assert_eq!(
            store.product("P0").expect("exists").description,
            "A product."
        );
    }

    #[tokio::test]
    async fn zero_limit_skips_the_pass() {
        let store = MemoryStore::default();
        let outcome = enhance_recent(&store, &DisabledGenerator, 0)
            .await
            .expect("pass runs");
        assert_eq!(outcome.enhanced, 0);
        assert_eq!(outcome.failed, 0);
    }

    #[test]
    fn prompt_includes_name_description_and_category() {
        let mut product = crate::catalog::model::Product {
            product_id: "P1".into(),
            name: "Nitrile Gloves".into(),
            description: "Box of 100.".into(),
            short_description: String::new(),
            vendor_id: "v".into(),
            manufacturer_id: 1,
            variants: vec![],
            storefront_price_visibility: "Visible".into(),
            availability: String::new(),
            images: vec![],
            category: crate::catalog::model::Category {
                primary_category_id: "C1".into(),
                primary_category_name: "Consumables".into(),
                secondary_category_id: "C2".into(),
                secondary_category_name: "Gloves".into(),
            },
            created_at: None,
            updated_at: None,
        };

        let prompt = build_prompt(&product);
        assert!(prompt.contains("Product name: Nitrile Gloves"));
        assert!(prompt.contains("Product description: Box of 100."));
        assert!(prompt.contains("Category: Consumables / Gloves"));

        product.category.secondary_category_name.clear();
        assert!(build_prompt(&product).contains("Category: Consumables\n"));
    }
}
