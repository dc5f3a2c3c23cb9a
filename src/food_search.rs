use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::firestore::{number_field, string_field};
use crate::models::FoodProduct;

/// Open Food Facts product search.
#[derive(Clone)]
pub struct FoodSearchClient {
    client: Client,
    base_url: String,
    user_agent: String,
}

impl FoodSearchClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.food_api_url.clone(),
            user_agent: config.user_agent.clone(),
        }
    }

    /// Search products by free text. A blank query returns nothing without
    /// hitting the network.
    pub async fn search(&self, query: &str) -> Result<Vec<FoodProduct>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/cgi/search.pl", self.base_url);
        debug!(query, "Searching Open Food Facts");

        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[("json", "1"), ("search_terms", query)])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Food search failed: {} - {}", status, text));
        }

        let data: Value = resp.json().await?;
        let products = parse_search_response(&data);
        info!(query, count = products.len(), "Food search finished");
        Ok(products)
    }
}

/// Products usable for logging: named, with at least one nutrient value.
pub fn parse_search_response(data: &Value) -> Vec<FoodProduct> {
    data.get("products")
        .and_then(|v| v.as_array())
        .map(|products| products.iter().filter_map(parse_product).collect())
        .unwrap_or_default()
}

fn parse_product(doc: &Value) -> Option<FoodProduct> {
    let name = string_field(doc, "product_name")?.trim().to_string();
    if name.is_empty() {
        return None;
    }

    let nutriments = doc.get("nutriments")?;
    let product = FoodProduct {
        name,
        kcal_per_100g: number_field(nutriments, "energy-kcal_100g"),
        protein_per_100g: number_field(nutriments, "proteins_100g"),
        fat_per_100g: number_field(nutriments, "fat_100g"),
        carbs_per_100g: number_field(nutriments, "carbohydrates_100g"),
    };

    let has_nutrients = [
        product.kcal_per_100g,
        product.protein_per_100g,
        product.fat_per_100g,
        product.carbs_per_100g,
    ]
    .iter()
    .any(Option::is_some);

    has_nutrients.then_some(product)
}
