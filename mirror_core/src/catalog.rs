// Catalog query (`GET /find_clothing`) and response decoding.
// A failed or unauthorised query is reported the same way as "no results".

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;
use crate::events::TriggerPayload;
use crate::types::TryOnCandidate;

/// Identifies one catalog request so late responses can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(u32);

impl QueryId {
    pub fn new(id: u32) -> Self {
        QueryId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn next(&self) -> QueryId {
        QueryId(self.0.wrapping_add(1))
    }
}

/// Filter for the candidate list.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    pub category: String,
    pub color: Option<String>,
    pub max_price: Option<f64>,
}

impl CatalogQuery {
    /// `None` when the trigger carries no usable category ("no matches").
    pub fn from_trigger(trigger: &TriggerPayload) -> Option<Self> {
        let category = non_empty(trigger.category.as_deref())?;
        Some(CatalogQuery {
            category,
            color: non_empty(trigger.color.as_deref()),
            max_price: trigger.max_price.filter(|p| p.is_finite() && *p > 0.0),
        })
    }

    /// Query string parameters, in a stable order.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![("category".to_string(), self.category.clone())];
        if let Some(color) = &self.color {
            params.push(("color".to_string(), color.clone()));
        }
        if let Some(max_price) = self.max_price {
            params.push(("max_price".to_string(), max_price.to_string()));
        }
        params
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ResponseBody {
    Items(Vec<TryOnCandidate>),
    Failure {
        #[serde(default)]
        error: Option<Value>,
        #[serde(default)]
        message: Option<String>,
    },
}

/// Decode a `/find_clothing` body. `{error}` / `{message}` bodies and
/// undecodable payloads become `CatalogQueryFailed`.
pub fn decode_response(body: &str) -> Result<Vec<TryOnCandidate>, EngineError> {
    let parsed: ResponseBody = serde_json::from_str(body)
        .map_err(|e| EngineError::CatalogQueryFailed(format!("unreadable response: {}", e)))?;

    match parsed {
        ResponseBody::Items(items) => Ok(items),
        ResponseBody::Failure { error, message } => {
            let reason = match (error, message) {
                (Some(Value::String(error)), _) => error,
                (_, Some(message)) => message,
                (Some(other), None) => other.to_string(),
                (None, None) => "unexpected response".to_string(),
            };
            Err(EngineError::CatalogQueryFailed(reason))
        }
    }
}

/// Picker card contents for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateCard {
    /// "Option 1", "Option 2", ... matching the spoken selection.
    pub label: String,
    pub title: String,
    pub price: String,
    pub thumbnail_url: String,
}

impl CandidateCard {
    pub fn for_list(items: &[TryOnCandidate], default_currency: &str) -> Vec<CandidateCard> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| CandidateCard {
                label: format!("Option {}", i + 1),
                title: item.title.clone(),
                price: format!(
                    "{:.2} {}",
                    item.price,
                    item.currency.as_deref().unwrap_or(default_currency)
                ),
                thumbnail_url: item.thumbnail_url.clone(),
            })
            .collect()
    }
}
