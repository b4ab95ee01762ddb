//! Wire types for requests and the algorithm registry.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a trace-generation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TraceRequest {
    /// `POST /trace`: interval-coverage only.
    Intervals { intervals: Vec<Value> },
    /// `POST /trace/unified`: any registered algorithm.
    Unified { algorithm: String, input: Value },
}

impl TraceRequest {
    /// Endpoint path relative to the base URL.
    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            Self::Intervals { .. } => "trace",
            Self::Unified { .. } => "trace/unified",
        }
    }

    #[must_use]
    pub fn unified(algorithm: impl Into<String>, input: Value) -> Self {
        Self::Unified {
            algorithm: algorithm.into(),
            input,
        }
    }

    /// Algorithm the request targets, when named.
    #[must_use]
    pub fn algorithm(&self) -> Option<&str> {
        match self {
            Self::Intervals { .. } => None,
            Self::Unified { algorithm, .. } => Some(algorithm),
        }
    }
}

/// One entry of `GET /algorithms`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlgorithmSummary {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub example_inputs: Vec<ExampleInput>,
}

impl AlgorithmSummary {
    /// Display name, falling back to the registry name.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    /// Request for this algorithm's first example input.
    #[must_use]
    pub fn example_request(&self) -> Option<TraceRequest> {
        self.example_inputs
            .first()
            .map(|ex| TraceRequest::unified(self.name.clone(), ex.input.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExampleInput {
    #[serde(default)]
    pub name: Option<String>,
    pub input: Value,
}

/// `GET /algorithms/{name}/info` response. `info` is markdown.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AlgorithmInfo {
    pub algorithm: String,
    pub info: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn request_bodies_match_endpoints() {
        let legacy = TraceRequest::Intervals {
            intervals: vec![json!({"id": 1, "start": 540, "end": 660})],
        };
        assert_eq!(legacy.path(), "trace");
        assert_eq!(
            serde_json::to_value(&legacy).unwrap(),
            json!({"intervals": [{"id": 1, "start": 540, "end": 660}]})
        );

        let unified = TraceRequest::unified("binary-search", json!({"array": [1, 3], "target": 3}));
        assert_eq!(unified.path(), "trace/unified");
        assert_eq!(
            serde_json::to_value(&unified).unwrap(),
            json!({"algorithm": "binary-search", "input": {"array": [1, 3], "target": 3}})
        );
    }

    #[test]
    fn registry_entries_tolerate_missing_fields() {
        let list: Vec<AlgorithmSummary> = serde_json::from_value(json!([
            {"name": "two-pointer", "example_inputs": [{"input": {"array": [1, 1, 2]}}]},
            {"name": "interval-coverage", "display_name": "Interval Coverage", "description": "d"}
        ]))
        .unwrap();
        assert_eq!(list[0].label(), "two-pointer");
        assert_eq!(list[1].label(), "Interval Coverage");
        assert_eq!(
            list[0].example_request(),
            Some(TraceRequest::unified("two-pointer", json!({"array": [1, 1, 2]})))
        );
        assert_eq!(list[1].example_request(), None);
    }
}
