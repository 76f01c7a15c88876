use itertools::Itertools;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{error::AutomatonError, render::Renderer, Dfa, Validator};

/// The verdict of an automaton on one of its test strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputVerdict {
    /// The test string.
    pub input: String,
    /// Whether the automaton accepts it.
    pub accepted: bool,
}

/// The outcome of processing one automaton description.
///
/// A successful report carries the verdicts for all test strings (in the order of the
/// description) and, if the renderer produced one, the path of the diagram. A failed report
/// carries the kind and a description of the error. If only rendering failed, the verdicts
/// that were computed before are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    /// The identifier supplied by the caller, `None` if there was none.
    pub id: Option<String>,
    /// Whether the description was processed without any error.
    pub success: bool,
    /// Verdicts for the test strings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs_validation: Option<Vec<InputVerdict>>,
    /// Where the diagram was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagram_path: Option<String>,
    /// Stable name of the error, e.g. `IncompleteTransitionFunction`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Human readable description of the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl ItemReport {
    fn missing_id() -> Self {
        Self {
            id: None,
            success: false,
            inputs_validation: None,
            diagram_path: None,
            error_kind: Some("MissingId".to_string()),
            error_description: Some("no id was provided for the automaton".to_string()),
        }
    }

    fn failure(id: &str, error: &AutomatonError, verdicts: Option<Vec<InputVerdict>>) -> Self {
        Self {
            id: Some(id.to_string()),
            success: false,
            inputs_validation: verdicts,
            diagram_path: None,
            error_kind: Some(error.kind().to_string()),
            error_description: Some(error.to_string()),
        }
    }
}

/// Errors concerning the batch as a whole, as opposed to a single item of it.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The input is not JSON.
    #[error("request body must be JSON")]
    NotJson(#[source] serde_json::Error),
    /// The input is JSON but not a list.
    #[error("input must be a list of automata")]
    NotAList,
}

/// Parses a batch, which has to be a JSON array of automaton descriptions.
pub fn parse_batch(bytes: &[u8]) -> Result<Vec<Value>, BatchError> {
    match serde_json::from_slice::<Value>(bytes).map_err(BatchError::NotJson)? {
        Value::Array(items) => Ok(items),
        _ => Err(BatchError::NotAList),
    }
}

/// Whether an `id` value counts as not given at all: `null`, `false`, zero and empty
/// collections. Other values that are not strings are echoed and then fail the schema check.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

/// Validates a single description, runs all its test strings and renders its diagram.
/// Nothing that goes wrong here escapes the returned report.
pub fn process_item(item: &Value, renderer: &dyn Renderer) -> ItemReport {
    let id = match item.get("id") {
        Some(id) if is_blank(id) => None,
        Some(Value::String(id)) => Some(id.clone()),
        Some(other) => Some(other.to_string()),
        None => None,
    };
    let Some(id) = id else {
        warn!("skipping automaton without id");
        return ItemReport::missing_id();
    };
    let id = id.as_str();

    let config = match Validator.validate_value(item) {
        Ok(config) => config,
        Err(e) => {
            debug!("automaton {id} is invalid: {e}");
            return ItemReport::failure(id, &e, None);
        }
    };

    let dfa = Dfa::new(config);
    let verdicts = dfa
        .config()
        .test_strings()
        .iter()
        .map(|input| InputVerdict {
            input: input.clone(),
            accepted: dfa.accepts_str(input),
        })
        .collect_vec();

    match renderer.render(&dfa.diagram_description()) {
        Ok(path) => ItemReport {
            id: Some(id.to_string()),
            success: true,
            inputs_validation: Some(verdicts),
            diagram_path: path.map(|p| p.display().to_string()),
            error_kind: None,
            error_description: None,
        },
        Err(e) => {
            warn!("could not render diagram of {id}: {e}");
            ItemReport::failure(id, &AutomatonError::from(e), Some(verdicts))
        }
    }
}

/// Processes every description of `items` independently on the global thread pool. The
/// reports are returned in the order of `items` and a failure of one item has no influence on
/// any other.
pub fn process_batch(items: &[Value], renderer: &dyn Renderer) -> Vec<ItemReport> {
    let reports: Vec<ItemReport> = items
        .par_iter()
        .map(|item| process_item(item, renderer))
        .collect();
    info!(
        "processed {} automata, {} failed",
        reports.len(),
        reports.iter().filter(|r| !r.success).count()
    );
    reports
}
