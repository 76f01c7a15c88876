use std::collections::hash_map::Entry;

use itertools::Itertools;
use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    config::{AutomatonConfig, RawAutomaton},
    error::{AutomatonResult, Endpoint, ValidationFailure},
    Map, Set,
};

/// Turns raw automaton descriptions into validated [`AutomatonConfig`]s.
///
/// Validation happens in two phases. The schema check ([`RawAutomaton::from_value`]) makes sure
/// that all fields are present with the right shape, after which the semantic checks run in a
/// fixed order:
/// 1. the initial state is present and non-empty,
/// 2. the initial state is declared,
/// 3. every acceptance state is declared,
/// 4. the alphabet is non-empty,
/// 5. the states are non-empty,
/// 6. every transition (in input order) has a declared source, a declared target and a
///    declared symbol,
/// 7. no two transitions leave the same state on the same symbol,
/// 8. every state has a transition on every symbol.
///
/// The first violation is reported and the remaining checks are skipped.
///
/// # Example
/// ```
/// use dfa_workbench::prelude::*;
///
/// let config = Validator
///     .validate_json(
///         r#"{
///             "id": "a-then-anything", "name": "",
///             "initial_state": "s", "acceptance_states": ["t"],
///             "alphabet": ["a", "b"], "states": ["s", "t", "x"],
///             "transitions": [
///                 {"from_state": "s", "symbol": "a", "to_state": "t"},
///                 {"from_state": "s", "symbol": "b", "to_state": "x"},
///                 {"from_state": "t", "symbol": "a", "to_state": "t"},
///                 {"from_state": "t", "symbol": "b", "to_state": "t"},
///                 {"from_state": "x", "symbol": "a", "to_state": "x"},
///                 {"from_state": "x", "symbol": "b", "to_state": "x"}
///             ],
///             "test_strings": []
///         }"#,
///     )
///     .unwrap();
/// assert_eq!(config.states(), ["s", "t", "x"]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    /// Runs the semantic checks on an already shape-checked description.
    pub fn validate(&self, raw: RawAutomaton) -> Result<AutomatonConfig, ValidationFailure> {
        let RawAutomaton {
            id,
            name,
            initial_state,
            acceptance_states,
            alphabet,
            states,
            transitions,
            test_strings,
        } = raw;
        trace!("validating automaton {id}");

        let states = states.into_iter().unique().collect_vec();
        let alphabet = alphabet.into_iter().unique().collect_vec();
        let acceptance_states = acceptance_states.into_iter().unique().collect_vec();

        let declared: Set<&str> = states.iter().map(String::as_str).collect();
        let symbols: Set<&str> = alphabet.iter().map(String::as_str).collect();

        let initial_state = match initial_state {
            Some(q) if !q.is_empty() => q,
            _ => return Err(ValidationFailure::MissingInitialState),
        };
        if !declared.contains(initial_state.as_str()) {
            return Err(ValidationFailure::InitialStateNotInStates {
                state: initial_state,
            });
        }
        if let Some(q) = acceptance_states
            .iter()
            .find(|q| !declared.contains(q.as_str()))
        {
            return Err(ValidationFailure::AcceptanceStatesNotInStates { state: q.clone() });
        }
        if alphabet.is_empty() {
            return Err(ValidationFailure::EmptyAlphabet);
        }
        if states.is_empty() {
            return Err(ValidationFailure::EmptyStates);
        }

        for (index, t) in transitions.iter().enumerate() {
            if !declared.contains(t.from_state.as_str()) {
                return Err(ValidationFailure::TransitionStateNotInStates {
                    index,
                    endpoint: Endpoint::From,
                    state: t.from_state.clone(),
                });
            }
            if !declared.contains(t.to_state.as_str()) {
                return Err(ValidationFailure::TransitionStateNotInStates {
                    index,
                    endpoint: Endpoint::To,
                    state: t.to_state.clone(),
                });
            }
            if !symbols.contains(t.symbol.as_str()) {
                return Err(ValidationFailure::TransitionSymbolNotInAlphabet {
                    index,
                    symbol: t.symbol.clone(),
                });
            }
        }

        let mut delta: Map<(&str, &str), &str> = Map::default();
        for (index, t) in transitions.iter().enumerate() {
            match delta.entry((t.from_state.as_str(), t.symbol.as_str())) {
                Entry::Occupied(_) => {
                    return Err(ValidationFailure::DuplicateTransition {
                        index,
                        state: t.from_state.clone(),
                        symbol: t.symbol.clone(),
                    })
                }
                Entry::Vacant(slot) => {
                    slot.insert(t.to_state.as_str());
                }
            }
        }

        if let Some((q, a)) = states
            .iter()
            .cartesian_product(alphabet.iter())
            .find(|(q, a)| !delta.contains_key(&(q.as_str(), a.as_str())))
        {
            return Err(ValidationFailure::IncompleteTransitionFunction {
                state: q.clone(),
                symbol: a.clone(),
            });
        }

        debug!(
            "automaton {id} is valid with {} states over {} symbols",
            states.len(),
            alphabet.len()
        );
        Ok(AutomatonConfig::new(
            id,
            name,
            states,
            alphabet,
            initial_state,
            acceptance_states,
            transitions.into_iter().map(Into::into).collect(),
            test_strings,
        ))
    }

    /// Checks the shape of `value` and validates it.
    pub fn validate_value(&self, value: &Value) -> AutomatonResult<AutomatonConfig> {
        let raw = RawAutomaton::from_value(value)?;
        Ok(self.validate(raw)?)
    }

    /// Parses `text` as JSON, checks its shape and validates it.
    pub fn validate_json(&self, text: &str) -> AutomatonResult<AutomatonConfig> {
        let raw = RawAutomaton::from_json(text)?;
        Ok(self.validate(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::{
        error::AutomatonError,
        tests::{even_binary, ends_in_ab},
    };

    fn failure(value: Value) -> ValidationFailure {
        match Validator.validate_value(&value) {
            Err(AutomatonError::Validation(failure)) => failure,
            other => panic!("expected a validation failure, got {other:?}"),
        }
    }

    #[test_log::test]
    fn accepts_valid_descriptions() {
        let config = Validator.validate_value(&even_binary()).unwrap();
        assert_eq!(config.id(), "automata_1");
        assert_eq!(config.initial_state(), "q0");
        assert_eq!(config.acceptance_states(), ["q0"]);
        assert_eq!(config.transitions().len(), 4);
        assert_eq!(config.test_strings().len(), 5);

        let config = Validator.validate_value(&ends_in_ab()).unwrap();
        assert_eq!(config.states(), ["s", "a", "ab"]);
        assert!(config.is_accepting("ab"));
        assert!(!config.is_accepting("a"));
    }

    #[test]
    fn duplicate_declarations_collapse() {
        let mut value = even_binary();
        value["states"] = json!(["q0", "q1", "q0"]);
        value["alphabet"] = json!(["1", "0", "1"]);
        value["acceptance_states"] = json!(["q0", "q0"]);
        let config = Validator.validate_value(&value).unwrap();
        assert_eq!(config.states(), ["q0", "q1"]);
        assert_eq!(config.alphabet(), ["1", "0"]);
        assert_eq!(config.acceptance_states(), ["q0"]);
    }

    #[test]
    fn empty_acceptance_states_and_all_accepting_are_fine() {
        let mut value = even_binary();
        value["acceptance_states"] = json!([]);
        assert!(Validator.validate_value(&value).is_ok());
        value["acceptance_states"] = json!(["q1", "q0"]);
        assert!(Validator.validate_value(&value).is_ok());
    }

    #[test]
    fn missing_initial_state() {
        let mut value = even_binary();
        value["initial_state"] = json!("");
        assert_eq!(failure(value), ValidationFailure::MissingInitialState);

        let mut value = even_binary();
        value.as_object_mut().unwrap().remove("initial_state");
        assert_eq!(failure(value), ValidationFailure::MissingInitialState);
    }

    #[test]
    fn initial_state_not_in_states() {
        let mut value = even_binary();
        value["initial_state"] = json!("q5");
        assert_eq!(
            failure(value),
            ValidationFailure::InitialStateNotInStates { state: "q5".into() }
        );
    }

    #[test]
    fn acceptance_states_not_in_states() {
        let mut value = even_binary();
        value["acceptance_states"] = json!(["q0", "q9"]);
        assert_eq!(
            failure(value),
            ValidationFailure::AcceptanceStatesNotInStates { state: "q9".into() }
        );
    }

    #[test]
    fn empty_alphabet() {
        let mut value = even_binary();
        value["alphabet"] = json!([]);
        assert_eq!(failure(value), ValidationFailure::EmptyAlphabet);
    }

    #[test]
    fn empty_states_trip_over_the_initial_state_first() {
        let mut value = even_binary();
        value["states"] = json!([]);
        assert_eq!(
            failure(value).kind(),
            "InitialStateNotInStates",
            "the initial state check runs before the emptiness check"
        );
    }

    #[test]
    fn transition_endpoints_must_be_declared() {
        let mut value = even_binary();
        value["transitions"][0]["from_state"] = json!("q2");
        assert_eq!(
            failure(value),
            ValidationFailure::TransitionStateNotInStates {
                index: 0,
                endpoint: Endpoint::From,
                state: "q2".into()
            }
        );

        let mut value = even_binary();
        value["transitions"][3]["to_state"] = json!("q2");
        assert_eq!(
            failure(value),
            ValidationFailure::TransitionStateNotInStates {
                index: 3,
                endpoint: Endpoint::To,
                state: "q2".into()
            }
        );
    }

    #[test]
    fn transition_symbols_must_be_declared() {
        let mut value = even_binary();
        value["transitions"][0]["symbol"] = json!("2");
        assert_eq!(
            failure(value),
            ValidationFailure::TransitionSymbolNotInAlphabet {
                index: 0,
                symbol: "2".into()
            }
        );
    }

    #[test]
    fn source_is_checked_before_target_and_symbol() {
        let mut value = even_binary();
        value["transitions"][1] = json!({"from_state": "x", "symbol": "z", "to_state": "y"});
        assert_eq!(
            failure(value),
            ValidationFailure::TransitionStateNotInStates {
                index: 1,
                endpoint: Endpoint::From,
                state: "x".into()
            }
        );
    }

    #[test]
    fn missing_transition_is_incomplete() {
        let mut value = even_binary();
        value["transitions"].as_array_mut().unwrap().remove(1);
        assert_eq!(
            failure(value),
            ValidationFailure::IncompleteTransitionFunction {
                state: "q0".into(),
                symbol: "1".into()
            }
        );

        let mut value = even_binary();
        value["transitions"] = json!([
            {"from_state": "q0", "symbol": "0", "to_state": "q0"},
            {"from_state": "q1", "symbol": "0", "to_state": "q0"}
        ]);
        assert_eq!(failure(value).kind(), "IncompleteTransitionFunction");
    }

    #[test]
    fn duplicate_transitions_are_rejected() {
        let mut value = even_binary();
        value["transitions"]
            .as_array_mut()
            .unwrap()
            .push(json!({"from_state": "q0", "symbol": "0", "to_state": "q1"}));
        assert_eq!(
            failure(value),
            ValidationFailure::DuplicateTransition {
                index: 4,
                state: "q0".into(),
                symbol: "0".into()
            }
        );

        // an exact copy is a duplicate as well
        let mut value = even_binary();
        value["transitions"]
            .as_array_mut()
            .unwrap()
            .push(json!({"from_state": "q1", "symbol": "1", "to_state": "q1"}));
        assert_eq!(failure(value).kind(), "DuplicateTransition");
    }

    #[test]
    fn duplicate_replacing_a_transition_is_not_hidden_by_totality() {
        let mut value = even_binary();
        value["transitions"][1] = json!({"from_state": "q0", "symbol": "0", "to_state": "q1"});
        assert_eq!(
            failure(value),
            ValidationFailure::DuplicateTransition {
                index: 1,
                state: "q0".into(),
                symbol: "0".into()
            }
        );
    }

    #[test]
    fn checks_fail_fast_in_order() {
        let mut value = even_binary();
        value["initial_state"] = json!("q5");
        value["transitions"][0]["to_state"] = json!("q7");
        value["alphabet"] = json!([]);
        assert_eq!(failure(value).kind(), "InitialStateNotInStates");

        let mut value = even_binary();
        value["acceptance_states"] = json!(["nope"]);
        value["alphabet"] = json!([]);
        assert_eq!(failure(value).kind(), "AcceptanceStatesNotInStates");

        let mut value = even_binary();
        value["transitions"][2]["symbol"] = json!("7");
        value["transitions"].as_array_mut().unwrap().remove(0);
        assert_eq!(failure(value).kind(), "TransitionSymbolNotInAlphabet");
    }

    #[test]
    fn malformed_input_is_not_a_validation_failure() {
        let mut value = even_binary();
        value.as_object_mut().unwrap().remove("id");
        assert!(matches!(
            Validator.validate_value(&value),
            Err(AutomatonError::Malformed(_))
        ));
    }

    #[test]
    fn validation_is_idempotent() {
        let first = Validator.validate_value(&even_binary()).unwrap();
        let second = Validator.validate_value(&even_binary()).unwrap();
        assert_eq!(first, second);

        let mut value = even_binary();
        value["initial_state"] = json!("q5");
        assert_eq!(failure(value.clone()), failure(value));
    }

    #[test]
    fn validate_json_text() {
        let text = serde_json::to_string(&ends_in_ab()).unwrap();
        assert_eq!(Validator.validate_json(&text).unwrap().id(), "ends-ab");
        assert_eq!(
            Validator.validate_json("not json").unwrap_err().kind(),
            "MalformedInput"
        );
    }
}
