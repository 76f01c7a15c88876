use serde::Serialize;
use serde_json::Value;

use crate::error::MalformedInput;

/// A transition as it appears in a raw description, before anything about it is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawTransition {
    /// Name of the source state.
    pub from_state: String,
    /// The symbol that is read.
    pub symbol: String,
    /// Name of the target state.
    pub to_state: String,
}

/// The loosely typed intermediate form of an automaton description. Producing it only checks
/// the shape of the input: every required field is present and has the right type. None of the
/// relations between the fields are checked, that is the job of [`crate::Validator`].
///
/// Collections keep the order and the duplicates of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAutomaton {
    /// Identifier of the automaton, guaranteed to be non-empty.
    pub id: String,
    /// Display label.
    pub name: String,
    /// The initial state, `None` if it was absent or `null`.
    pub initial_state: Option<String>,
    /// Declared accepting states.
    pub acceptance_states: Vec<String>,
    /// Declared symbols, each of them non-empty.
    pub alphabet: Vec<String>,
    /// Declared states.
    pub states: Vec<String>,
    /// Transitions in input order.
    pub transitions: Vec<RawTransition>,
    /// Strings that should be run once the automaton is validated.
    pub test_strings: Vec<String>,
}

const STRING: &str = "a string";
const NON_EMPTY_STRING: &str = "a non-empty string";
const STRING_LIST: &str = "a list of strings";
const TRANSITION_LIST: &str = "a list of transitions";
const TRANSITION: &str = "an object with `from_state`, `symbol` and `to_state`";

impl RawAutomaton {
    /// Checks the shape of `value` and extracts the fields of an automaton description.
    pub fn from_value(value: &Value) -> Result<Self, MalformedInput> {
        let obj = value
            .as_object()
            .ok_or_else(|| MalformedInput::new("$", "an object describing an automaton"))?;
        let required = |key: &str, expected: &'static str| {
            obj.get(key)
                .ok_or_else(|| MalformedInput::new(key, expected))
        };

        let id = non_empty_string(required("id", NON_EMPTY_STRING)?, "id")?;
        let name = string(required("name", STRING)?, "name")?;
        let initial_state = match obj.get("initial_state") {
            None | Some(Value::Null) => None,
            Some(v) => Some(string(v, "initial_state")?),
        };
        let acceptance_states = strings(
            required("acceptance_states", STRING_LIST)?,
            "acceptance_states",
        )?;
        let alphabet = strings(required("alphabet", STRING_LIST)?, "alphabet")?;
        if let Some(pos) = alphabet.iter().position(|sym| sym.is_empty()) {
            return Err(MalformedInput::new(
                format!("alphabet[{pos}]"),
                NON_EMPTY_STRING,
            ));
        }
        let states = strings(required("states", STRING_LIST)?, "states")?;
        let transitions = transitions(required("transitions", TRANSITION_LIST)?)?;
        let test_strings = strings(required("test_strings", STRING_LIST)?, "test_strings")?;

        Ok(Self {
            id,
            name,
            initial_state,
            acceptance_states,
            alphabet,
            states,
            transitions,
            test_strings,
        })
    }

    /// Parses JSON text and checks its shape. Text that is not JSON at all is reported as
    /// malformed at the root.
    pub fn from_json(text: &str) -> Result<Self, MalformedInput> {
        let value: Value = serde_json::from_str(text).map_err(|e| {
            tracing::debug!("description is not valid JSON: {e}");
            MalformedInput::new("$", "a JSON document")
        })?;
        Self::from_value(&value)
    }
}

fn string(value: &Value, path: &str) -> Result<String, MalformedInput> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| MalformedInput::new(path, STRING))
}

fn non_empty_string(value: &Value, path: &str) -> Result<String, MalformedInput> {
    match value.as_str() {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(MalformedInput::new(path, NON_EMPTY_STRING)),
    }
}

fn strings(value: &Value, path: &str) -> Result<Vec<String>, MalformedInput> {
    let items = value
        .as_array()
        .ok_or_else(|| MalformedInput::new(path, STRING_LIST))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| string(item, &format!("{path}[{i}]")))
        .collect()
}

fn transitions(value: &Value) -> Result<Vec<RawTransition>, MalformedInput> {
    let items = value
        .as_array()
        .ok_or_else(|| MalformedInput::new("transitions", TRANSITION_LIST))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| -> Result<RawTransition, MalformedInput> {
            let path = format!("transitions[{i}]");
            let obj = item
                .as_object()
                .ok_or_else(|| MalformedInput::new(path.clone(), TRANSITION))?;
            let part = |key: &str| {
                let path = format!("{path}.{key}");
                obj.get(key)
                    .ok_or_else(|| MalformedInput::new(path.clone(), STRING))
                    .and_then(|v| string(v, &path))
            };
            Ok(RawTransition {
                from_state: part("from_state")?,
                symbol: part("symbol")?,
                to_state: part("to_state")?,
            })
        })
        .collect()
}

/// One edge of the transition function of a validated automaton.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Transition {
    /// Name of the source state.
    pub from_state: String,
    /// The symbol that is read.
    pub symbol: String,
    /// Name of the target state.
    pub to_state: String,
}

impl From<RawTransition> for Transition {
    fn from(raw: RawTransition) -> Self {
        Self {
            from_state: raw.from_state,
            symbol: raw.symbol,
            to_state: raw.to_state,
        }
    }
}

/// A validated automaton description. Instances can only be obtained through
/// [`crate::Validator`], so holding one means that every structural invariant holds:
/// - the initial state and all acceptance states are declared states,
/// - states and alphabet are non-empty,
/// - every transition connects declared states over a declared symbol,
/// - for each state and symbol there is exactly one transition.
///
/// States, alphabet and acceptance states are sets, they contain no duplicates and are kept in
/// the order in which they first appeared in the description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutomatonConfig {
    id: String,
    name: String,
    states: Vec<String>,
    alphabet: Vec<String>,
    initial_state: String,
    acceptance_states: Vec<String>,
    transitions: Vec<Transition>,
    test_strings: Vec<String>,
}

impl AutomatonConfig {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: String,
        name: String,
        states: Vec<String>,
        alphabet: Vec<String>,
        initial_state: String,
        acceptance_states: Vec<String>,
        transitions: Vec<Transition>,
        test_strings: Vec<String>,
    ) -> Self {
        Self {
            id,
            name,
            states,
            alphabet,
            initial_state,
            acceptance_states,
            transitions,
            test_strings,
        }
    }

    /// The identifier, used for naming artifacts.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The display label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All states, in order of first appearance.
    pub fn states(&self) -> &[String] {
        &self.states
    }

    /// All symbols, in order of first appearance.
    pub fn alphabet(&self) -> &[String] {
        &self.alphabet
    }

    /// The initial state.
    pub fn initial_state(&self) -> &str {
        &self.initial_state
    }

    /// The accepting states, possibly none.
    pub fn acceptance_states(&self) -> &[String] {
        &self.acceptance_states
    }

    /// Returns true if `state` is accepting.
    pub fn is_accepting(&self, state: &str) -> bool {
        self.acceptance_states.iter().any(|q| q == state)
    }

    /// The transitions in input order.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// The strings that should be run on the automaton.
    pub fn test_strings(&self) -> &[String] {
        &self.test_strings
    }
}
