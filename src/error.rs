use std::fmt::Display;

use thiserror::Error;

use crate::render::RenderError;

/// Result type for everything that processes a single automaton description.
pub type AutomatonResult<T> = Result<T, AutomatonError>;

/// Top level error for a single automaton description. Every variant is converted into a
/// failed [`crate::batch::ItemReport`] at the batch boundary, none of them is fatal.
#[derive(Debug, Error)]
pub enum AutomatonError {
    /// The description does not have the expected shape.
    #[error(transparent)]
    Malformed(#[from] MalformedInput),
    /// The description is well-formed but violates a structural invariant.
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
    /// The diagram could not be produced.
    #[error(transparent)]
    Rendering(#[from] RenderError),
}

impl AutomatonError {
    /// A stable, machine-checkable name for the reason of the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            AutomatonError::Malformed(_) => "MalformedInput",
            AutomatonError::Validation(failure) => failure.kind(),
            AutomatonError::Rendering(_) => "RenderingFailure",
        }
    }
}

/// Raised by the schema check when a field is missing or has the wrong shape. The `path`
/// points at the offending value, for example `transitions[2].symbol`, and `expected`
/// describes the shape that should have been there.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed automaton description: `{path}` should be {expected}")]
pub struct MalformedInput {
    /// Location of the offending value, `$` denotes the description itself.
    pub path: String,
    /// Human readable description of the expected shape.
    pub expected: &'static str,
}

impl MalformedInput {
    /// Creates a new [`MalformedInput`] for the value at `path`.
    pub fn new(path: impl Into<String>, expected: &'static str) -> Self {
        Self {
            path: path.into(),
            expected,
        }
    }
}

/// Which end of a transition refers to an undeclared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// The `from_state` of a transition.
    From,
    /// The `to_state` of a transition.
    To,
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::From => write!(f, "source"),
            Endpoint::To => write!(f, "target"),
        }
    }
}

/// The semantic checks that a well-formed description can fail. Validation stops at the
/// first violation, so at most one of these is ever reported for a description.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationFailure {
    /// The initial state is absent or empty.
    #[error("missing initial state in automaton description")]
    MissingInitialState,
    /// The initial state is not one of the declared states.
    #[error("the initial state `{state}` is not in states")]
    InitialStateNotInStates {
        /// The offending initial state.
        state: String,
    },
    /// Some acceptance state is not one of the declared states.
    #[error("the acceptance state `{state}` is not in states")]
    AcceptanceStatesNotInStates {
        /// The first acceptance state that is not declared.
        state: String,
    },
    /// The alphabet has no symbols.
    #[error("the alphabet is empty")]
    EmptyAlphabet,
    /// There are no states.
    #[error("the states are empty")]
    EmptyStates,
    /// A transition starts or ends in an undeclared state.
    #[error("the {endpoint} state `{state}` of transition {index} is not in states")]
    TransitionStateNotInStates {
        /// Position of the transition in the description.
        index: usize,
        /// Whether the source or the target is undeclared.
        endpoint: Endpoint,
        /// The undeclared state.
        state: String,
    },
    /// A transition reads a symbol that is not in the alphabet.
    #[error("the symbol `{symbol}` of transition {index} is not in the alphabet")]
    TransitionSymbolNotInAlphabet {
        /// Position of the transition in the description.
        index: usize,
        /// The undeclared symbol.
        symbol: String,
    },
    /// There is a pair of state and symbol without outgoing transition.
    #[error("a transition is missing for state `{state}` and symbol `{symbol}`")]
    IncompleteTransitionFunction {
        /// The state lacking a transition.
        state: String,
        /// The symbol it lacks a transition for.
        symbol: String,
    },
    /// Two transitions leave the same state on the same symbol.
    #[error("transition {index} is a second transition for state `{state}` and symbol `{symbol}`")]
    DuplicateTransition {
        /// Position of the second transition in the description.
        index: usize,
        /// The shared source state.
        state: String,
        /// The shared symbol.
        symbol: String,
    },
}

impl ValidationFailure {
    /// A stable, machine-checkable name for the violated invariant.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationFailure::MissingInitialState => "MissingInitialState",
            ValidationFailure::InitialStateNotInStates { .. } => "InitialStateNotInStates",
            ValidationFailure::AcceptanceStatesNotInStates { .. } => "AcceptanceStatesNotInStates",
            ValidationFailure::EmptyAlphabet => "EmptyAlphabet",
            ValidationFailure::EmptyStates => "EmptyStates",
            ValidationFailure::TransitionStateNotInStates { .. } => "TransitionStateNotInStates",
            ValidationFailure::TransitionSymbolNotInAlphabet { .. } => {
                "TransitionSymbolNotInAlphabet"
            }
            ValidationFailure::IncompleteTransitionFunction { .. } => {
                "IncompleteTransitionFunction"
            }
            ValidationFailure::DuplicateTransition { .. } => "DuplicateTransition",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct() {
        let failures = [
            ValidationFailure::MissingInitialState,
            ValidationFailure::InitialStateNotInStates { state: "q".into() },
            ValidationFailure::AcceptanceStatesNotInStates { state: "q".into() },
            ValidationFailure::EmptyAlphabet,
            ValidationFailure::EmptyStates,
            ValidationFailure::TransitionStateNotInStates {
                index: 0,
                endpoint: Endpoint::From,
                state: "q".into(),
            },
            ValidationFailure::TransitionSymbolNotInAlphabet {
                index: 0,
                symbol: "a".into(),
            },
            ValidationFailure::IncompleteTransitionFunction {
                state: "q".into(),
                symbol: "a".into(),
            },
            ValidationFailure::DuplicateTransition {
                index: 1,
                state: "q".into(),
                symbol: "a".into(),
            },
        ];
        let kinds: crate::Set<_> = failures.iter().map(|f| f.kind()).collect();
        assert_eq!(kinds.len(), failures.len());
    }

    #[test]
    fn messages_carry_context() {
        let err: AutomatonError = MalformedInput::new("transitions[2].symbol", "a string").into();
        assert_eq!(err.kind(), "MalformedInput");
        assert!(err.to_string().contains("transitions[2].symbol"));

        let err: AutomatonError = ValidationFailure::TransitionStateNotInStates {
            index: 3,
            endpoint: Endpoint::To,
            state: "q7".into(),
        }
        .into();
        assert_eq!(err.kind(), "TransitionStateNotInStates");
        assert_eq!(
            err.to_string(),
            "the target state `q7` of transition 3 is not in states"
        );
    }
}
