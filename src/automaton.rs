use bimap::BiMap;
use bit_set::BitSet;
use itertools::Itertools;
use tracing::trace;

use crate::{
    config::AutomatonConfig,
    dot::{Diagram, DiagramEdge, DiagramNode, NodeShape},
    word::tokenize,
};

macro_rules! dense_index_type {
    ($($(#[$meta:meta])* $name:ident),*) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
            pub struct $name(u32);

            impl $name {
                /// Returns the position of the index in its dense range.
                pub fn into_usize(self) -> usize {
                    self.0 as usize
                }

                fn from_usize(n: usize) -> Self {
                    Self(n as u32)
                }
            }
        )*
    };
}

dense_index_type!(
    /// Index of a state in a [`Dfa`], states are numbered in the order they were declared.
    StateIndex,
    /// Index of a symbol in a [`Dfa`], symbols are numbered in the order they were declared.
    SymbolIndex
);

/// A deterministic finite automaton built from a validated [`AutomatonConfig`].
///
/// State and symbol names are interned into dense indices and the transition function is stored
/// as a flat table with one row per state and one column per symbol, so looking up a successor
/// is a single indexing operation. Since the configuration was validated, the table is total.
///
/// A `Dfa` is never modified after construction. All methods take `&self` and running a word
/// keeps its current state in a local variable, so one instance can serve any number of
/// threads at once.
///
/// # Example
/// ```
/// use dfa_workbench::prelude::*;
/// use serde_json::json;
///
/// let config = Validator
///     .validate_value(&json!({
///         "id": "parity", "name": "odd number of a",
///         "initial_state": "even", "acceptance_states": ["odd"],
///         "alphabet": ["a"], "states": ["even", "odd"],
///         "transitions": [
///             {"from_state": "even", "symbol": "a", "to_state": "odd"},
///             {"from_state": "odd", "symbol": "a", "to_state": "even"}
///         ],
///         "test_strings": []
///     }))
///     .unwrap();
/// let dfa = Dfa::new(config);
/// assert!(dfa.accepts_str("aaa"));
/// assert!(!dfa.accepts(["a", "a"]));
/// ```
#[derive(Debug, Clone)]
pub struct Dfa {
    config: AutomatonConfig,
    states: BiMap<String, StateIndex>,
    symbols: BiMap<String, SymbolIndex>,
    initial: StateIndex,
    accepting: BitSet,
    table: Vec<StateIndex>,
}

impl Dfa {
    /// Builds the automaton for `config`. This cannot fail, the invariants of a validated
    /// configuration guarantee that every state has exactly one successor for every symbol.
    pub fn new(config: AutomatonConfig) -> Self {
        let states: BiMap<String, StateIndex> = config
            .states()
            .iter()
            .enumerate()
            .map(|(i, q)| (q.clone(), StateIndex::from_usize(i)))
            .collect();
        let symbols: BiMap<String, SymbolIndex> = config
            .alphabet()
            .iter()
            .enumerate()
            .map(|(i, a)| (a.clone(), SymbolIndex::from_usize(i)))
            .collect();

        // validated configurations always declare their initial state
        let initial = states
            .get_by_left(config.initial_state())
            .copied()
            .unwrap_or_default();
        let accepting: BitSet = config
            .acceptance_states()
            .iter()
            .filter_map(|q| states.get_by_left(q.as_str()))
            .map(|q| q.into_usize())
            .collect();

        let width = symbols.len();
        let mut table = vec![initial; states.len() * width];
        for t in config.transitions() {
            if let (Some(q), Some(a), Some(p)) = (
                states.get_by_left(t.from_state.as_str()),
                symbols.get_by_left(t.symbol.as_str()),
                states.get_by_left(t.to_state.as_str()),
            ) {
                table[q.into_usize() * width + a.into_usize()] = *p;
            }
        }
        trace!(
            "built transition table for {} with {} entries",
            config.id(),
            table.len()
        );

        Self {
            config,
            states,
            symbols,
            initial,
            accepting,
            table,
        }
    }

    /// The configuration this automaton was built from.
    pub fn config(&self) -> &AutomatonConfig {
        &self.config
    }

    /// Number of states.
    pub fn size(&self) -> usize {
        self.states.len()
    }

    /// The initial state.
    pub fn initial(&self) -> StateIndex {
        self.initial
    }

    /// Returns the index of the state called `name`, if there is one.
    pub fn state(&self, name: &str) -> Option<StateIndex> {
        self.states.get_by_left(name).copied()
    }

    /// Returns the name of the state with index `idx`.
    pub fn state_name(&self, idx: StateIndex) -> Option<&str> {
        self.states.get_by_right(&idx).map(String::as_str)
    }

    /// Returns the index of `symbol`, if it belongs to the alphabet.
    pub fn symbol(&self, symbol: &str) -> Option<SymbolIndex> {
        self.symbols.get_by_left(symbol).copied()
    }

    /// Returns true if the state with index `idx` is accepting.
    pub fn is_accepting(&self, idx: StateIndex) -> bool {
        self.accepting.contains(idx.into_usize())
    }

    /// Returns the unique successor of `state` on `symbol`.
    #[inline(always)]
    pub fn successor(&self, state: StateIndex, symbol: SymbolIndex) -> StateIndex {
        self.table[state.into_usize() * self.symbols.len() + symbol.into_usize()]
    }

    /// Runs `word` from the initial state and returns whether the reached state is accepting.
    /// The empty word is accepted if and only if the initial state is accepting. A word
    /// containing something that is not a symbol of the alphabet is rejected.
    pub fn accepts<W, S>(&self, word: W) -> bool
    where
        W: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = self.initial;
        for sym in word {
            let Some(a) = self.symbol(sym.as_ref()) else {
                trace!("{:?} is not a symbol of {}", sym.as_ref(), self.config.id());
                return false;
            };
            state = self.successor(state, a);
        }
        self.is_accepting(state)
    }

    /// Splits `input` into symbols of the alphabet (see [`tokenize`]) and runs the resulting
    /// word. Inputs that cannot be split into symbols are rejected.
    pub fn accepts_str(&self, input: &str) -> bool {
        match tokenize(self.config.alphabet(), input) {
            Ok(word) => self.accepts(word),
            Err(e) => {
                trace!("rejecting {input:?}: {e}");
                false
            }
        }
    }

    /// Runs `word` from the initial state and records every state that is visited.
    pub fn run<W, S>(&self, word: W) -> Run<'_>
    where
        W: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = self.initial;
        let mut path = vec![state];
        for (position, sym) in word.into_iter().enumerate() {
            let Some(a) = self.symbol(sym.as_ref()) else {
                return Run {
                    dfa: self,
                    path,
                    outcome: RunOutcome::UnknownSymbol { position },
                };
            };
            state = self.successor(state, a);
            path.push(state);
        }
        let outcome = if self.is_accepting(state) {
            RunOutcome::Accepted
        } else {
            RunOutcome::Rejected
        };
        Run {
            dfa: self,
            path,
            outcome,
        }
    }

    /// Describes the state diagram of `self`: one node per state, shaped according to whether
    /// it is accepting, one edge per transition labeled with its symbol and an unlabeled entry
    /// edge into the initial state.
    pub fn diagram_description(&self) -> Diagram {
        let nodes = self
            .config
            .states()
            .iter()
            .map(|q| DiagramNode {
                id: q.clone(),
                shape: if self.config.is_accepting(q) {
                    NodeShape::Accepting
                } else {
                    NodeShape::Plain
                },
            })
            .collect();
        let edges = self
            .config
            .transitions()
            .iter()
            .map(|t| DiagramEdge {
                from: t.from_state.clone(),
                to: t.to_state.clone(),
                label: t.symbol.clone(),
            })
            .collect();
        Diagram {
            id: self.config.id().to_string(),
            name: self.config.name().to_string(),
            initial: self.config.initial_state().to_string(),
            nodes,
            edges,
        }
    }

    /// Returns a string representation of the transition table. The initial state is marked
    /// with `->` and accepting states with `*`.
    pub fn transition_table(&self) -> String {
        let mut builder = tabled::builder::Builder::default();
        builder.push_record(
            std::iter::once("State".to_string()).chain(self.config.alphabet().iter().cloned()),
        );
        for (i, q) in self.config.states().iter().enumerate() {
            let idx = StateIndex::from_usize(i);
            let marker = match (idx == self.initial, self.is_accepting(idx)) {
                (true, true) => "->*",
                (true, false) => "->",
                (false, true) => "*",
                (false, false) => "",
            };
            let row = std::iter::once(format!("{marker}{q}")).chain(
                (0..self.symbols.len()).map(|a| {
                    self.state_name(self.successor(idx, SymbolIndex::from_usize(a)))
                        .unwrap_or("-")
                        .to_string()
                }),
            );
            builder.push_record(row.collect_vec());
        }
        builder
            .build()
            .with(tabled::settings::Style::rounded())
            .to_string()
    }
}

impl From<AutomatonConfig> for Dfa {
    fn from(config: AutomatonConfig) -> Self {
        Self::new(config)
    }
}

/// How a [`Run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The word was read completely and an accepting state was reached.
    Accepted,
    /// The word was read completely and a rejecting state was reached.
    Rejected,
    /// The symbol at `position` of the word does not belong to the alphabet.
    UnknownSymbol {
        /// Position of the offending symbol in the word.
        position: usize,
    },
}

/// The sequence of states that a word visits, together with the [`RunOutcome`].
#[derive(Debug, Clone)]
pub struct Run<'a> {
    dfa: &'a Dfa,
    path: Vec<StateIndex>,
    outcome: RunOutcome,
}

impl<'a> Run<'a> {
    /// Returns true if the run read the whole word and ended in an accepting state.
    pub fn accepted(&self) -> bool {
        self.outcome == RunOutcome::Accepted
    }

    /// How the run ended.
    pub fn outcome(&self) -> RunOutcome {
        self.outcome
    }

    /// The visited states, starting with the initial state.
    pub fn path(&self) -> &[StateIndex] {
        &self.path
    }

    /// The state in which the run stopped.
    pub fn reached(&self) -> StateIndex {
        self.path.last().copied().unwrap_or(self.dfa.initial)
    }

    /// Names of the visited states.
    pub fn state_names(&self) -> impl Iterator<Item = &'a str> + '_ {
        let dfa = self.dfa;
        self.path.iter().filter_map(move |q| dfa.state_name(*q))
    }
}
