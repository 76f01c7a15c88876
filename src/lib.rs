//! Library for validating, simulating and drawing deterministic finite automata (DFA) that are
//! given as declarative JSON descriptions.
//!
//! A description lists the states, the alphabet, the initial state, the accepting states, the
//! transitions and a number of test strings. Processing it happens in two stages. First the
//! [`validate`] module turns the loosely typed description into an [`AutomatonConfig`], which
//! only exists if every structural invariant holds: the initial and accepting states are
//! declared, every transition connects declared states over a declared symbol and the
//! transition function is total as well as deterministic. Then a [`Dfa`] is built from the
//! validated configuration. It interns states and symbols into dense indices and keeps the
//! transition function as a flat table, so that running a word costs one lookup per symbol.
//!
//! The [`Dfa`] never mutates after construction, running a word is a pure function of the
//! automaton and the word. A single instance may therefore be shared between threads without
//! any locking, which is what the [`batch`] module relies on when it fans out many descriptions
//! over a thread pool.
//!
//! Everything that touches the outside world is kept out of the core:
//! - [`dot`] describes the state diagram of an automaton and turns it into Graphviz DOT text.
//! - [`render`] contains the [`render::Renderer`] implementations that write diagram artifacts.
//! - [`batch`] implements the per-item request contract for a list of descriptions.
//! - [`server`] exposes the batch over HTTP.
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// The prelude is supposed to make using this package easier. Including everything, i.e.
/// `use dfa_workbench::prelude::*;` should be enough to validate and run automata.
pub mod prelude {
    pub use super::{
        automaton::{Dfa, Run, RunOutcome, StateIndex, SymbolIndex},
        batch::{process_batch, InputVerdict, ItemReport},
        config::{AutomatonConfig, RawAutomaton, RawTransition, Transition},
        dot::{Diagram, DiagramEdge, DiagramNode, NodeShape},
        error::{AutomatonError, MalformedInput, ValidationFailure},
        render::{DotRenderer, NoRenderer, RenderError, Renderer},
        validate::Validator,
        word::{tokenize, UnknownSymbol},
        Set, Map, Show,
    };
    #[cfg(feature = "graphviz")]
    pub use super::render::GraphvizRenderer;
}

/// Defines the raw and the validated description of an automaton.
pub mod config;
pub use config::{AutomatonConfig, Transition};

/// Errors that can occur while parsing, validating or rendering an automaton.
pub mod error;
pub use error::{AutomatonError, MalformedInput, ValidationFailure};

/// Schema and semantic validation of automaton descriptions.
pub mod validate;
pub use validate::Validator;

/// The simulation engine.
pub mod automaton;
pub use automaton::Dfa;

/// Splitting input strings into symbols of an alphabet.
pub mod word;

/// State diagrams and their DOT representation.
pub mod dot;

/// Turning diagrams into artifacts on disk.
pub mod render;

/// Processing of whole lists of automaton descriptions.
pub mod batch;

/// Runtime settings shared by the binary and the server.
pub mod settings;

/// HTTP surface for the batch processor.
pub mod server;

/// Generation of random words over the alphabet of an automaton. This is feature gated
/// behind the `random` feature.
#[cfg(feature = "random")]
pub mod random;

use itertools::Itertools;

/// Helper trait which can be used to display states, words and such.
pub trait Show {
    /// Returns a human readable representation of `self`. For a state this is its name,
    /// for a word the concatenation of its symbols in quotes.
    fn show(&self) -> String;
}

impl Show for str {
    fn show(&self) -> String {
        self.to_string()
    }
}

impl Show for String {
    fn show(&self) -> String {
        self.clone()
    }
}

impl<S: AsRef<str>> Show for [S] {
    fn show(&self) -> String {
        format!("\"{}\"", self.iter().map(|s| s.as_ref()).join(""))
    }
}

impl Show for bool {
    fn show(&self) -> String {
        match self {
            true => "+",
            false => "-",
        }
        .to_string()
    }
}

impl<S: Show + ?Sized> Show for &S {
    fn show(&self) -> String {
        S::show(*self)
    }
}

/// Type alias for sets, we use this to hide which type of `HashSet` we are actually using.
pub type Set<S> = fxhash::FxHashSet<S>;
/// Type alias for maps, we use this to hide which type of `HashMap` we are actually using.
pub type Map<K, V> = fxhash::FxHashMap<K, V>;
