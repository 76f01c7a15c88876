use std::fmt::Display;

use itertools::Itertools;
use serde::Serialize;

/// Whether a node of a [`Diagram`] is drawn as an accepting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeShape {
    /// An accepting state, drawn as a double circle.
    Accepting,
    /// Any other state, drawn as a circle.
    Plain,
}

impl NodeShape {
    fn graphviz_shape(&self) -> &'static str {
        match self {
            NodeShape::Accepting => "doublecircle",
            NodeShape::Plain => "circle",
        }
    }
}

/// A state in a [`Diagram`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramNode {
    /// Name of the state.
    pub id: String,
    /// How the state is drawn.
    pub shape: NodeShape,
}

/// A transition in a [`Diagram`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramEdge {
    /// Name of the source state.
    pub from: String,
    /// Name of the target state.
    pub to: String,
    /// The symbol of the transition.
    pub label: String,
}

/// Description of the state diagram of an automaton, this is what gets handed to a
/// [`crate::render::Renderer`]. Besides the nodes and edges, a diagram has an entry edge into
/// the initial state that starts at an invisible node and carries no label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagram {
    /// Identifier of the automaton, used for naming artifacts.
    pub id: String,
    /// Display label of the automaton.
    pub name: String,
    /// The state the entry edge points to.
    pub initial: String,
    /// One node per state.
    pub nodes: Vec<DiagramNode>,
    /// One edge per transition.
    pub edges: Vec<DiagramEdge>,
}

const ENTRY_NODE: &str = "__start";

impl Diagram {
    /// Compute the graphviz representation, for more information on the DOT format,
    /// see the [graphviz documentation](https://graphviz.org/doc/info/lang.html).
    ///
    /// All identifiers are quoted, so state names may contain arbitrary characters.
    pub fn to_dot(&self) -> String {
        let entry_node = self.entry_node();
        let header = [
            "digraph DFA {".to_string(),
            "rankdir=LR".to_string(),
            format!("label={}", quote(&self.name)),
            format!(
                "{} [{}]",
                quote(&entry_node),
                [
                    DotStateAttribute::Label(String::new()),
                    DotStateAttribute::Shape("none".into()),
                ]
                .iter()
                .join(", ")
            ),
        ];

        let states = self.nodes.iter().map(|node| {
            format!(
                "{} [{}]",
                quote(&node.id),
                [
                    DotStateAttribute::Shape(node.shape.graphviz_shape().into()),
                    DotStateAttribute::Label(node.id.clone()),
                ]
                .iter()
                .join(", ")
            )
        });

        let entry = std::iter::once(format!(
            "{} -> {}",
            quote(&entry_node),
            quote(&self.initial)
        ));

        let transitions = self.edges.iter().map(|edge| {
            format!(
                "{} -> {} [{}]",
                quote(&edge.from),
                quote(&edge.to),
                DotTransitionAttribute::Label(edge.label.clone())
            )
        });

        header
            .into_iter()
            .chain(states)
            .chain(entry)
            .chain(transitions)
            .chain(std::iter::once("}".to_string()))
            .join("\n")
    }

    /// Id of the invisible node the entry edge starts at, distinct from every state.
    fn entry_node(&self) -> String {
        let mut id = ENTRY_NODE.to_string();
        while self.initial == id || self.nodes.iter().any(|node| node.id == id) {
            id.push('_');
        }
        id
    }
}

fn escape(name: &str) -> String {
    name.chars()
        .flat_map(|chr| match chr {
            '"' => vec!['\\', '"'],
            '\\' => vec!['\\', '\\'],
            '\n' => vec!['\\', 'n'],
            c => vec![c],
        })
        .collect()
}

fn quote(name: &str) -> String {
    format!("\"{}\"", escape(name))
}

/// Enum that abstracts attributes of nodes in the DOT format.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DotStateAttribute {
    /// The label of a node
    Label(String),
    /// The shape of a node
    Shape(String),
}

impl Display for DotStateAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DotStateAttribute::Label(s) => write!(f, "label=\"{}\"", escape(s)),
            DotStateAttribute::Shape(s) => write!(f, "shape=\"{}\"", escape(s)),
        }
    }
}

/// Enum that abstracts attributes of edges in the DOT format.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DotTransitionAttribute {
    /// The label of an edge
    Label(String),
}

impl Display for DotTransitionAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DotTransitionAttribute::Label(lbl) => write!(f, "label=\"{}\"", escape(lbl)),
        }
    }
}
