use crate::symbol::{SymbolId, SymbolTable};

/// A partially or fully derived string, held as a symbol sequence
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SententialForm(Vec<SymbolId>);

impl SententialForm {
    pub fn new(symbols: Vec<SymbolId>) -> Self {
        SententialForm(symbols)
    }

    /// The single-symbol form holding the start variable
    pub fn start(symbols: &SymbolTable) -> Self {
        SententialForm(vec![symbols.start()])
    }

    pub fn symbols(&self) -> &[SymbolId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Position of the leftmost variable, `None` for a terminal form
    pub fn leftmost_variable(&self, symbols: &SymbolTable) -> Option<usize> {
        self.0.iter().position(|&id| symbols.is_variable_id(id))
    }

    /// Replace the symbol at `at` with `replacement`, leaving `self` untouched
    pub fn rewrite(&self, at: usize, replacement: &[SymbolId]) -> SententialForm {
        let mut next = Vec::with_capacity(self.0.len() - 1 + replacement.len());
        next.extend_from_slice(&self.0[..at]);
        next.extend_from_slice(replacement);
        next.extend_from_slice(&self.0[at + 1..]);
        SententialForm(next)
    }

    pub fn render(&self, symbols: &SymbolTable) -> String {
        symbols.render(&self.0)
    }
}

impl From<Vec<SymbolId>> for SententialForm {
    fn from(symbols: Vec<SymbolId>) -> Self {
        SententialForm(symbols)
    }
}

/// Handle of a node inside a [`DerivationArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct DerivationNode {
    form: SententialForm,
    parent: Option<NodeId>,
}

impl DerivationNode {
    pub fn form(&self) -> &SententialForm {
        &self.form
    }

    /// `None` for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// Derivation tree of one query. Nodes point at their parent by handle.
#[derive(Debug, Default)]
pub struct DerivationArena {
    nodes: Vec<DerivationNode>,
}

impl DerivationArena {
    pub fn new() -> Self {
        DerivationArena { nodes: Vec::new() }
    }

    /// Store `form` and return its handle
    pub fn push(&mut self, form: SententialForm, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(DerivationNode { form, parent });
        id
    }

    pub fn node(&self, id: NodeId) -> &DerivationNode {
        &self.nodes[id.0]
    }

    pub fn form(&self, id: NodeId) -> &SententialForm {
        &self.nodes[id.0].form
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Chase parent handles from `leaf` back to the root
    pub fn trail(&self, leaf: NodeId, symbols: &SymbolTable) -> DerivationTrail {
        let mut forms = Vec::new();
        let mut cursor = Some(leaf);
        while let Some(id) = cursor {
            let node = self.node(id);
            forms.push(node.form.clone());
            cursor = node.parent;
        }
        forms.reverse();

        let rendered = forms.iter().map(|form| form.render(symbols)).collect();
        DerivationTrail { forms, rendered }
    }
}

/// Sentential forms from the start variable to an accepted string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationTrail {
    forms: Vec<SententialForm>,
    rendered: Vec<String>,
}

impl DerivationTrail {
    pub fn steps(&self) -> &[SententialForm] {
        &self.forms
    }

    /// Each step as the concatenation of its symbol names
    pub fn rendered(&self) -> &[String] {
        &self.rendered
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

/// One indented line per derivation step
pub fn render_trail(trail: &DerivationTrail) -> String {
    trail
        .rendered()
        .iter()
        .map(|step| format!("  |- {}", step))
        .collect::<Vec<_>>()
        .join("\n")
}
