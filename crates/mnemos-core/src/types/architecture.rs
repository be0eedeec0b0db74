//! `ProjectArchitecture` (spec.md §3, §4.C10): the project dependency graph.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MethodInfo {
    pub signature: String,
    pub doc: Option<String>,
    pub args: Vec<String>,
    pub types: Vec<String>,
    pub calls: Vec<CallEdge>,
    pub return_type: Option<String>,
    pub variables_used: Vec<String>,
}

/// A resolved call-graph edge (spec.md §4.C10 step 4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEdge {
    pub module: Option<String>,
    pub function: String,
    pub line: usize,
    pub resolved_from: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassInfo {
    pub bases: Vec<String>,
    pub methods: HashMap<String, MethodInfo>,
    pub attributes: HashMap<String, String>,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub path: String,
    pub docstring: Option<String>,
    pub classes: HashMap<String, ClassInfo>,
    pub functions: HashMap<String, MethodInfo>,
    pub imports: Vec<String>,
    pub outgoing_edges: Vec<String>,
    /// Derived in a second pass by inverting `outgoing_edges` across all
    /// modules (spec.md §4.C10 step 6) — never authored directly.
    pub incoming_edges: Vec<String>,
}

/// The whole-project dependency graph, one JSON file on disk
/// (spec.md §3 `ProjectArchitecture`, §6 `code/code_architecture.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectArchitecture {
    pub modules: HashMap<String, ModuleInfo>,
}

impl ProjectArchitecture {
    /// Invert `outgoing_edges` across all modules into `incoming_edges`
    /// (spec.md §4.C10 step 6). Idempotent: calling it twice in a row
    /// produces the same result as calling it once, since it always
    /// recomputes from `outgoing_edges` rather than accumulating.
    pub fn rebuild_incoming_edges(&mut self) {
        let mut incoming: HashMap<String, Vec<String>> = HashMap::new();
        for (name, module) in &self.modules {
            for target in &module.outgoing_edges {
                incoming.entry(target.clone()).or_default().push(name.clone());
            }
        }
        for (name, module) in &mut self.modules {
            let mut edges = incoming.remove(name).unwrap_or_default();
            edges.sort();
            edges.dedup();
            module.incoming_edges = edges;
        }
    }
}
