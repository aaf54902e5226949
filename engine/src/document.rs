use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parser::Action;
use tracing::debug;

use crate::node::MacroNode;

/// One whole macro script: the nodes in execution order plus the side
/// tables that later nodes' references resolve through.
///
/// The side tables stay consistent only when nodes enter through
/// [`add_macro_node`](Self::add_macro_node) or
/// [`insert_macro_node`](Self::insert_macro_node); that is the contract
/// callers must honor. The document is not synchronized; concurrent
/// script runs need separate documents.
#[derive(Debug, Default)]
pub struct MacroDocument {
    name: String,
    work_dir: Option<PathBuf>,
    nodes: Vec<MacroNode>,
    /// process name -> index into `nodes`; last registration wins
    process_nodes: HashMap<String, usize>,
    /// process name -> exit code; `None` until the process has run
    process_exit_codes: HashMap<String, Option<i32>>,
    /// normalized `$tmp{id}` -> provisioned file
    temp_files: HashMap<String, PathBuf>,
    /// macro-argument key (full `${name}` text) -> caller-supplied value
    macro_args: HashMap<String, String>,
}

/// Actions in the exclusion set never register a process name.
fn registrable(action: Action) -> bool {
    !matches!(
        action,
        Action::Echo | Action::ErrorCond | Action::Comment | Action::Exit
    )
}

impl MacroDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_deref()
    }

    pub fn set_work_dir(&mut self, dir: Option<PathBuf>) {
        self.work_dir = dir;
    }

    pub fn nodes(&self) -> &[MacroNode] {
        &self.nodes
    }

    /// Append a node, registering its process name when eligible.
    pub fn add_macro_node(&mut self, node: MacroNode) {
        self.insert_macro_node(self.nodes.len(), node);
    }

    /// Insert a node at `index`, registering its process name when its
    /// action is outside the exclusion set and the name is non-empty.
    /// A node whose command text does not parse is kept in the list but
    /// never registered; it cannot run, so it cannot produce an exit
    /// code.
    pub fn insert_macro_node(&mut self, index: usize, mut node: MacroNode) {
        let eligible = match node.parse_action() {
            Ok(command) => registrable(command.action()),
            Err(err) => {
                debug!(line = node.location(), %err, "unparsable node left unregistered");
                false
            }
        };

        // indices of nodes displaced by the insertion shift by one
        for slot in self.process_nodes.values_mut() {
            if *slot >= index {
                *slot += 1;
            }
        }

        let process_name = node.process_name().to_owned();
        self.nodes.insert(index, node);

        if eligible && !process_name.is_empty() {
            self.process_nodes.insert(process_name.clone(), index);
            self.process_exit_codes.entry(process_name).or_insert(None);
        }
    }

    /// The node currently registered under `name`, if any.
    pub fn process_node_by_name(&self, name: &str) -> Option<&MacroNode> {
        self.process_nodes.get(name).map(|&index| &self.nodes[index])
    }

    pub fn has_process_name(&self, name: &str) -> bool {
        self.process_nodes.contains_key(name)
    }

    pub fn process_names(&self) -> impl Iterator<Item = &str> {
        self.process_nodes.keys().map(String::as_str)
    }

    /// The recorded exit code for `name`; `None` while unset or unknown.
    pub fn process_exit_code(&self, name: &str) -> Option<i32> {
        self.process_exit_codes.get(name).copied().flatten()
    }

    /// Record a finished process's exit code. Called by the external
    /// process runner after each process terminates.
    pub fn put_process_exit_code(&mut self, name: impl Into<String>, code: i32) {
        self.process_exit_codes.insert(name.into(), Some(code));
    }

    /// Every recorded (name, exit code) pair, in no particular order.
    pub fn recorded_exit_codes(&self) -> impl Iterator<Item = (&str, i32)> {
        self.process_exit_codes
            .iter()
            .filter_map(|(name, code)| code.map(|code| (name.as_str(), code)))
    }

    /// Drop one process name from both process tables. The node itself
    /// stays in the list.
    pub fn remove_process_name(&mut self, name: &str) {
        self.process_nodes.remove(name);
        self.process_exit_codes.remove(name);
    }

    /// Drop every node together with both process tables.
    pub fn clear_macro_nodes(&mut self) {
        self.nodes.clear();
        self.process_nodes.clear();
        self.process_exit_codes.clear();
    }

    /// Reset every exit-code entry to unset, keeping the registrations.
    /// Used between runs of the same document.
    pub fn clear_process_names(&mut self) {
        for code in self.process_exit_codes.values_mut() {
            *code = None;
        }
    }

    /// Register a provisioned temporary file under its normalized
    /// `$tmp{id}` token.
    pub fn put_temp_file(&mut self, id: impl Into<String>, path: PathBuf) {
        self.temp_files.insert(id.into(), path);
    }

    pub fn temp_file(&self, id: &str) -> Option<&Path> {
        self.temp_files.get(id).map(PathBuf::as_path)
    }

    /// Supply a macro argument. Keys are the full reference text, e.g.
    /// `${1}`.
    pub fn put_macro_arg(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.macro_args.insert(key.into(), value.into());
    }

    pub fn macro_arg(&self, key: &str) -> Option<&str> {
        self.macro_args.get(key).map(String::as_str)
    }
}
