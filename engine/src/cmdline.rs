//! Turning resolved macro nodes into concrete OS argument vectors.
//!
//! Three strategies share the VM-argument assembly: a shell command
//! (the module itself is the executable), a Java module launch, and a
//! sub-macro launch that re-enters the engine on another macro file.

use common::{command::Command, work_path};

use crate::document::MacroDocument;
use crate::node::MacroNode;
use crate::resolver;

#[cfg(windows)]
const CLASSPATH_SEPARATOR: char = ';';
#[cfg(not(windows))]
const CLASSPATH_SEPARATOR: char = ':';

/// Engine-level settings injected into built command lines.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Java executable used for module and sub-macro launches.
    pub java_command: String,
    /// Encoding for CSV files read and written by modules.
    pub csv_encoding: Option<String>,
    /// Encoding for text files read and written by modules.
    pub txt_encoding: Option<String>,
    pub verbose: bool,
    /// Maximum heap, e.g. `1024m`. When set it overrides any heap
    /// options in a node's VM parameters.
    pub max_heap: Option<String>,
    /// Extra VM options, always appended after the node's own.
    pub vm_options: Vec<String>,
    /// Appended to the module classpath of a Java launch.
    pub library_path: Option<String>,
    /// The engine's own runtime classpath, for sub-macro launches.
    pub macro_classpath: String,
    /// The engine main class started for a sub-macro.
    pub macro_main_class: String,
    /// Engine options a sub-macro run inherits.
    pub inherited_options: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            java_command: "java".to_owned(),
            csv_encoding: None,
            txt_encoding: None,
            verbose: false,
            max_heap: None,
            vm_options: Vec::new(),
            library_path: None,
            macro_classpath: String::new(),
            macro_main_class: String::new(),
            inherited_options: Vec::new(),
        }
    }
}

/// Split a VM-parameter string into tokens, honoring double-quoted
/// sections. The quotes group; they are not kept.
pub fn split_vm_parameters(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;
    for c in s.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    tokens.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        tokens.push(current);
    }
    tokens
}

/// Apply the heap-override rule: with a configured maximum, `-Xmx<N>`
/// replaces every caller heap option; without one the caller's options
/// pass through verbatim.
fn vm_args_with_heap(max_heap: Option<&str>, caller: Vec<String>) -> Vec<String> {
    match max_heap {
        Some(heap) => {
            let mut args = vec![format!("-Xmx{heap}")];
            args.extend(
                caller
                    .into_iter()
                    .filter(|arg| !arg.starts_with("-Xmx") && !arg.starts_with("-Xms")),
            );
            args
        }
        None => caller,
    }
}

fn join_classpath(parts: &[&str]) -> String {
    let mut joined = String::new();
    for part in parts.iter().filter(|part| !part.is_empty()) {
        if !joined.is_empty() {
            joined.push(CLASSPATH_SEPARATOR);
        }
        joined.push_str(part);
    }
    joined
}

impl MacroNode {
    /// Shell strategy: the resolved module path is the executable,
    /// followed by the VM parameters and the resolved arguments with
    /// IN/OUT paths absolutized.
    pub fn shell_command(&self, doc: &MacroDocument) -> Command {
        let program = resolver::convert_reference(doc, self.module_path());
        let mut args = split_vm_parameters(self.vm_parameters());
        args.extend(self.resolved_arguments(doc, true));
        Command::new(program, args)
    }

    /// Java module strategy: launch the module's main class with the
    /// engine VM flags injected ahead of the caller's.
    pub fn java_module_command(&self, doc: &MacroDocument, config: &EngineConfig) -> Command {
        let module = self.available_jar_module_path();
        let class_path = resolver::convert_reference(doc, self.class_path());

        let mut args = vec![
            "-classpath".to_owned(),
            join_classpath(&[
                module.as_str(),
                class_path.as_str(),
                config.library_path.as_deref().unwrap_or(""),
            ]),
        ];
        if let Some(encoding) = &config.csv_encoding {
            args.push(format!("-Daadl.csv.encoding={encoding}"));
        }
        if let Some(encoding) = &config.txt_encoding {
            args.push(format!("-Daadl.txt.encoding={encoding}"));
        }
        if config.verbose {
            args.push("-Daadl.verbose=true".to_owned());
        }
        args.extend(vm_args_with_heap(
            config.max_heap.as_deref(),
            split_vm_parameters(self.vm_parameters()),
        ));
        args.extend(config.vm_options.iter().cloned());
        args.push(self.available_main_class().to_owned());
        args.extend(self.resolved_arguments(doc, false));
        Command::new(config.java_command.clone(), args)
    }

    /// Sub-macro strategy: re-enter the engine on another macro file.
    pub fn sub_macro_command(&self, doc: &MacroDocument, config: &EngineConfig) -> Command {
        let mut args = vec!["-classpath".to_owned(), config.macro_classpath.clone()];
        args.extend(vm_args_with_heap(
            config.max_heap.as_deref(),
            split_vm_parameters(self.vm_parameters()),
        ));
        args.push(config.macro_main_class.clone());
        args.extend(config.inherited_options.iter().cloned());
        // the macro file path, or an empty placeholder
        args.push(resolver::convert_reference(doc, self.module_path()));
        args.extend(self.resolved_arguments(doc, true));
        Command::new(config.java_command.clone(), args)
    }

    /// Resolve each module argument; IN/OUT paths are re-rooted under
    /// the document's working directory when `absolutize` is set.
    pub fn resolved_arguments(&self, doc: &MacroDocument, absolutize: bool) -> Vec<String> {
        self.arguments()
            .iter()
            .map(|argument| {
                let value = resolver::convert_reference(doc, argument.value());
                if absolutize && argument.kind().is_path() {
                    work_path::absolutize(doc.work_dir(), &value)
                } else {
                    value
                }
            })
            .collect()
    }
}
