use parser::{parse_command, refs, CommandError, CommandNode};

use crate::argument::ModuleArgument;
use crate::document::MacroDocument;
use crate::resolver;

/// Raw command text paired with its parsed form. Rewriting the text
/// always returns to `Unparsed`, so a stale parse is unrepresentable.
#[derive(Debug, Clone, PartialEq)]
enum CommandState {
    Unparsed(String),
    Parsed(String, CommandNode),
}

impl CommandState {
    fn text(&self) -> &str {
        match self {
            CommandState::Unparsed(text) | CommandState::Parsed(text, _) => text,
        }
    }
}

/// One instruction of a macro script.
///
/// String fields use the empty string for "unset"; the node never
/// carries a null-like domain value.
#[derive(Debug, Clone)]
pub struct MacroNode {
    /// Source line, carried for error reporting only.
    location: usize,
    command: CommandState,
    process_name: String,
    comment: String,
    module_path: String,
    class_path: String,
    main_class: String,
    jar_manifest_main_class: String,
    vm_parameters: String,
    arguments: Vec<ModuleArgument>,
}

impl MacroNode {
    pub fn new(location: usize) -> Self {
        Self {
            location,
            command: CommandState::Unparsed(String::new()),
            process_name: String::new(),
            comment: String::new(),
            module_path: String::new(),
            class_path: String::new(),
            main_class: String::new(),
            jar_manifest_main_class: String::new(),
            vm_parameters: String::new(),
            arguments: Vec::new(),
        }
    }

    pub fn location(&self) -> usize {
        self.location
    }

    /// Rewrite the raw command text, discarding any previous parse.
    pub fn set_command(&mut self, text: impl Into<String>) {
        self.command = CommandState::Unparsed(text.into());
    }

    pub fn command_text(&self) -> &str {
        self.command.text()
    }

    /// The parsed command, if [`parse_action`](Self::parse_action) has
    /// succeeded since the text was last rewritten.
    pub fn command_node(&self) -> Option<&CommandNode> {
        match &self.command {
            CommandState::Parsed(_, node) => Some(node),
            CommandState::Unparsed(_) => None,
        }
    }

    /// Parse the command text into its structured form. A grammar error
    /// leaves the node unusable for execution until the text is fixed.
    pub fn parse_action(&mut self) -> Result<&CommandNode, CommandError> {
        if let CommandState::Unparsed(text) = &self.command {
            let text = text.clone();
            let parsed = parse_command(&text)?;
            self.command = CommandState::Parsed(text, parsed);
        }
        match &self.command {
            CommandState::Parsed(_, node) => Ok(node),
            // the branch above either parsed or returned the error
            CommandState::Unparsed(_) => unreachable!(),
        }
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    pub fn set_process_name(&mut self, name: impl Into<String>) {
        self.process_name = name.into();
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    pub fn module_path(&self) -> &str {
        &self.module_path
    }

    pub fn set_module_path(&mut self, path: impl Into<String>) {
        self.module_path = path.into();
    }

    pub fn class_path(&self) -> &str {
        &self.class_path
    }

    pub fn set_class_path(&mut self, path: impl Into<String>) {
        self.class_path = path.into();
    }

    pub fn main_class(&self) -> &str {
        &self.main_class
    }

    pub fn set_main_class(&mut self, class: impl Into<String>) {
        self.main_class = class.into();
    }

    pub fn jar_manifest_main_class(&self) -> &str {
        &self.jar_manifest_main_class
    }

    pub fn set_jar_manifest_main_class(&mut self, class: impl Into<String>) {
        self.jar_manifest_main_class = class.into();
    }

    pub fn vm_parameters(&self) -> &str {
        &self.vm_parameters
    }

    pub fn set_vm_parameters(&mut self, params: impl Into<String>) {
        self.vm_parameters = params.into();
    }

    pub fn arguments(&self) -> &[ModuleArgument] {
        &self.arguments
    }

    pub fn add_argument(&mut self, argument: ModuleArgument) {
        self.arguments.push(argument);
    }

    /// The main class to launch: the explicit one, or the
    /// manifest-declared one as a fallback.
    pub fn available_main_class(&self) -> &str {
        if self.main_class.is_empty() {
            &self.jar_manifest_main_class
        } else {
            &self.main_class
        }
    }

    /// The module path with a `.jar` suffix appended when it is missing.
    /// An empty path stays empty.
    pub fn available_jar_module_path(&self) -> String {
        if self.module_path.is_empty()
            || self.module_path.to_ascii_lowercase().ends_with(".jar")
        {
            self.module_path.clone()
        } else {
            format!("{}.jar", self.module_path)
        }
    }

    /// Resolve this node's process-name field to an exit code: a
    /// literal integer wins, then a `${name}` indirection through the
    /// document, then a direct name lookup, then `default`.
    pub fn exit_code_from_process_name(&self, doc: &MacroDocument, default: i32) -> i32 {
        let name = self.process_name.trim();
        if let Ok(code) = name.parse::<i32>() {
            return code;
        }
        let lookup = refs::referenced_identifier(name).unwrap_or(name);
        doc.process_exit_code(lookup).unwrap_or(default)
    }

    /// Build a human-readable line from the reference-expanded fields,
    /// space-joined, skipping empty ones.
    pub fn echo_string(&self, doc: &MacroDocument) -> String {
        let mut buf = String::new();
        resolver::append_echo_string(doc, &mut buf, &self.comment);
        resolver::append_echo_string(doc, &mut buf, &self.module_path);
        resolver::append_echo_string(doc, &mut buf, &self.class_path);
        resolver::append_echo_string(doc, &mut buf, &self.main_class);
        resolver::append_echo_string(doc, &mut buf, &self.vm_parameters);
        for argument in &self.arguments {
            resolver::append_echo_string(doc, &mut buf, &argument.to_string());
        }
        buf
    }

    /// A copy with an independently-owned argument list and command
    /// state. Scalar fields are copied as-is.
    pub fn duplicate(&self) -> MacroNode {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::ArgKind;
    use parser::Action;

    #[test]
    fn set_command_discards_parse() {
        let mut node = MacroNode::new(1);
        node.set_command("RUN");
        node.parse_action().unwrap();
        assert!(node.command_node().is_some());

        node.set_command("ECHO");
        assert!(node.command_node().is_none());
        assert_eq!(node.parse_action().unwrap().action(), Action::Echo);
    }

    #[test]
    fn parse_action_propagates_grammar_errors() {
        let mut node = MacroNode::new(3);
        node.set_command("BOGUS");
        assert!(node.parse_action().is_err());
        assert!(node.command_node().is_none());
    }

    #[test]
    fn main_class_falls_back_to_manifest() {
        let mut node = MacroNode::new(1);
        node.set_jar_manifest_main_class("pkg.ManifestMain");
        assert_eq!(node.available_main_class(), "pkg.ManifestMain");
        node.set_main_class("pkg.Main");
        assert_eq!(node.available_main_class(), "pkg.Main");
    }

    #[test]
    fn jar_suffix_appended_when_missing() {
        let mut node = MacroNode::new(1);
        assert_eq!(node.available_jar_module_path(), "");
        node.set_module_path("modules/conv");
        assert_eq!(node.available_jar_module_path(), "modules/conv.jar");
        node.set_module_path("modules/conv.JAR");
        assert_eq!(node.available_jar_module_path(), "modules/conv.JAR");
    }

    #[test]
    fn exit_code_fallback_chain() {
        let mut doc = MacroDocument::new("test");
        doc.put_process_exit_code("P", 3);

        let mut node = MacroNode::new(1);
        node.set_process_name("7");
        assert_eq!(node.exit_code_from_process_name(&doc, -1), 7);

        node.set_process_name("${P}");
        assert_eq!(node.exit_code_from_process_name(&doc, -1), 3);

        node.set_process_name("P");
        assert_eq!(node.exit_code_from_process_name(&doc, -1), 3);

        node.set_process_name("missing");
        assert_eq!(node.exit_code_from_process_name(&doc, -1), -1);
    }

    #[test]
    fn duplicate_owns_its_arguments() {
        let mut node = MacroNode::new(1);
        node.set_command("RUN");
        node.add_argument(ModuleArgument::new(ArgKind::Str, "a"));

        let mut copy = node.duplicate();
        copy.add_argument(ModuleArgument::new(ArgKind::Str, "b"));
        assert_eq!(node.arguments().len(), 1);
        assert_eq!(copy.arguments().len(), 2);
    }

    #[test]
    fn echo_string_skips_empty_fields() {
        let mut doc = MacroDocument::new("test");
        doc.put_process_exit_code("P1", 0);

        let mut node = MacroNode::new(1);
        node.set_comment("convert");
        node.set_module_path("conv.jar");
        node.add_argument(ModuleArgument::new(ArgKind::In, "in.csv"));
        node.add_argument(ModuleArgument::new(ArgKind::Str, "${P1}"));
        assert_eq!(node.echo_string(&doc), "convert conv.jar [IN]in.csv [STR]0");
    }
}
