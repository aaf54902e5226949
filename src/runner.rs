//! Sequential execution of a loaded macro document.
//!
//! Nodes run in order. `RUN` launches a module and waits; the `&`
//! modifier launches it in the background instead, and `WAIT` (or the
//! final implicit drain) collects those children later. Exit codes are
//! recorded per process name and drive `ERRORCOND` and exit-code
//! references.

use std::process::{Child, Stdio};

use color_eyre::eyre::{Result, WrapErr};
use engine::{resolver, EngineConfig, MacroDocument, MacroNode};
use parser::{refs, Action, CommandNode, Modifier, NameList};
use tempfile::TempDir;
use tracing::{debug, warn};

pub struct Runner {
    doc: MacroDocument,
    config: EngineConfig,
    /// Background children not yet waited on, in launch order.
    background: Vec<(String, Child)>,
    /// Owns the provisioned temp files for the lifetime of the run.
    temp_dir: Option<TempDir>,
}

impl Runner {
    pub fn new(doc: MacroDocument, config: EngineConfig) -> Self {
        Self {
            doc,
            config,
            background: Vec::new(),
            temp_dir: None,
        }
    }

    /// Run the document to completion and return the macro exit code.
    pub fn run(&mut self) -> Result<i32> {
        self.provision_temp_files()?;

        let mut index = 0;
        while index < self.doc.nodes().len() {
            let mut node = self.doc.nodes()[index].duplicate();
            let line = node.location();
            let command = node
                .parse_action()
                .wrap_err_with(|| format!("bad command on line {line}"))?
                .clone();
            debug!(line, "executing {command}");

            match command.action() {
                Action::Comment => {}
                Action::Echo => println!("{}", node.echo_string(&self.doc)),
                Action::Wait => self.wait_for(command.process_name_list())?,
                Action::ErrorCond => {
                    if let Some(code) = self.first_error(command.process_name_list()) {
                        warn!(code, "error condition met, stopping");
                        return Ok(code);
                    }
                }
                Action::Exit => {
                    self.wait_for(None)?;
                    return Ok(node.exit_code_from_process_name(&self.doc, 0));
                }
                Action::Run => self.run_node(&node, &command)?,
            }
            index += 1;
        }

        self.wait_for(None)?;
        Ok(0)
    }

    fn run_node(&mut self, node: &MacroNode, command: &CommandNode) -> Result<()> {
        // a name list on the action itself gates the launch on all the
        // listed processes having finished with code zero
        if let Some(list) = command.process_name_list() {
            if !self.all_succeeded(list) {
                debug!(line = node.location(), "gate not met, skipping");
                return Ok(());
            }
        }

        let background = match command.modifier() {
            Some(Modifier::Background { names }) => {
                // the modifier's own list is a wait set, not a gate
                if let Some(list) = names {
                    self.wait_for(Some(list))?;
                }
                true
            }
            None => false,
        };

        let command_line = self.build_command_line(node)?;
        debug!(line = node.location(), "spawning {command_line}");
        let mut process = std::process::Command::new(&command_line.program);
        process
            .args(&command_line.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = self.doc.work_dir() {
            process.current_dir(dir);
        }
        let child = process
            .spawn()
            .wrap_err_with(|| format!("failed to start '{command_line}'"))?;

        if background {
            self.background.push((node.process_name().to_owned(), child));
        } else {
            self.reap(node.process_name().to_owned(), child)?;
        }
        Ok(())
    }

    fn build_command_line(&self, node: &MacroNode) -> Result<common::command::Command> {
        let module = resolver::convert_reference(&self.doc, node.module_path());
        if module.to_ascii_lowercase().ends_with(".amf") {
            if self.config.macro_classpath.is_empty() {
                return self.self_invoke_command(node, &module);
            }
            return Ok(node.sub_macro_command(&self.doc, &self.config));
        }
        if !node.available_main_class().is_empty() {
            return Ok(node.java_module_command(&self.doc, &self.config));
        }
        Ok(node.shell_command(&self.doc))
    }

    /// Sub-macro launch without a Java engine classpath: re-invoke this
    /// executable, passing each resolved argument as a positional macro
    /// arg so the child resolves `${1}`, `${2}`, ...
    fn self_invoke_command(
        &self,
        node: &MacroNode,
        module: &str,
    ) -> Result<common::command::Command> {
        let exe = std::env::current_exe().wrap_err("cannot locate own executable")?;
        let mut args = vec!["run".to_owned()];
        args.extend(self.config.inherited_options.iter().cloned());
        args.push(module.to_owned());
        for (position, value) in node.resolved_arguments(&self.doc, true).iter().enumerate() {
            args.push("--arg".to_owned());
            args.push(format!("{}={value}", position + 1));
        }
        Ok(common::command::Command::new(
            exe.to_string_lossy().into_owned(),
            args,
        ))
    }

    /// Wait for the named background children, or all of them.
    fn wait_for(&mut self, names: Option<&NameList>) -> Result<()> {
        let mut remaining = Vec::new();
        for (name, child) in std::mem::take(&mut self.background) {
            let wanted = match names {
                Some(list) => list.names().iter().any(|n| n == &name),
                None => true,
            };
            if wanted {
                self.reap(name, child)?;
            } else {
                remaining.push((name, child));
            }
        }
        self.background = remaining;
        Ok(())
    }

    fn reap(&mut self, name: String, mut child: Child) -> Result<()> {
        let status = child
            .wait()
            .wrap_err_with(|| format!("failed waiting for process '{name}'"))?;
        let code = status.code().unwrap_or(-1);
        if code != 0 {
            warn!(process = %name, code, "process finished with a non-zero code");
        }
        if !name.is_empty() {
            self.doc.put_process_exit_code(name, code);
        }
        Ok(())
    }

    fn all_succeeded(&self, list: &NameList) -> bool {
        list.names()
            .iter()
            .all(|name| self.doc.process_exit_code(name) == Some(0))
    }

    /// The first failing exit code among the listed processes, or among
    /// every recorded one when no list is given.
    fn first_error(&self, names: Option<&NameList>) -> Option<i32> {
        match names {
            Some(list) => list
                .names()
                .iter()
                .filter_map(|name| self.doc.process_exit_code(name))
                .find(|code| *code != 0),
            None => self
                .doc
                .recorded_exit_codes()
                .map(|(_, code)| code)
                .find(|code| *code != 0),
        }
    }

    /// Create one backing file per distinct temp-file reference found
    /// in the document's argument values.
    fn provision_temp_files(&mut self) -> Result<()> {
        let mut ids = Vec::new();
        for node in self.doc.nodes() {
            collect_temp_ids(node.module_path(), &mut ids);
            for argument in node.arguments() {
                collect_temp_ids(argument.value(), &mut ids);
            }
        }
        if ids.is_empty() {
            return Ok(());
        }

        let dir = tempfile::tempdir().wrap_err("cannot create temp directory")?;
        for (n, id) in ids.iter().enumerate() {
            let path = dir.path().join(format!("amacro-{n}.tmp"));
            std::fs::File::create(&path)
                .wrap_err_with(|| format!("cannot create temp file for {id}"))?;
            debug!(%id, path = %path.display(), "provisioned temp file");
            self.doc.put_temp_file(id.clone(), path);
        }
        self.temp_dir = Some(dir);
        Ok(())
    }
}

/// Append every distinct normalized `$tmp{id}` token embedded in `text`.
fn collect_temp_ids(text: &str, ids: &mut Vec<String>) {
    let mut pos = 0;
    while let Some(start) = refs::find_reference_start(text, pos) {
        if !refs::is_temporary_at(text, start) {
            pos = start + refs::REF_OPEN.len();
            continue;
        }
        let body_start = start + refs::TMP_OPEN.len();
        let Some(end) = refs::find_reference_end(text, body_start) else {
            return;
        };
        if let Some(id) = refs::valid_temporary_id(&text[start..=end]) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        pos = end + 1;
    }
}
