use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use engine::EngineConfig;
use tracing::debug;

use crate::loader::{self, NodeError};
use crate::runner::Runner;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Execute a macro script
    Run(RunArgs),
    /// Parse a macro script and report grammar errors without running it
    Check {
        /// The macro script file
        script: PathBuf,
    },
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// The macro script file
    script: PathBuf,

    /// A macro argument, as name=value; referenced as ${name}
    #[clap(short = 'a', long = "arg", value_parser = parse_macro_arg)]
    args: Vec<(String, String)>,

    /// Working directory for relative IN/OUT paths; defaults to the
    /// script's directory
    #[clap(long)]
    workdir: Option<PathBuf>,

    /// Java executable for module and sub-macro launches
    #[clap(long, default_value = "java")]
    java: String,

    /// Maximum heap for launched modules, e.g. 1024m
    #[clap(long)]
    max_heap: Option<String>,

    /// Encoding for CSV files read and written by modules
    #[clap(long)]
    csv_encoding: Option<String>,

    /// Encoding for text files read and written by modules
    #[clap(long)]
    txt_encoding: Option<String>,

    /// Extra VM option, appended after a module's own; repeatable
    #[clap(long = "vm-option")]
    vm_options: Vec<String>,

    /// Appended to the module classpath of every Java launch
    #[clap(long)]
    library_path: Option<String>,

    /// Java engine classpath for sub-macro launches; without it a
    /// sub-macro re-invokes this executable instead
    #[clap(long, requires = "macro_main_class")]
    macro_classpath: Option<String>,

    /// Main class started on the engine classpath for a sub-macro
    #[clap(long, requires = "macro_classpath")]
    macro_main_class: Option<String>,
}

impl Command {
    pub fn run(self, verbose: bool) -> Result<i32> {
        match self {
            Command::Run(args) => args.run(verbose),
            Command::Check { script } => check(&script),
        }
    }
}

impl RunArgs {
    fn run(self, verbose: bool) -> Result<i32> {
        let loaded = load_reported(&self.script)?;
        if !loaded.errors.is_empty() {
            return Ok(1);
        }

        let mut document = loaded.document;
        let work_dir = self.workdir.clone().or_else(|| {
            self.script
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map(Path::to_path_buf)
        });
        debug!(?work_dir, "working directory");
        document.set_work_dir(work_dir);
        for (name, value) in &self.args {
            document.put_macro_arg(format!("${{{name}}}"), value.clone());
        }

        let inherited_options = self.inherited_options(verbose);
        let config = EngineConfig {
            java_command: self.java,
            csv_encoding: self.csv_encoding,
            txt_encoding: self.txt_encoding,
            verbose,
            max_heap: self.max_heap,
            vm_options: self.vm_options,
            library_path: self.library_path,
            macro_classpath: self.macro_classpath.unwrap_or_default(),
            macro_main_class: self.macro_main_class.unwrap_or_default(),
            inherited_options,
            ..EngineConfig::default()
        };
        Runner::new(document, config).run()
    }

    /// The engine flags a sub-macro launch re-passes to this
    /// executable, so nested runs see the same settings.
    fn inherited_options(&self, verbose: bool) -> Vec<String> {
        let mut options = Vec::new();
        if verbose {
            options.push("--verbose".to_owned());
        }
        if self.java != "java" {
            options.extend(["--java".to_owned(), self.java.clone()]);
        }
        if let Some(heap) = &self.max_heap {
            options.extend(["--max-heap".to_owned(), heap.clone()]);
        }
        if let Some(encoding) = &self.csv_encoding {
            options.extend(["--csv-encoding".to_owned(), encoding.clone()]);
        }
        if let Some(encoding) = &self.txt_encoding {
            options.extend(["--txt-encoding".to_owned(), encoding.clone()]);
        }
        for option in &self.vm_options {
            options.extend(["--vm-option".to_owned(), option.clone()]);
        }
        if let Some(path) = &self.library_path {
            options.extend(["--library-path".to_owned(), path.clone()]);
        }
        if let Some(path) = &self.macro_classpath {
            options.extend(["--macro-classpath".to_owned(), path.clone()]);
        }
        if let Some(class) = &self.macro_main_class {
            options.extend(["--macro-main-class".to_owned(), class.clone()]);
        }
        options
    }
}

fn check(script: &Path) -> Result<i32> {
    let loaded = load_reported(script)?;
    if loaded.errors.is_empty() {
        println!(
            "{}: {} nodes, no errors",
            script.display(),
            loaded.document.nodes().len()
        );
        Ok(0)
    } else {
        Ok(1)
    }
}

fn load_reported(script: &Path) -> Result<loader::LoadedScript> {
    let loaded = loader::load_script(script)
        .wrap_err_with(|| format!("cannot load macro script '{}'", script.display()))?;
    for error in &loaded.errors {
        print_report(script, error)?;
    }
    Ok(loaded)
}

/// Render one grammar error against its command cell, labeled with the
/// script path and line.
fn print_report(script: &Path, error: &NodeError) -> Result<()> {
    let location = format!("{}:{}", script.display(), error.line);
    let text = error.error.text().to_owned();
    error
        .error
        .clone()
        .into_report(&location)
        .eprint((location.as_str(), ariadne::Source::from(&text)))?;
    Ok(())
}

fn parse_macro_arg(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(name, value)| (name.to_owned(), value.to_owned()))
        .ok_or_else(|| format!("expected name=value, got '{s}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_args_split_on_first_equals() {
        assert_eq!(
            parse_macro_arg("in=a=b.csv").unwrap(),
            ("in".to_owned(), "a=b.csv".to_owned())
        );
        assert!(parse_macro_arg("novalue").is_err());
    }

    #[test]
    fn inherited_options_round_trip_the_settings() {
        let args = RunArgs {
            script: PathBuf::from("m.amf"),
            args: Vec::new(),
            workdir: None,
            java: "java".to_owned(),
            max_heap: Some("512m".to_owned()),
            csv_encoding: Some("UTF-8".to_owned()),
            txt_encoding: None,
            vm_options: vec!["-ea".to_owned()],
            library_path: None,
            macro_classpath: Some("/opt/amacro.jar".to_owned()),
            macro_main_class: Some("amacro.Main".to_owned()),
        };
        assert_eq!(
            args.inherited_options(true),
            [
                "--verbose",
                "--max-heap",
                "512m",
                "--csv-encoding",
                "UTF-8",
                "--vm-option",
                "-ea",
                "--macro-classpath",
                "/opt/amacro.jar",
                "--macro-main-class",
                "amacro.Main",
            ]
        );
    }

    #[test]
    fn engine_classpath_flags_parse_together() {
        use clap::Parser;

        let opts = crate::Opts::try_parse_from([
            "amacro",
            "run",
            "m.amf",
            "--macro-classpath",
            "/opt/amacro.jar",
            "--macro-main-class",
            "amacro.Main",
        ])
        .unwrap();
        let Command::Run(args) = opts.command else {
            panic!("expected the run subcommand");
        };
        assert_eq!(args.macro_classpath.as_deref(), Some("/opt/amacro.jar"));
        assert_eq!(args.macro_main_class.as_deref(), Some("amacro.Main"));

        // one without the other is rejected
        assert!(crate::Opts::try_parse_from([
            "amacro",
            "run",
            "m.amf",
            "--macro-classpath",
            "/opt/amacro.jar",
        ])
        .is_err());
    }
}
