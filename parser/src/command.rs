use crate::span::Span;
use ariadne::{Color, Fmt, Label, Report, ReportKind};
use chumsky::prelude::*;
use std::str::FromStr;

/// The action of a single macro command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Run,
    Echo,
    ErrorCond,
    Comment,
    Exit,
    Wait,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Run => "RUN",
            Action::Echo => "ECHO",
            Action::ErrorCond => "ERRORCOND",
            Action::Comment => "COMMENT",
            Action::Exit => "EXIT",
            Action::Wait => "WAIT",
        }
    }
}

impl FromStr for Action {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RUN" => Ok(Action::Run),
            "ECHO" => Ok(Action::Echo),
            "ERRORCOND" => Ok(Action::ErrorCond),
            "COMMENT" => Ok(Action::Comment),
            "EXIT" => Ok(Action::Exit),
            "WAIT" => Ok(Action::Wait),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parenthesized, comma-separated list of process names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameList(pub Vec<String>);

impl NameList {
    pub fn names(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Display for NameList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.0.join(","))
    }
}

/// An optional qualifier attached to the action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modifier {
    /// `&`: launch without waiting for completion. The optional name
    /// list holds processes that must finish before the launch.
    Background { names: Option<NameList> },
}

/// The structured form of one macro command string, e.g. `RUN`,
/// `RUN(P1,P2)` or `RUN&(P1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandNode {
    action: Action,
    modifier: Option<Modifier>,
    names: Option<NameList>,
}

impl CommandNode {
    pub fn action(&self) -> Action {
        self.action
    }

    pub fn has_modifier(&self) -> bool {
        self.modifier.is_some()
    }

    pub fn modifier(&self) -> Option<&Modifier> {
        self.modifier.as_ref()
    }

    /// The process-name list the action directly targets, e.g. the
    /// gating list of `RUN(P1,P2)` or `ERRORCOND(P1)`.
    pub fn has_process_name_list(&self) -> bool {
        self.names.is_some()
    }

    pub fn process_name_list(&self) -> Option<&NameList> {
        self.names.as_ref()
    }
}

impl std::fmt::Display for CommandNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.action.as_str())?;
        if let Some(Modifier::Background { names }) = &self.modifier {
            f.write_str("&")?;
            if let Some(names) = names {
                names.fmt(f)?;
            }
        }
        if let Some(names) = &self.names {
            names.fmt(f)?;
        }
        Ok(())
    }
}

fn command() -> impl Parser<char, CommandNode, Error = Simple<char, Span>> {
    let name = filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
        .repeated()
        .at_least(1)
        .collect::<String>()
        .padded()
        .labelled("process name");

    let name_list = name
        .separated_by(just(','))
        .at_least(1)
        .delimited_by(just('('), just(')'))
        .map(NameList)
        .labelled("process name list");

    let action = text::ident::<char, Simple<char, Span>>()
        .try_map(|ident: String, span| {
            Action::from_str(&ident)
                .map_err(|_| Simple::custom(span, format!("unrecognized command '{ident}'")))
        })
        .labelled("command");

    action
        .padded()
        .then(just('&').padded().or_not())
        .then(name_list.padded().or_not())
        .then_ignore(end())
        .map(|((action, background), names)| match background {
            Some(_) => CommandNode {
                action,
                modifier: Some(Modifier::Background { names }),
                names: None,
            },
            None => CommandNode {
                action,
                modifier: None,
                names,
            },
        })
}

/// Parse a single macro command string into its structured form.
/// Parsing is idempotent: equal text yields an equal node.
pub fn parse_command(text: &str) -> Result<CommandNode, CommandError> {
    command()
        .parse(crate::stream_from_str(text))
        .map_err(|errors| CommandError::new(text, errors))
}

/// A hard grammar error: the command text matches no recognized action
/// grammar. The owning node stays unusable until the text is corrected.
#[derive(Debug, Clone)]
pub struct CommandError {
    text: String,
    error: Simple<char, Span>,
}

impl CommandError {
    fn new(text: &str, errors: Vec<Simple<char, Span>>) -> Self {
        let fallback = Simple::custom(Span::new(0, text.len()), "invalid command");
        Self {
            text: text.to_owned(),
            error: errors.into_iter().next().unwrap_or(fallback),
        }
    }

    /// The offending command text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn span(&self) -> Span {
        self.error.span()
    }

    pub fn into_report<'a>(
        self,
        filename: &'a str,
    ) -> Report<(&'a str, std::ops::Range<usize>)> {
        fn char_or_end(c: &Option<char>) -> String {
            match c {
                Some(c) => format!("'{c}'"),
                None => "end of command".to_string(),
            }
        }

        let span = self.error.span();
        let report = Report::build(ReportKind::Error, filename, span.start);

        match self.error.reason() {
            chumsky::error::SimpleReason::Custom(msg) => report
                .with_message(msg)
                .with_label(
                    Label::new((filename, span.as_range()))
                        .with_message(format!("{}", msg.fg(Color::Red)))
                        .with_color(Color::Red),
                )
                .finish(),
            _ => report
                .with_message(format!(
                    "Unexpected {}, expected {}",
                    char_or_end(&self.error.found().copied()),
                    match self.error.expected().len() {
                        0 => "something else".to_string(),
                        _ => format!(
                            "one of {}",
                            self.error
                                .expected()
                                .map(char_or_end)
                                .collect::<Vec<_>>()
                                .join(", ")
                        ),
                    }
                ))
                .with_label(
                    Label::new((filename, span.as_range()))
                        .with_message(format!(
                            "Unexpected {}",
                            char_or_end(&self.error.found().copied()).fg(Color::Red)
                        ))
                        .with_color(Color::Red),
                )
                .finish(),
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.error.reason() {
            chumsky::error::SimpleReason::Custom(msg) => {
                write!(f, "{} in '{}'", msg, self.text)
            }
            _ => write!(f, "invalid command syntax in '{}'", self.text),
        }
    }
}

impl std::error::Error for CommandError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_actions() {
        for (text, action) in [
            ("RUN", Action::Run),
            ("ECHO", Action::Echo),
            ("ERRORCOND", Action::ErrorCond),
            ("COMMENT", Action::Comment),
            ("EXIT", Action::Exit),
            ("WAIT", Action::Wait),
            ("run", Action::Run),
        ] {
            let node = parse_command(text).unwrap();
            assert_eq!(node.action(), action);
            assert!(!node.has_modifier());
            assert!(!node.has_process_name_list());
        }
    }

    #[test]
    fn parses_process_name_list() {
        let node = parse_command("RUN(ProcA, ProcB)").unwrap();
        assert_eq!(node.action(), Action::Run);
        assert_eq!(
            node.process_name_list().unwrap().names(),
            ["ProcA".to_string(), "ProcB".to_string()]
        );
    }

    #[test]
    fn parses_background_modifier() {
        let node = parse_command("RUN&").unwrap();
        assert!(matches!(
            node.modifier(),
            Some(Modifier::Background { names: None })
        ));
        assert!(!node.has_process_name_list());

        let node = parse_command("RUN&(P1,P2)").unwrap();
        match node.modifier() {
            Some(Modifier::Background { names: Some(names) }) => {
                assert_eq!(names.names(), ["P1".to_string(), "P2".to_string()]);
            }
            other => panic!("unexpected modifier: {other:?}"),
        }
        // The list belongs to the modifier, not the action
        assert!(!node.has_process_name_list());
    }

    #[test]
    fn rejects_unknown_actions_and_garbage() {
        assert!(parse_command("LAUNCH").is_err());
        assert!(parse_command("RUN extra").is_err());
        assert!(parse_command("RUN(").is_err());
        assert!(parse_command("RUN()").is_err());
        assert!(parse_command("").is_err());
    }

    #[test]
    fn parse_is_idempotent_over_display() {
        for text in ["RUN", "RUN(P1,P2)", "RUN&(P1)", "echo", "WAIT(A)"] {
            let first = parse_command(text).unwrap();
            let second = parse_command(&first.to_string()).unwrap();
            assert_eq!(first, second);
        }
    }
}
