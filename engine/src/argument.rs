/// The declared kind of one module argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArgKind {
    /// Input file path, absolutized against the working directory.
    In,
    /// Output file path, absolutized against the working directory.
    Out,
    /// Literal string.
    Str,
    /// Publish channel; the plumbing behind it lives outside the engine.
    Pub,
    /// Subscribe channel.
    Sub,
    /// Unset.
    #[default]
    None,
}

impl ArgKind {
    const TAGGED: [ArgKind; 5] = [
        ArgKind::In,
        ArgKind::Out,
        ArgKind::Str,
        ArgKind::Pub,
        ArgKind::Sub,
    ];

    /// Parse a `[IN]`-style type tag, case-insensitively.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::TAGGED
            .into_iter()
            .find(|kind| tag.eq_ignore_ascii_case(kind.as_tag()))
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            ArgKind::In => "[IN]",
            ArgKind::Out => "[OUT]",
            ArgKind::Str => "[STR]",
            ArgKind::Pub => "[PUB]",
            ArgKind::Sub => "[SUB]",
            ArgKind::None => "",
        }
    }

    /// Whether values of this kind name a filesystem path.
    pub fn is_path(&self) -> bool {
        matches!(self, ArgKind::In | ArgKind::Out)
    }
}

impl std::fmt::Display for ArgKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// One argument to a module invocation. The value may itself contain
/// embedded references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleArgument {
    kind: ArgKind,
    value: String,
}

impl ModuleArgument {
    pub fn new(kind: ArgKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn kind(&self) -> ArgKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Display for ModuleArgument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.kind.as_tag(), self.value)
    }
}
