//! Error types for the compiler.

/// Result type alias for compiler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The kind of failure, with its user-facing message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    /// The grammar could not consume the input.
    #[error("{0}")]
    Parse(String),

    /// A production committed past the point of a viable alternative.
    #[error("{0}")]
    Syntax(String),

    /// A variable reference that no enclosing scope defines.
    #[error("variable {0} is undefined")]
    UndefinedVariable(String),

    /// A mixin call whose selector is not found in any scope.
    #[error("`{0}` is undefined")]
    UndefinedMixin(String),

    /// A mixin selector was found but none of its definitions accepted the arguments.
    #[error("No matching definition was found for `{0}`")]
    NoMatchingDefinition(String),

    /// A named mixin parameter has neither an argument nor a default.
    #[error("wrong number of arguments for {mixin} ({given} for {arity})")]
    ArgumentCount {
        mixin: String,
        given: usize,
        required: usize,
        arity: usize,
    },

    /// Type-incompatible arithmetic.
    #[error("{0}")]
    Operation(String),

    /// A built-in function was called with unusable arguments.
    #[error("error evaluating function `{function}`: {message}")]
    Argument { function: String, message: String },

    /// A variable whose value refers back to itself.
    #[error("recursive variable definition for {0}")]
    RecursiveVariable(String),

    /// Mixin expansion nested deeper than the configured limit.
    #[error("mixin expansion exceeded the maximum depth of {0}")]
    RecursionLimit(usize),

    /// An import that the importer could not resolve.
    #[error("Error parsing `{0}`")]
    Import(String),
}

impl ErrorKind {
    /// Short category name used when reporting the error.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Parse(_) => "Parse",
            Self::Syntax(_) => "Syntax",
            Self::UndefinedVariable(_) | Self::UndefinedMixin(_) => "Name",
            Self::NoMatchingDefinition(_) | Self::RecursionLimit(_) => "Runtime",
            Self::ArgumentCount { .. } | Self::Argument { .. } => "Argument",
            Self::Operation(_) => "Operation",
            Self::RecursiveVariable(_) => "Name",
            Self::Import(_) => "Import",
        }
    }
}

/// A compiler error with the source offsets needed to locate it.
///
/// Offsets are global positions in the compile's [`SourceMap`](crate::SourceMap);
/// turn an `Error` into a [`Diagnostic`](crate::Diagnostic) to get file, line
/// and column information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    kind: ErrorKind,
    index: Option<usize>,
    call: Option<usize>,
}

impl Error {
    /// Create an error with no location.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            index: None,
            call: None,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>, index: usize) -> Self {
        Self::new(ErrorKind::Parse(message.into())).at(index)
    }

    /// Create a structural syntax error.
    pub fn syntax(message: impl Into<String>, index: usize) -> Self {
        Self::new(ErrorKind::Syntax(message.into())).at(index)
    }

    /// Create an undefined variable error.
    pub fn undefined_variable(name: impl Into<String>, index: usize) -> Self {
        Self::new(ErrorKind::UndefinedVariable(name.into())).at(index)
    }

    /// Create an undefined mixin error.
    pub fn undefined_mixin(selector: impl Into<String>, index: usize) -> Self {
        Self::new(ErrorKind::UndefinedMixin(selector.into())).at(index)
    }

    /// Create a "no matching definition" error for a rendered call.
    pub fn no_matching_definition(call: impl Into<String>, index: usize) -> Self {
        Self::new(ErrorKind::NoMatchingDefinition(call.into())).at(index)
    }

    /// Create a parameter count error.
    pub fn argument_count(
        mixin: impl Into<String>,
        given: usize,
        required: usize,
        arity: usize,
    ) -> Self {
        Self::new(ErrorKind::ArgumentCount {
            mixin: mixin.into(),
            given,
            required,
            arity,
        })
    }

    /// Create an operation error.
    pub fn operation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Operation(message.into()))
    }

    /// Create a built-in function argument error.
    pub fn argument(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Argument {
            function: function.into(),
            message: message.into(),
        })
    }

    /// Create an import failure.
    pub fn import(path: impl Into<String>, index: usize) -> Self {
        Self::new(ErrorKind::Import(path.into())).at(index)
    }

    /// Set the offset of the error site.
    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the offset of the error site unless one is already known.
    pub fn or_at(mut self, index: usize) -> Self {
        self.index.get_or_insert(index);
        self
    }

    /// Record the mixin call the error escaped through.
    ///
    /// Nested calls overwrite each other, so the outermost call wins.
    pub fn within_call(mut self, call: usize) -> Self {
        self.call = Some(call);
        self
    }

    /// The kind of failure.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Global offset of the error site.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Global offset of the outermost mixin call the error escaped through.
    pub fn call(&self) -> Option<usize> {
        self.call
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::undefined_variable("@x", 3).to_string(),
            "variable @x is undefined"
        );
        assert_eq!(
            Error::undefined_mixin(".m", 0).to_string(),
            "`.m` is undefined"
        );
        assert_eq!(
            Error::no_matching_definition(".m(triangle)", 0).to_string(),
            "No matching definition was found for `.m(triangle)`"
        );
        assert_eq!(
            Error::argument_count(".m", 1, 2, 2).to_string(),
            "wrong number of arguments for .m (1 for 2)"
        );
        assert_eq!(Error::import("a.less", 0).to_string(), "Error parsing `a.less`");
    }

    #[test]
    fn test_location_helpers() {
        let err = Error::operation("bad").or_at(4).or_at(9);
        assert_eq!(err.index(), Some(4));

        let err = err.within_call(1).within_call(0);
        assert_eq!(err.call(), Some(0));
        assert_eq!(err.kind().name(), "Operation");
    }
}
