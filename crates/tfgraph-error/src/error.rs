//! The error value shared by every tfgraph crate.

use std::error::Error as StdError;
use std::fmt;

use crate::ErrorKind;

type Source = Box<dyn StdError + Send + Sync + 'static>;

/// An error raised while loading input, configuring a provider or running a
/// handler.
///
/// Besides the kind and message it records the operation that raised it, the
/// operations it passed through on the way up, and key/value context naming
/// the provider, handler, node or file involved.
pub struct Error {
    kind: ErrorKind,
    message: String,
    operation: Option<&'static str>,
    callers: Vec<&'static str>,
    context: Vec<(&'static str, String)>,
    source: Option<Source>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            operation: None,
            callers: Vec::new(),
            context: Vec::new(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The operation that last tagged the error, e.g. `registry::get_context`.
    pub fn operation(&self) -> Option<&'static str> {
        self.operation
    }

    /// Operations the error was raised in before the current one, innermost first.
    pub fn callers(&self) -> &[&'static str] {
        &self.callers
    }

    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find_map(|(k, v)| (*k == key).then_some(v.as_str()))
    }

    /// Tag the error with the operation reporting it. A previously set
    /// operation moves to [`Error::callers`].
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if let Some(previous) = self.operation.replace(operation) {
            self.callers.push(previous);
        }
        self
    }

    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Attach the underlying error. The first source attached wins.
    pub fn set_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        if self.source.is_none() {
            self.source = Some(Box::new(source));
        }
        self
    }

    /// Whether the pipeline may skip the failing handler and continue.
    pub fn is_recoverable(&self) -> bool {
        self.kind.is_recoverable()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(operation) = self.operation {
            write!(f, " in {operation}")?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }

        let mut notes: Vec<String> = self.context.iter().map(|(k, v)| format!("{k}={v}")).collect();
        if !self.callers.is_empty() {
            notes.push(format!("via {}", self.callers.join(" < ")));
        }
        if !notes.is_empty() {
            write!(f, " [{}]", notes.join(", "))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Error");
        out.field("kind", &self.kind).field("message", &self.message);
        if let Some(operation) = self.operation {
            out.field("operation", &operation);
        }
        if !self.callers.is_empty() {
            out.field("callers", &self.callers);
        }
        if !self.context.is_empty() {
            out.field("context", &self.context);
        }
        if let Some(source) = &self.source {
            out.field("source", source);
        }
        out.finish()
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn StdError + 'static))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let kind = if err.kind() == std::io::ErrorKind::NotFound {
            ErrorKind::FileNotFound
        } else {
            ErrorKind::IoFailed
        };
        Error::new(kind, err.to_string()).set_source(err)
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::unexpected(message)
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::unexpected(message)
    }
}

// Constructors for the kinds the engine raises itself.
impl Error {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Resources of `child_type` exist but no `parent_type` node to place
    /// them under does.
    pub fn missing_resource(parent_type: impl Into<String>, child_type: impl Into<String>) -> Self {
        let (parent_type, child_type) = (parent_type.into(), child_type.into());
        Self::new(
            ErrorKind::MissingResource,
            format!("found '{child_type}' resources but no '{parent_type}' to place them under"),
        )
        .with_context("parent_type", parent_type)
        .with_context("child_type", child_type)
    }

    pub fn metadata_inconsistency(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MetadataInconsistency, message)
    }

    pub fn provider_detection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProviderDetection, message)
    }

    pub fn unknown_provider(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(ErrorKind::UnknownProvider, format!("no such provider '{name}'"))
            .with_context("provider", name)
    }

    pub fn provider_conflict(name: impl Into<String>, existing: impl Into<String>) -> Self {
        let (name, existing) = (name.into(), existing.into());
        Self::new(
            ErrorKind::ProviderConflict,
            format!("'{name}' is already registered by provider '{existing}'"),
        )
        .with_context("name", name)
        .with_context("existing", existing)
    }

    pub fn registry_sealed(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorKind::RegistrySealed,
            format!("cannot register provider '{name}' after detection has started"),
        )
        .with_context("provider", name)
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    pub fn invariant_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvariantViolation, message)
    }
}
