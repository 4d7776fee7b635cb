//! Name and URI prefixing applied to mounted servers.
//!
//! Tool and prompt names become `{prefix}_{name}`. Resource URIs and URI
//! templates keep their scheme and gain the prefix as the first path
//! segment: `data://info` mounted under `notes` becomes `data://notes/info`.

const NAME_SEPARATOR: char = '_';
const SCHEME_SEPARATOR: &str = "://";

/// Prefix applied to everything a mounted server exposes (`None` means pass-through).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    prefix: Option<String>,
}

impl Namespace {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    pub fn none() -> Self {
        Self { prefix: None }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Public name of an upstream tool or prompt.
    pub fn apply_name(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}{NAME_SEPARATOR}{name}"),
            None => name.to_string(),
        }
    }

    /// Upstream name for a public tool or prompt name, if it belongs to this namespace.
    pub fn strip_name<'a>(&self, name: &'a str) -> Option<&'a str> {
        match &self.prefix {
            Some(prefix) => name
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix(NAME_SEPARATOR))
                .filter(|rest| !rest.is_empty()),
            None => Some(name),
        }
    }

    /// Public URI (or URI template) of an upstream resource.
    pub fn apply_uri(&self, uri: &str) -> String {
        match (&self.prefix, uri.split_once(SCHEME_SEPARATOR)) {
            (Some(prefix), Some((scheme, rest))) => {
                format!("{scheme}{SCHEME_SEPARATOR}{prefix}/{rest}")
            }
            _ => uri.to_string(),
        }
    }

    /// Upstream URI for a public URI, if it belongs to this namespace.
    pub fn strip_uri(&self, uri: &str) -> Option<String> {
        let Some(prefix) = &self.prefix else {
            return Some(uri.to_string());
        };
        let (scheme, rest) = uri.split_once(SCHEME_SEPARATOR)?;
        let remainder = rest.strip_prefix(prefix.as_str())?.strip_prefix('/')?;
        Some(format!("{scheme}{SCHEME_SEPARATOR}{remainder}"))
    }
}
