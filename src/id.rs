//! A possibly-scoped identifier (§3 Data model, "ID").

use std::fmt;

/// A dotted path of identifier components, e.g. `Foo.Bar.baz`.
///
/// Equality is path-wise, case-sensitive, except that the first component — the module
/// name a scoped ID is qualified with — is compared lower-cased, matching the source
/// language's rule that module names are case-insensitive at the point of `import`.
#[derive(Debug, Clone, Eq)]
pub struct Id {
    components: Vec<String>,
}

impl Id {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            components: vec![component.into()],
        }
    }

    pub fn from_path(components: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let components: Vec<String> = components.into_iter().map(Into::into).collect();
        assert!(!components.is_empty(), "Id must have at least one component");
        Self { components }
    }

    pub fn is_scoped(&self) -> bool {
        self.components.len() > 1
    }

    /// The leading module-qualifying component, if this id is scoped.
    pub fn module(&self) -> Option<&str> {
        if self.components.len() > 1 {
            Some(&self.components[0])
        } else {
            None
        }
    }

    /// The final, unqualified component.
    pub fn local(&self) -> &str {
        self.components.last().expect("Id has at least one component")
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Returns a new id with `prefix` prepended, used by the resolver when it flattens an
    /// imported module's declarations into the importing scope.
    pub fn qualified_with(&self, prefix: &str) -> Id {
        let mut components = vec![prefix.to_string()];
        components.extend(self.components.iter().cloned());
        Id { components }
    }
}

impl PartialEq for Id {
    fn eq(&self, other: &Self) -> bool {
        if self.components.len() != other.components.len() {
            return false;
        }
        self.components
            .iter()
            .zip(other.components.iter())
            .enumerate()
            .all(|(i, (a, b))| {
                if i == 0 && self.components.len() > 1 {
                    a.eq_ignore_ascii_case(b)
                } else {
                    a == b
                }
            })
    }
}

impl std::hash::Hash for Id {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for (i, c) in self.components.iter().enumerate() {
            if i == 0 && self.components.len() > 1 {
                c.to_ascii_lowercase().hash(state);
            } else {
                c.hash(state);
            }
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.components.join("."))
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id::from_path(value.split('.'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unqualified_lookup_is_case_sensitive() {
        assert_ne!(Id::new("Foo"), Id::new("foo"));
    }

    #[test]
    fn module_qualifier_is_case_insensitive() {
        assert_eq!(Id::from("HTTP.Request"), Id::from("http.Request"));
        assert_ne!(Id::from("HTTP.request"), Id::from("http.Request"));
    }

    #[test]
    fn qualified_with_prepends_module() {
        let id = Id::new("Request").qualified_with("HTTP");
        assert_eq!(id.to_string(), "HTTP.Request");
        assert_eq!(id.module(), Some("HTTP"));
        assert_eq!(id.local(), "Request");
    }
}
