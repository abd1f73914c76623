//! MIME Registry (§4.7): a process-wide map from MIME type string to the ordered list of
//! parsers registered for it, populated at module-init time from every exported unit's
//! `%mime-type` property and consulted by [crate::runtime::sink::Sink::connect_by_mime].
//!
//! Normalization follows `bp++/libbinpac/mime.c` exactly (§1.2 supplemented feature):
//! `type/*` registers under the major type only, a bare `*` registers under the empty
//! wildcard key, and a lookup unions the exact key, the major-only key, and the wildcard
//! key, in that probe order, preserving registration order within each bucket.

use std::collections::HashMap;

use crate::codegen::parser_gen::ParserInfo;

#[derive(Default)]
pub struct MimeRegistry {
    // Keyed by the normalized registration key: the full type, the major-only type, or
    // the empty string for the wildcard.
    by_key: HashMap<String, Vec<ParserInfo>>,
}

/// Splits `"text/html"` into `("text", Some("html"))`, and `"text"`/`"*"` into
/// `("text", None)`/`("", None)`.
fn normalize(mime_type: &str) -> (String, Option<String>) {
    if mime_type == "*" {
        return (String::new(), None);
    }
    match mime_type.split_once('/') {
        Some((major, "*")) => (major.to_string(), None),
        Some((major, minor)) => (major.to_string(), Some(minor.to_string())),
        None => (mime_type.to_string(), None),
    }
}

/// The key a `%mime-type` declaration registers under: full `"major/minor"`, or just the
/// major type for `"major/*"`/a bare major type, or the empty wildcard key for `"*"`.
fn registration_key(mime_type: &str) -> String {
    let (major, minor) = normalize(mime_type);
    match minor {
        Some(minor) => format!("{major}/{minor}"),
        None => major,
    }
}

/// The three lookup keys [connect_by_mime]-style dispatch probes for `"major/minor"`:
/// the exact key, the major-only key, then the wildcard key — always in this order.
fn lookup_keys(mime_type: &str) -> Vec<String> {
    let (major, minor) = normalize(mime_type);
    let mut keys = Vec::with_capacity(3);
    if let Some(minor) = minor {
        keys.push(format!("{major}/{minor}"));
    }
    if !major.is_empty() {
        keys.push(major);
    }
    keys.push(String::new());
    keys
}

impl MimeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `parser` under its own `%mime-type`, if any (called once per exported
    /// unit during module init — §2 "Control flow... emit init code registering parsers").
    pub fn register(&mut self, parser: &ParserInfo) {
        for mime_type in &parser.mime_types {
            let key = registration_key(mime_type);
            self.by_key.entry(key).or_default().push(parser.clone());
        }
    }

    /// §4.7/§8 property 8 "MIME closure": the parsers attached for `mime_type`, exact
    /// match first, then the major-only bucket, then the wildcard bucket, preserving
    /// registration order within each.
    pub fn resolve(&self, mime_type: &str) -> Vec<ParserInfo> {
        let mut out = Vec::new();
        let mut seen_units = std::collections::HashSet::new();
        for key in lookup_keys(mime_type) {
            if let Some(parsers) = self.by_key.get(&key) {
                for p in parsers {
                    if seen_units.insert(p.unit.clone()) {
                        out.push(p.clone());
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::attribute::{Attribute, AttributeSet};
    use crate::ast::ctor::Ctor;
    use crate::ast::expr::{Expr, ExprKind};
    use crate::ast::unit::Unit;
    use crate::codegen::interp::GrammarTable;
    use crate::id::Id;
    use crate::util::Position;
    use std::rc::Rc;

    fn parser_for(name: &str, mime: &str) -> ParserInfo {
        let at = Position::new(1, 1);
        let mut properties = AttributeSet::new();
        properties.insert(Attribute {
            name: "mime-type".to_string(),
            value: Some(Expr::new(ExprKind::Literal(Ctor::String(mime.to_string())), at)),
            at,
        });
        let unit = Unit {
            id: Id::new(name),
            parameters: vec![],
            variables: vec![],
            fields: vec![],
            properties,
            hooks: vec![],
            at,
        };
        ParserInfo::new(&unit, Rc::new(GrammarTable::new()))
    }

    #[test]
    fn exact_major_and_wildcard_all_match() {
        let mut registry = MimeRegistry::new();
        registry.register(&parser_for("Exact", "text/html"));
        registry.register(&parser_for("Major", "text"));
        registry.register(&parser_for("Wild", "*"));

        let hits = registry.resolve("text/html");
        let names: Vec<_> = hits.iter().map(|p| p.name.clone()).collect();
        assert_eq!(names, vec!["Exact", "Major", "Wild"]);
    }

    #[test]
    fn unrelated_type_only_gets_the_wildcard() {
        let mut registry = MimeRegistry::new();
        registry.register(&parser_for("Exact", "text/html"));
        registry.register(&parser_for("Wild", "*"));

        let hits = registry.resolve("application/json");
        let names: Vec<_> = hits.iter().map(|p| p.name.clone()).collect();
        assert_eq!(names, vec!["Wild"]);
    }

    #[test]
    fn slash_star_registers_under_the_major_only() {
        let mut registry = MimeRegistry::new();
        registry.register(&parser_for("AnyText", "text/*"));

        assert_eq!(registry.resolve("text/plain").len(), 1);
        assert_eq!(registry.resolve("text/html").len(), 1);
        assert!(registry.resolve("application/json").is_empty());
    }
}
