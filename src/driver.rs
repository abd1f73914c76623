//! Driver & public API (§2.1, §4.9) — the single entry point that ties the front end
//! (§4.0), resolver (§4.1), grammar builder/analyzer (§4.2/§4.3), and code generator
//! (§4.4/§4.5) together into one `compile(source) -> CompiledModule` call, the way a parser
//! object owns a root production and runs the pipeline to completion rather than leaving
//! callers to wire the passes by hand.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::ast::module::Module;
use crate::codegen::interp::{GrammarTable, Value};
use crate::codegen::parser_gen::ParserInfo;
use crate::codegen::{hilti, interp, sync_gen, ParseSignal};
use crate::error::CompileError;
use crate::grammar::{analyze, GrammarBuilder};
use crate::id::Id;
use crate::runtime::mime::MimeRegistry;
use crate::scope::resolve_module;

/// Compile-time knobs an embedder passes to [Driver::compile] (§1.1 "Configuration" —
/// plain constructor arguments rather than a config file, since this crate is a library,
/// not a CLI).
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Gates `debug`-marked hooks (§4.4 "A hook marked as debug is only emitted when
    /// debugging is compiled in").
    pub debug: bool,
    /// Whether a `RuntimeError::Parse` on a unit that requested `&synchronize` should be
    /// recovered from automatically by [CompiledModule::parse_with_recovery], or surfaced
    /// unchanged for the embedder to handle itself.
    pub synchronize_on_error: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { debug: false, synchronize_on_error: true }
    }
}

/// The result of a successful [Driver::compile]: the resolved AST, every unit's built and
/// analyzed grammar, the §6 Runtime ABI descriptor for each exported unit, the rendered
/// HILTI-ish text (§6 "Output"), and a ready-to-use [MimeRegistry] (§2 "emit init code
/// registering parsers with the runtime").
pub struct CompiledModule {
    pub module: Module,
    pub hilti: String,
    pub parsers: Vec<ParserInfo>,
    pub mime_registry: MimeRegistry,
    grammars: Rc<GrammarTable>,
    sync_specs: HashMap<Id, sync_gen::SyncSpec>,
    synchronize_on_error: bool,
}

impl CompiledModule {
    pub fn parser(&self, unit: &Id) -> Option<&ParserInfo> {
        self.parsers.iter().find(|p| &p.unit == unit)
    }

    pub fn grammars(&self) -> &GrammarTable {
        &self.grammars
    }

    /// §6 `parse_func(bytes, sink?) -> parse_object`, looked up by unit id rather than
    /// called through a bare function pointer (no linked HILTI backend to hold one, §1).
    pub fn parse(&self, unit: &Id, bytes: &[u8], frozen: bool) -> ParseSignal<Value> {
        interp::parse(&self.grammars, unit, bytes, frozen)
    }

    /// Like [Self::parse], but on a `RuntimeError::Parse` for a unit that declared
    /// `&synchronize` (directly or via its properties), retries once from the
    /// Synchronizer's recovered offset (§4.5) instead of surfacing the error — unless
    /// `synchronize_on_error` was turned off in [CompileOptions].
    pub fn parse_with_recovery(&self, unit: &Id, bytes: &[u8], frozen: bool) -> ParseSignal<Value> {
        match interp::parse(&self.grammars, unit, bytes, frozen) {
            ParseSignal::Error(e @ crate::error::RuntimeError::Parse { .. }) => {
                if !self.synchronize_on_error {
                    return ParseSignal::Error(e);
                }
                let Some(spec) = self.sync_specs.get(unit) else {
                    return ParseSignal::Error(e);
                };
                match sync_gen::scan(spec, bytes, 0, frozen) {
                    sync_gen::ScanResult::Found(offset) => {
                        interp::parse_from(&self.grammars, unit, bytes, offset, frozen)
                    }
                    sync_gen::ScanResult::NeedMoreData => ParseSignal::Yield(crate::codegen::Continuation {
                        frames: vec![],
                        offset: bytes.len(),
                    }),
                    sync_gen::ScanResult::NotFound => {
                        ParseSignal::Error(crate::error::RuntimeError::Synchronization { unit: unit.clone() })
                    }
                }
            }
            other => other,
        }
    }
}

pub struct Driver;

impl Driver {
    /// Runs the whole pipeline over `source`: parse -> lower -> resolve -> build a
    /// grammar for every unit -> analyze (abort if any grammar is ambiguous) -> render
    /// HILTI -> assemble the §6 ABI descriptor for every exported unit.
    pub fn compile(source: &str, options: &CompileOptions) -> Result<CompiledModule, Vec<CompileError>> {
        let module = crate::frontend::parse_module(source)?;
        resolve_module(vec![&module]).map_err(|errs| errs.into_iter().map(CompileError::Scope).collect::<Vec<_>>())?;

        let mut builder = GrammarBuilder::new();
        let mut grammars = GrammarTable::new();
        let mut errors = Vec::new();
        for unit in &module.units {
            let mut grammar = builder.build(unit);
            if let Err(e) = analyze(&mut grammar) {
                errors.push(CompileError::Grammar(e));
                continue;
            }
            grammars.insert(unit.id.clone(), grammar);
        }
        errors.extend(builder.take_errors().into_iter().map(CompileError::Type));
        if !errors.is_empty() {
            return Err(errors);
        }

        let mut sync_specs = HashMap::new();
        for unit in &module.units {
            match sync_gen::anchor_for_unit(unit) {
                Ok(Some(spec)) => {
                    sync_specs.insert(unit.id.clone(), spec);
                }
                Ok(None) => {}
                Err(e) => errors.push(CompileError::Grammar(e)),
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let grammars = Rc::new(grammars);
        let mut hilti_text = String::new();
        let mut parsers = Vec::new();
        let mut mime_registry = MimeRegistry::new();
        for unit in module.exported_units() {
            if let Some(grammar) = grammars.get(&unit.id) {
                hilti_text.push_str(&hilti::render(grammar));
            }
            let info = ParserInfo::new(unit, Rc::clone(&grammars));
            if options.debug {
                log::debug!("registering exported parser `{}`", info.name);
            }
            if info.has_mime_type() {
                mime_registry.register(&info);
            }
            parsers.push(info);
        }

        Ok(CompiledModule {
            module,
            hilti: hilti_text,
            parsers,
            mime_registry,
            grammars,
            sync_specs,
            synchronize_on_error: options.synchronize_on_error,
        })
    }

    /// §4.9/§6 "opt-in on-disk cache of compiled HILTI modules keyed by a content hash of
    /// source plus options": if `cache_dir` already holds a rendered-HILTI file for this
    /// exact `(source, options)` pair, this still re-runs [Self::compile] (the cache only
    /// ever held the textual HILTI render, never the live `CompiledModule` state a
    /// caller needs back), but skips writing it again; a fresh combination is compiled
    /// once and its rendered HILTI text persisted for the next process to reuse for
    /// inspection/diffing.
    pub fn compile_cached(
        source: &str,
        options: &CompileOptions,
        cache_dir: &Path,
    ) -> Result<CompiledModule, Vec<CompileError>> {
        let compiled = Self::compile(source, options)?;
        let key = content_hash(source, options);
        let path = cache_path(cache_dir, key);
        if !path.exists() {
            if std::fs::create_dir_all(cache_dir).is_ok() {
                let _ = std::fs::write(&path, &compiled.hilti);
            }
        }
        Ok(compiled)
    }
}

fn content_hash(source: &str, options: &CompileOptions) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    source.hash(&mut hasher);
    options.debug.hash(&mut hasher);
    options.synchronize_on_error.hash(&mut hasher);
    hasher.finish()
}

fn cache_path(cache_dir: &Path, key: u64) -> PathBuf {
    cache_dir.join(format!("{key:016x}.hlt"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_minimal_module_and_parses_it() {
        let source = "module Test; export Packet; type Packet = unit { x: uint8; y: uint16; };";
        let compiled = Driver::compile(source, &CompileOptions::default()).expect("should compile");
        assert_eq!(compiled.parsers.len(), 1);

        let id = Id::new("Packet");
        match compiled.parse(&id, &[0x01, 0x00, 0x02], true) {
            ParseSignal::Done(Value::Unit(fields), _) => {
                assert_eq!(fields.get("x"), Some(&Value::Integer(1)));
                assert_eq!(fields.get("y"), Some(&Value::Integer(2)));
            }
            other => panic!("expected a parsed unit, got {other:?}"),
        }
    }

    #[test]
    fn unresolved_import_is_reported_as_a_compile_error() {
        let source = "module Test; type Packet = unit { x: Nonexistent.Thing; };";
        let result = Driver::compile(source, &CompileOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn unit_and_field_both_opting_into_synchronize_is_not_a_conflict() {
        let source = "module Test; export Packet; type Packet = unit { \
            x: uint8 &synchronize; %synchronize-after = b\"\\r\\n\"; %synchronize; \
        };";
        let result = Driver::compile(source, &CompileOptions::default());
        assert!(result.is_ok(), "agreement on &synchronize must not be rejected: {result:?}");
    }

    #[test]
    fn field_opting_out_of_a_synchronizing_unit_is_a_conflict() {
        let source = "module Test; export Packet; type Packet = unit { \
            x: uint8 &synchronize=false; %synchronize-after = b\"\\r\\n\"; %synchronize; \
        };";
        let errors = Driver::compile(source, &CompileOptions::default())
            .expect_err("a field that opts out while its unit opts in must be rejected");
        assert!(errors.iter().any(|e| matches!(
            e,
            CompileError::Scope(crate::error::ScopeError::SynchronizeConflict { .. })
        )));
    }

    #[test]
    fn cached_compile_persists_rendered_hilti_to_disk() {
        let dir = std::env::temp_dir().join(format!("binpacpp-cache-test-{:x}", content_hash("marker", &CompileOptions::default())));
        let _ = std::fs::remove_dir_all(&dir);
        let source = "module Test; export Packet; type Packet = unit { x: uint8; };";
        let options = CompileOptions::default();
        let compiled = Driver::compile_cached(source, &options, &dir).expect("should compile");
        assert!(!compiled.hilti.is_empty());
        let key = content_hash(source, &options);
        assert!(cache_path(&dir, key).exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
