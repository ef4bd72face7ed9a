//! The stateful, Ajv-style facade over the validator compiler.
//!
//! [`Validator`]/[`ValidationOptions`] compile a single schema value. An
//! [`Orchestrator`] goes one level up: it keeps a mutable registry of named
//! schemas, formats, and custom keywords behind one object, so callers can
//! register a set of schemas up front (by `$id`) and have later `$ref`s
//! resolve against the whole set, add/remove keywords and formats at
//! runtime, and fetch missing external schemas on demand.
//!
//! Every table lives behind a lock taken internally by `&self` methods —
//! there is no ambient global state beyond the crate's existing `Lazy`
//! immutable meta-schema data.
use crate::{
    keywords::{custom::KeywordFactory, format::Format},
    logger::{Logger, NoopLogger},
    paths::{JsonPointer, LazyLocation},
    primitive_type::PrimitiveType,
    rules::{RuleType, Rules},
    Draft, ErrorIterator, Keyword, Retrieve, ValidationError, ValidationOptions, Validator,
};
use ahash::{AHashMap, AHashSet};
use referencing::Resource;
use serde_json::Value;
use std::{
    fmt,
    sync::{Arc, Mutex, RwLock},
};

/// How strictly [`Orchestrator::validate_schema`] is enforced when a schema
/// is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaValidationMode {
    /// Never check a registered schema against its meta-schema.
    Disabled,
    /// Check, and report failures through the configured [`crate::Logger`]
    /// instead of failing the registration.
    Log,
    /// Check, and fail the registration on the first violation.
    Throw,
}

/// What a `refs` table entry points at: a schema body registered directly,
/// or an alias that must be looked up again under a different key.
#[derive(Debug, Clone)]
enum RefEntry {
    Direct(Arc<Value>),
    Alias(String),
}

/// Declarative configuration for a custom keyword, mirroring Ajv's keyword
/// definition object (`def.type`, `def.metaSchema`, `def.$data`, `def.before`).
#[derive(Default)]
pub struct KeywordDefinition {
    /// An existing keyword this one is dispatched immediately ahead of.
    pub before: Option<String>,
    /// Instance types this keyword applies to; empty means every type.
    pub types: Vec<PrimitiveType>,
    /// Whether `{"$data": "<pointer>"}` is accepted in place of a literal
    /// schema value for this keyword. Only takes effect while the
    /// orchestrator's own `$data` support ([`Orchestrator::set_data_refs`])
    /// is also enabled.
    pub data: bool,
    /// A schema the keyword's own schema-side value must satisfy, compiled
    /// once at registration time and checked on every use of the keyword.
    pub meta_schema: Option<Value>,
}

/// Summary of a previously registered custom keyword, returned by
/// [`Orchestrator::get_keyword`].
#[derive(Debug, Clone)]
pub struct KeywordInfo {
    /// Instance types this keyword applies to; empty means every type.
    pub types: Vec<PrimitiveType>,
    /// Whether this keyword accepts a `{"$data": "<pointer>"}` value.
    pub data: bool,
    /// Whether a meta-schema is checked against this keyword's value.
    pub has_meta_schema: bool,
}

/// A registered custom keyword: its factory, plus the bookkeeping needed to
/// enforce `def.type`/`def.metaSchema` that a bare [`KeywordFactory`] can't
/// express on its own.
struct CustomKeywordEntry {
    factory: Arc<dyn KeywordFactory>,
    types: Vec<PrimitiveType>,
    data: bool,
    meta_schema: Option<Arc<Validator>>,
}

/// Whether `instance`'s JSON type is among `types` (empty means "any type");
/// `Integer` additionally matches a `Number` with an integral value, mirroring
/// the `type` keyword's own integer/number distinction.
fn type_matches(types: &[PrimitiveType], instance: &Value) -> bool {
    if types.is_empty() {
        return true;
    }
    let direct = PrimitiveType::from(instance);
    types.iter().any(|declared| {
        *declared == direct
            || (*declared == PrimitiveType::Integer
                && instance.as_f64().is_some_and(|n| n.trunc() == n))
    })
}

/// A keyword wrapper that only delegates to `inner` when the instance's type
/// is among `types`, otherwise treating the keyword as satisfied — the same
/// self-guarding pattern the crate's own type-bucketed keywords use.
struct TypeScopedKeyword {
    inner: Box<dyn Keyword>,
    types: Vec<PrimitiveType>,
}

impl Keyword for TypeScopedKeyword {
    fn validate<'instance>(
        &self,
        instance: &'instance Value,
        instance_path: &LazyLocation,
    ) -> ErrorIterator<'instance> {
        if type_matches(&self.types, instance) {
            self.inner.validate(instance, instance_path)
        } else {
            crate::error::no_error()
        }
    }
    fn is_valid(&self, instance: &Value) -> bool {
        !type_matches(&self.types, instance) || self.inner.is_valid(instance)
    }
}

/// A keyword with no validation semantics of its own, used by
/// [`Orchestrator::add_vocabulary`] to register a keyword name as
/// recognized (so strict mode and duplicate checks see it) without giving
/// it any behavior.
struct AnnotationKeyword;

impl Keyword for AnnotationKeyword {
    fn validate<'instance>(
        &self,
        _instance: &'instance Value,
        _instance_path: &LazyLocation,
    ) -> ErrorIterator<'instance> {
        crate::error::no_error()
    }
    fn is_valid(&self, _instance: &Value) -> bool {
        true
    }
}

/// Wrap `schema` in `{"anyOf": [schema, <"$data" reference shape>]}`, the
/// alternation Ajv's `$dataMetaSchema` installs so a `$data`-capable
/// keyword's value may be either the literal shape or a runtime
/// `{"$data": "<pointer>"}` reference.
fn data_reference_alternation(schema: Value) -> Value {
    serde_json::json!({
        "anyOf": [
            schema,
            {
                "type": "object",
                "required": ["$data"],
                "additionalProperties": false,
                "properties": { "$data": { "type": "string" } }
            }
        ]
    })
}

/// Failure modes surfaced by [`Orchestrator`] operations.
#[derive(Debug)]
pub enum CompilationError {
    /// `validate`/`get_schema` was given a key with nothing registered under it.
    UnknownSchemaKey(String),
    /// `add_schema` was given a key that is already registered.
    DuplicateSchemaId(String),
    /// A keyword name failed the naming rule, or is already registered.
    InvalidKeyword(String),
    /// `remove_schema`/`add_schema` received something other than a key,
    /// schema value, or `None`.
    InvalidRemoveArgument,
    /// `compile_async` hit a `$ref` that neither the registry nor the
    /// configured [`Retrieve`] loader could resolve.
    UnresolvableRef {
        missing_schema: String,
        missing_ref: String,
    },
    /// `compile_async` was asked to chase a missing `$ref` without a loader configured.
    LoadSchemaNotConfigured,
    /// The schema failed validation against its own meta-schema.
    SchemaValidation(Vec<String>),
    /// The underlying compiler rejected the schema.
    Compilation(String),
}

impl fmt::Display for CompilationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilationError::UnknownSchemaKey(key) => {
                write!(f, "no schema is registered under key `{key}`")
            }
            CompilationError::DuplicateSchemaId(key) => {
                write!(f, "a schema is already registered under key `{key}`")
            }
            CompilationError::InvalidKeyword(keyword) => {
                write!(f, "invalid or duplicate keyword: `{keyword}`")
            }
            CompilationError::InvalidRemoveArgument => {
                f.write_str("argument must be a schema key, a schema object, or absent")
            }
            CompilationError::UnresolvableRef {
                missing_schema,
                missing_ref,
            } => write!(
                f,
                "can't resolve reference `{missing_ref}`: schema `{missing_schema}` is not registered and could not be loaded"
            ),
            CompilationError::LoadSchemaNotConfigured => {
                f.write_str("encountered a missing reference, but no retriever was configured to load it")
            }
            CompilationError::SchemaValidation(errors) => {
                write!(f, "schema is invalid: {}", errors.join("; "))
            }
            CompilationError::Compilation(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for CompilationError {}

impl From<ValidationError<'_>> for CompilationError {
    fn from(error: ValidationError<'_>) -> Self {
        CompilationError::Compilation(error.to_string())
    }
}

fn canonical_key(schema: &Value) -> String {
    // `serde_json::Map` is backed by a `BTreeMap` in this build (the
    // `preserve_order` feature is not enabled), so serializing already
    // yields object keys in a stable, sorted order.
    serde_json::to_string(schema).unwrap_or_default()
}

struct State {
    schemas: AHashMap<String, Arc<Value>>,
    meta_schemas: AHashSet<String>,
    refs: AHashMap<String, RefEntry>,
    cache: AHashMap<String, Arc<Validator>>,
    formats: AHashMap<String, Arc<dyn Format>>,
    keywords: AHashMap<String, CustomKeywordEntry>,
    rules: Rules,
    draft: Option<Draft>,
    data_refs: bool,
    strict: bool,
    schema_validation: SchemaValidationMode,
    retriever: Option<Arc<dyn Retrieve>>,
    logger: Arc<dyn Logger>,
}

/// The ambient, mutable validator registry: add schemas, keywords and
/// formats once, then validate against any of them by key.
///
/// ```rust
/// use jsonschema::Orchestrator;
/// use serde_json::json;
///
/// let orchestrator = Orchestrator::new();
/// orchestrator
///     .add_schema(json!({"$id": "https://example.com/person", "type": "object"}), None)
///     .expect("Schema should register");
///
/// assert!(orchestrator.validate("https://example.com/person", &json!({})).is_ok());
/// ```
pub struct Orchestrator {
    state: RwLock<State>,
    /// At-most-one-fetch-per-ref guard for `compile_async`.
    loading: Mutex<AHashSet<String>>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// Create an orchestrator with no registered schemas, default draft
    /// auto-detection, and meta-schema validation enabled.
    #[must_use]
    pub fn new() -> Self {
        Orchestrator {
            state: RwLock::new(State {
                schemas: AHashMap::default(),
                meta_schemas: AHashSet::default(),
                refs: AHashMap::default(),
                cache: AHashMap::default(),
                formats: AHashMap::default(),
                keywords: AHashMap::default(),
                rules: Rules::with_builtins(),
                draft: None,
                data_refs: false,
                strict: false,
                schema_validation: SchemaValidationMode::Throw,
                retriever: None,
                logger: Arc::new(NoopLogger),
            }),
            loading: Mutex::new(AHashSet::default()),
        }
    }

    /// Pin the draft used for schemas that don't declare their own `$schema`.
    pub fn set_draft(&self, draft: Draft) {
        self.state.write().unwrap().draft = Some(draft);
    }

    /// Toggle `{"$data": "<pointer>"}` support, mirrored across every future compile.
    pub fn set_data_refs(&self, enabled: bool) {
        self.state.write().unwrap().data_refs = enabled;
    }

    /// Control how strictly registered schemas are checked against their meta-schema.
    pub fn set_schema_validation(&self, mode: SchemaValidationMode) {
        self.state.write().unwrap().schema_validation = mode;
    }

    /// Reject unknown keywords and unknown formats at compile time instead of
    /// silently treating them as annotations / no-ops, mirrored across every
    /// future compile.
    pub fn set_strict(&self, enabled: bool) {
        self.state.write().unwrap().strict = enabled;
    }

    /// Install the loader consulted by [`Orchestrator::compile_async`] when compilation
    /// raises a missing-reference error.
    pub fn set_retriever(&self, retriever: impl Retrieve + 'static) {
        self.state.write().unwrap().retriever = Some(Arc::new(retriever));
    }

    /// Install the sink that receives diagnostic messages, e.g. schemas that fail
    /// meta-schema validation under [`SchemaValidationMode::Log`]. Defaults to a no-op.
    pub fn set_logger(&self, logger: impl Logger + 'static) {
        self.state.write().unwrap().logger = Arc::new(logger);
    }

    /// Register a format validator under `name`, available to every future compile.
    pub fn add_format<F>(&self, name: impl Into<String>, format: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.state
            .write()
            .unwrap()
            .formats
            .insert(name.into(), Arc::new(format));
    }

    /// Register a custom keyword, mirroring Ajv's `addKeyword(name, def)`.
    ///
    /// `definition.before` optionally names an existing keyword this one
    /// should be dispatched ahead of. `definition.types` scopes the keyword
    /// to specific instance types (empty means every type); an instance
    /// whose type isn't listed passes the keyword without `factory` ever
    /// running. `definition.meta_schema`, if set, is compiled immediately
    /// (wrapped in the `$data` alternation when `definition.data` and the
    /// orchestrator's own `$data` support are both enabled) and checked
    /// against the keyword's schema-side value on every use.
    pub fn add_keyword<F>(
        &self,
        name: impl Into<String>,
        factory: F,
        definition: KeywordDefinition,
    ) -> Result<(), CompilationError>
    where
        F: for<'a> Fn(
                &'a serde_json::Map<String, Value>,
                &'a Value,
                JsonPointer,
            ) -> Result<Box<dyn Keyword>, ValidationError<'a>>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        let mut state = self.state.write().unwrap();
        if state.keywords.contains_key(&name) || state.rules.contains(&name) {
            return Err(CompilationError::InvalidKeyword(name));
        }
        let rule_types: Vec<RuleType> = if definition.types.is_empty() {
            vec![RuleType::Any]
        } else {
            definition
                .types
                .iter()
                .map(|t| RuleType::Type(*t))
                .collect()
        };
        state
            .rules
            .add_keyword(
                &name,
                &rule_types,
                definition.before.as_deref(),
                &[],
                definition.data,
            )
            .map_err(CompilationError::InvalidKeyword)?;
        let meta_schema = match definition.meta_schema {
            Some(schema) => {
                let schema = if definition.data && state.data_refs {
                    data_reference_alternation(schema)
                } else {
                    schema
                };
                Some(Arc::new(Validator::new(&schema)?))
            }
            None => None,
        };
        state.keywords.insert(
            name,
            CustomKeywordEntry {
                factory: Arc::new(factory),
                types: definition.types,
                data: definition.data,
                meta_schema,
            },
        );
        Ok(())
    }

    /// Returns whether `name` is registered, either as a built-in or a
    /// previously added custom keyword.
    #[must_use]
    pub fn has_keyword(&self, name: &str) -> bool {
        let state = self.state.read().unwrap();
        state.keywords.contains_key(name) || state.rules.contains(name)
    }

    /// Returns the registered definition for a previously added custom
    /// keyword, or `None` for an unregistered name or a built-in.
    #[must_use]
    pub fn get_keyword(&self, name: &str) -> Option<KeywordInfo> {
        let state = self.state.read().unwrap();
        state.keywords.get(name).map(|entry| KeywordInfo {
            types: entry.types.clone(),
            data: entry.data,
            has_meta_schema: entry.meta_schema.is_some(),
        })
    }

    /// Unregister a custom keyword previously added with [`Orchestrator::add_keyword`].
    pub fn remove_keyword(&self, name: &str) {
        let mut state = self.state.write().unwrap();
        state.keywords.remove(name);
        state.rules.remove_keyword(name);
    }

    /// Register a set of keyword names as recognized at once, mirroring
    /// Ajv's `addVocabulary`. Each name is treated as a pure annotation —
    /// its value is accepted but never dispatched — just enough for strict
    /// mode and duplicate-registration checks to see it without a full
    /// [`Orchestrator::add_keyword`] definition.
    pub fn add_vocabulary<'n>(
        &self,
        keywords: impl IntoIterator<Item = &'n str>,
    ) -> Result<(), CompilationError> {
        for name in keywords {
            self.add_keyword(
                name,
                |_, _, _| Ok(Box::new(AnnotationKeyword) as Box<dyn Keyword>),
                KeywordDefinition::default(),
            )?;
        }
        Ok(())
    }

    /// For each JSON Pointer in `pointers`, wrap the value it names inside
    /// `meta` in a `{"anyOf": [original, <"$data" reference shape>]}`
    /// alternation, mirroring Ajv's `$dataMetaSchema`. Returns a new value;
    /// `meta` is never mutated. A pointer that doesn't resolve is skipped.
    #[must_use]
    pub fn data_meta_schema(meta: &Value, pointers: &[&str]) -> Value {
        let mut result = meta.clone();
        for pointer in pointers {
            if let Some(target) = result.pointer_mut(pointer) {
                let original = target.take();
                *target = data_reference_alternation(original);
            }
        }
        result
    }

    /// Register a schema under `key` (or its own `$id` when `key` is `None`).
    ///
    /// Fails with [`CompilationError::DuplicateSchemaId`] if the key is
    /// already registered.
    pub fn add_schema(
        &self,
        schema: Value,
        key: Option<&str>,
    ) -> Result<String, CompilationError> {
        self.add_schema_impl(schema, key, false)
    }

    /// As [`Orchestrator::add_schema`], but marks the schema as a meta-schema:
    /// it is exempt from bulk [`Orchestrator::remove_schema`] (`None`/regex forms).
    pub fn add_meta_schema(
        &self,
        schema: Value,
        key: Option<&str>,
    ) -> Result<String, CompilationError> {
        let key = self.add_schema_impl(schema, key, true)?;
        self.state
            .write()
            .unwrap()
            .meta_schemas
            .insert(key.clone());
        Ok(key)
    }

    fn add_schema_impl(
        &self,
        schema: Value,
        key: Option<&str>,
        is_meta: bool,
    ) -> Result<String, CompilationError> {
        let explicit_id = schema
            .get("$id")
            .and_then(Value::as_str)
            .map(ToString::to_string);
        // Only a caller-supplied key or the schema's own `$id` makes re-adding
        // the same key an error; a schema with neither falls back to a
        // content hash, and re-adding identical content under that hash is a
        // dedup, not a conflict (see spec.md §8's cache-dedup property).
        let has_explicit_identity = key.is_some() || explicit_id.is_some();
        let resolved_key = key
            .map(ToString::to_string)
            .or(explicit_id)
            .unwrap_or_else(|| canonical_key(&schema));

        let mut state = self.state.write().unwrap();
        if state.schemas.contains_key(&resolved_key) || state.refs.contains_key(&resolved_key) {
            if has_explicit_identity {
                return Err(CompilationError::DuplicateSchemaId(resolved_key));
            }
            return Ok(resolved_key);
        }
        if !is_meta {
            match state.schema_validation {
                SchemaValidationMode::Throw => {
                    drop(state);
                    Validator::new(&schema).map_err(|error| {
                        CompilationError::SchemaValidation(vec![error.to_string()])
                    })?;
                    state = self.state.write().unwrap();
                }
                SchemaValidationMode::Log => {
                    if let Err(error) = Validator::new(&schema) {
                        state.logger.error(&format!(
                            "schema `{resolved_key}` failed meta-schema validation: {error}"
                        ));
                    }
                }
                SchemaValidationMode::Disabled => {}
            }
        }
        let stored = Arc::new(schema);
        state.refs.insert(
            resolved_key.clone(),
            RefEntry::Direct(Arc::clone(&stored)),
        );
        state.schemas.insert(resolved_key.clone(), stored);
        Ok(resolved_key)
    }

    /// Check `schema` against its own (draft-detected) meta-schema.
    pub fn validate_schema(&self, schema: &Value) -> Result<(), CompilationError> {
        match schema {
            Value::Bool(_) => Ok(()),
            _ => Validator::new(schema)
                .map(|_| ())
                .map_err(|error| CompilationError::SchemaValidation(vec![error.to_string()])),
        }
    }

    /// Look up a previously registered schema by key, following any alias
    /// chain, and compile (or reuse the cached compile of) it.
    pub fn get_schema(&self, key: &str) -> Result<Arc<Validator>, CompilationError> {
        let body = self.resolve_schema_body(key)?;
        self.compile(&body)
    }

    fn resolve_schema_body(&self, key: &str) -> Result<Arc<Value>, CompilationError> {
        let state = self.state.read().unwrap();
        let mut current = key.to_string();
        loop {
            match state.refs.get(&current) {
                Some(RefEntry::Direct(schema)) => return Ok(Arc::clone(schema)),
                Some(RefEntry::Alias(target)) => current = target.clone(),
                None => return Err(CompilationError::UnknownSchemaKey(key.to_string())),
            }
        }
    }

    /// Compile `schema`, registering it (by its own `$id`, if it declares
    /// one) the way [`Orchestrator::add_schema`] would, so a later
    /// [`Orchestrator::get_schema`] call against that `$id` resolves to the
    /// same compiled validator (spec.md §8's round-trip resolution
    /// property). Every schema registered via
    /// [`Orchestrator::add_schema`]/[`Orchestrator::add_meta_schema`] is
    /// used as an additional resource for `$ref` resolution. Compiled
    /// validators are cached by the schema's canonical form.
    pub fn compile(&self, schema: &Value) -> Result<Arc<Validator>, CompilationError> {
        let key = canonical_key(schema);
        {
            let state = self.state.read().unwrap();
            if let Some(validator) = state.cache.get(&key) {
                return Ok(Arc::clone(validator));
            }
        }
        self.register_if_absent(schema)?;
        let validator = Arc::new(self.build(schema)?);
        self.state
            .write()
            .unwrap()
            .cache
            .insert(key, Arc::clone(&validator));
        Ok(validator)
    }

    /// Register `schema` under its own `$id` if it isn't already known under
    /// that key. An anonymous schema (no `$id`) is left unregistered — there
    /// is no key to resolve it by later, matching the "non-anonymous
    /// schemas" qualifier on the round-trip resolution property.
    fn register_if_absent(&self, schema: &Value) -> Result<(), CompilationError> {
        let Some(id) = schema.get("$id").and_then(Value::as_str) else {
            return Ok(());
        };
        {
            let state = self.state.read().unwrap();
            match state.refs.get(id) {
                Some(RefEntry::Direct(existing)) if existing.as_ref() == schema => return Ok(()),
                Some(RefEntry::Direct(_)) => {
                    return Err(CompilationError::DuplicateSchemaId(id.to_string()))
                }
                _ => {}
            }
        }
        self.add_schema_impl(schema.clone(), Some(id), false)
            .map(|_| ())
    }

    fn build(&self, schema: &Value) -> Result<Validator, CompilationError> {
        let mut options = self.base_options();
        for (uri, resource) in self.resources() {
            options.with_resource(uri, resource);
        }
        Ok(options.build(schema)?)
    }

    fn base_options(&self) -> ValidationOptions {
        let state = self.state.read().unwrap();
        let mut options = crate::options();
        if let Some(draft) = state.draft {
            options.with_draft(draft);
        }
        if state.data_refs {
            options.with_data_refs();
        }
        if state.strict {
            options.with_strict(true);
        }
        if !matches!(state.schema_validation, SchemaValidationMode::Throw) {
            // `Log`/`Disabled` are enforced by `add_schema_impl` at registration time;
            // the compiler's own built-in check must be turned off here, otherwise an
            // invalid-but-logged schema would still fail to compile.
            options.without_schema_validation();
        }
        for (name, format) in &state.formats {
            let format = Arc::clone(format);
            options.with_format(name.clone(), move |value: &str| format.is_valid(value));
        }
        for (name, entry) in &state.keywords {
            let factory = Arc::clone(&entry.factory);
            let types = entry.types.clone();
            let meta_schema = entry.meta_schema.clone();
            options.with_keyword(name.clone(), move |parent, value, path: JsonPointer| {
                if let Some(meta_schema) = &meta_schema {
                    if !meta_schema.is_valid(value) {
                        return Err(ValidationError::custom(
                            path,
                            JsonPointer::default(),
                            value,
                            "value does not satisfy the keyword's meta-schema",
                        ));
                    }
                }
                let keyword = factory.init(parent, value, path)?;
                if types.is_empty() {
                    Ok(keyword)
                } else {
                    Ok(Box::new(TypeScopedKeyword {
                        inner: keyword,
                        types: types.clone(),
                    }) as Box<dyn Keyword>)
                }
            });
        }
        options
    }

    fn resources(&self) -> Vec<(String, Resource)> {
        let state = self.state.read().unwrap();
        state
            .schemas
            .iter()
            .filter_map(|(key, schema)| {
                Resource::from_contents((**schema).clone())
                    .ok()
                    .map(|resource| (key.clone(), resource))
            })
            .collect()
    }

    /// Validate `instance` against the schema registered under `key`.
    pub fn validate(&self, key: &str, instance: &Value) -> Result<(), CompilationError> {
        let validator = self.get_schema(key)?;
        validator
            .validate(instance)
            .map_err(|mut errors| {
                CompilationError::SchemaValidation(
                    errors.by_ref().map(|error| error.to_string()).collect(),
                )
            })
    }

    /// As [`Orchestrator::compile`], except that a missing `$ref` is resolved
    /// by consulting the configured [`Retrieve`] loader, at most once per
    /// reference, retrying compilation until it succeeds or a reference
    /// truly cannot be resolved.
    pub fn compile_async(&self, schema: &Value) -> Result<Arc<Validator>, CompilationError> {
        loop {
            match self.compile(schema) {
                Ok(validator) => return Ok(validator),
                Err(CompilationError::Compilation(message)) => {
                    let Some(missing_ref) = extract_missing_ref(&message) else {
                        return Err(CompilationError::Compilation(message));
                    };
                    self.load_missing_ref(&missing_ref)?;
                }
                Err(other) => return Err(other),
            }
        }
    }

    fn load_missing_ref(&self, missing_ref: &str) -> Result<(), CompilationError> {
        {
            let state = self.state.read().unwrap();
            if state.refs.contains_key(missing_ref) {
                // Already registered: the failure must be a different, unresolvable ref.
                return Err(CompilationError::UnresolvableRef {
                    missing_schema: missing_ref.to_string(),
                    missing_ref: missing_ref.to_string(),
                });
            }
        }
        let retriever = {
            let state = self.state.read().unwrap();
            state.retriever.clone()
        };
        let Some(retriever) = retriever else {
            return Err(CompilationError::LoadSchemaNotConfigured);
        };
        {
            let mut loading = self.loading.lock().unwrap();
            if !loading.insert(missing_ref.to_string()) {
                // Another caller is already fetching this ref; nothing more to do here,
                // the caller's retry loop will observe its registration once done.
                return Ok(());
            }
        }
        let uri: referencing::Uri<String> = referencing::Uri::parse(missing_ref.to_string())
            .map_err(|_| CompilationError::UnresolvableRef {
                missing_schema: missing_ref.to_string(),
                missing_ref: missing_ref.to_string(),
            })?;
        let fetched = retriever
            .retrieve(&uri.borrow())
            .map_err(|_| CompilationError::UnresolvableRef {
                missing_schema: missing_ref.to_string(),
                missing_ref: missing_ref.to_string(),
            });
        self.loading.lock().unwrap().remove(missing_ref);
        let fetched = fetched?;
        self.add_schema(fetched, Some(missing_ref))?;
        Ok(())
    }

    /// Remove every non-meta schema and clear the compile cache.
    pub fn remove_all_schemas(&self) {
        let mut state = self.state.write().unwrap();
        let keep: AHashSet<String> = state.meta_schemas.clone();
        state.schemas.retain(|key, _| keep.contains(key));
        state.refs.retain(|key, _| keep.contains(key));
        state.cache.clear();
    }

    /// Remove the schema registered under `key`, if any, along with its cache entry.
    pub fn remove_schema(&self, key: &str) {
        let mut state = self.state.write().unwrap();
        if state.meta_schemas.contains(key) {
            return;
        }
        state.schemas.remove(key);
        state.refs.remove(key);
        let removed_key = canonical_key_if_present(&state, key);
        if let Some(removed_key) = removed_key {
            state.cache.remove(&removed_key);
        }
    }

    /// Remove every non-meta schema whose key (in either the `schemas` or
    /// `refs` table) matches `pattern`, along with their cache entries.
    pub fn remove_schema_matching(&self, pattern: &regex::Regex) {
        let mut state = self.state.write().unwrap();
        let mut keys: AHashSet<String> = state.schemas.keys().cloned().collect();
        keys.extend(state.refs.keys().cloned());
        let matching: Vec<String> = keys
            .into_iter()
            .filter(|key| pattern.is_match(key) && !state.meta_schemas.contains(key))
            .collect();
        for key in matching {
            if let Some(schema) = state.schemas.remove(&key) {
                state.cache.remove(&canonical_key(&schema));
            }
            state.refs.remove(&key);
        }
    }

    /// Human-readable concatenation of validation errors, one per line.
    #[must_use]
    pub fn errors_text(errors: &[String], separator: &str) -> String {
        if errors.is_empty() {
            return "No errors".to_string();
        }
        errors.join(separator)
    }
}

fn canonical_key_if_present(state: &State, key: &str) -> Option<String> {
    state
        .schemas
        .get(key)
        .map(|schema| canonical_key(schema))
}

/// Best-effort extraction of the URI a `ValidationErrorKind::Referencing`
/// failure names, so [`Orchestrator::compile_async`] knows what to fetch.
/// The compiler only surfaces the error as a formatted string by the time it
/// reaches this layer, so this matches `referencing::Error::Unretrievable`'s
/// `Display` output ("Resource '<uri>' is not present in a registry and
/// retrieving it failed") rather than downcasting.
fn extract_missing_ref(message: &str) -> Option<String> {
    let marker = "is not present in a registry and retrieving it failed";
    if !message.contains(marker) {
        return None;
    }
    let start = message.find('\'')? + 1;
    let end = message[start..].find('\'')? + start;
    Some(message[start..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_and_validate_by_key() {
        let orchestrator = Orchestrator::new();
        orchestrator
            .add_schema(
                json!({"$id": "https://example.com/person", "type": "object", "required": ["name"]}),
                None,
            )
            .unwrap();
        assert!(orchestrator
            .validate("https://example.com/person", &json!({"name": "Alice"}))
            .is_ok());
        assert!(orchestrator
            .validate("https://example.com/person", &json!({}))
            .is_err());
    }

    #[test]
    fn unknown_key_reports_unknown_schema() {
        let orchestrator = Orchestrator::new();
        let error = orchestrator.validate("missing", &json!({})).unwrap_err();
        assert!(matches!(error, CompilationError::UnknownSchemaKey(_)));
    }

    #[test]
    fn duplicate_schema_id_is_rejected() {
        let orchestrator = Orchestrator::new();
        orchestrator
            .add_schema(json!({"$id": "urn:dup", "type": "string"}), None)
            .unwrap();
        let error = orchestrator
            .add_schema(json!({"$id": "urn:dup", "type": "integer"}), None)
            .unwrap_err();
        assert!(matches!(error, CompilationError::DuplicateSchemaId(_)));
    }

    #[test]
    fn cross_schema_ref_resolves_through_the_registry() {
        let orchestrator = Orchestrator::new();
        orchestrator
            .add_schema(json!({"$id": "urn:digit", "type": "integer"}), None)
            .unwrap();
        let schema = json!({"$ref": "urn:digit"});
        let validator = orchestrator.compile(&schema).unwrap();
        assert!(validator.is_valid(&json!(1)));
        assert!(!validator.is_valid(&json!("not a digit")));
    }

    #[test]
    fn remove_all_schemas_preserves_meta_schemas() {
        let orchestrator = Orchestrator::new();
        orchestrator
            .add_meta_schema(json!({"$id": "urn:meta", "type": "object"}), None)
            .unwrap();
        orchestrator
            .add_schema(json!({"$id": "urn:regular", "type": "string"}), None)
            .unwrap();
        orchestrator.remove_all_schemas();
        assert!(orchestrator.get_schema("urn:meta").is_ok());
        assert!(orchestrator.get_schema("urn:regular").is_err());
    }

    fn even_number_factory<'a>(
        _parent: &'a serde_json::Map<String, Value>,
        _value: &'a Value,
        _path: JsonPointer,
    ) -> Result<Box<dyn crate::Keyword>, ValidationError<'a>> {
        struct EvenNumber;
        impl crate::Keyword for EvenNumber {
            fn validate<'instance>(
                &self,
                instance: &'instance Value,
                instance_path: &crate::paths::LazyLocation,
            ) -> crate::ErrorIterator<'instance> {
                if self.is_valid(instance) {
                    crate::error::no_error()
                } else {
                    crate::error::error(ValidationError::custom(
                        crate::paths::JsonPointer::default(),
                        instance_path.into(),
                        instance,
                        "Number must be even",
                    ))
                }
            }
            fn is_valid(&self, instance: &Value) -> bool {
                instance.as_u64().map_or(false, |n| n % 2 == 0)
            }
        }
        Ok(Box::new(EvenNumber) as Box<dyn crate::Keyword>)
    }

    #[test]
    fn custom_keyword_participates_in_compilation() {
        let orchestrator = Orchestrator::new();
        orchestrator
            .add_keyword("even-number", even_number_factory, KeywordDefinition::default())
            .unwrap();
        let validator = orchestrator
            .compile(&json!({"even-number": true}))
            .unwrap();
        assert!(validator.is_valid(&json!(2)));
        assert!(!validator.is_valid(&json!(3)));
    }

    #[test]
    fn custom_keyword_is_scoped_to_declared_types() {
        let orchestrator = Orchestrator::new();
        orchestrator
            .add_keyword(
                "even-number",
                even_number_factory,
                KeywordDefinition {
                    types: vec![PrimitiveType::Integer, PrimitiveType::Number],
                    ..Default::default()
                },
            )
            .unwrap();
        let validator = orchestrator
            .compile(&json!({"even-number": true}))
            .unwrap();
        assert!(!validator.is_valid(&json!(3)));
        // Not a number at all: the keyword never runs, so it passes.
        assert!(validator.is_valid(&json!("3")));
    }

    #[test]
    fn custom_keyword_meta_schema_rejects_bad_value() {
        let orchestrator = Orchestrator::new();
        orchestrator
            .add_keyword(
                "even-number",
                even_number_factory,
                KeywordDefinition {
                    meta_schema: Some(json!({"type": "boolean"})),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(orchestrator.compile(&json!({"even-number": true})).is_ok());
        assert!(orchestrator
            .compile(&json!({"even-number": "not-a-bool"}))
            .is_err());
    }

    #[test]
    fn get_keyword_reports_registered_definition() {
        let orchestrator = Orchestrator::new();
        assert!(orchestrator.get_keyword("even-number").is_none());
        orchestrator
            .add_keyword(
                "even-number",
                even_number_factory,
                KeywordDefinition {
                    types: vec![PrimitiveType::Integer],
                    meta_schema: Some(json!({"type": "boolean"})),
                    ..Default::default()
                },
            )
            .unwrap();
        let info = orchestrator.get_keyword("even-number").unwrap();
        assert_eq!(info.types, vec![PrimitiveType::Integer]);
        assert!(info.has_meta_schema);
    }

    #[test]
    fn add_vocabulary_registers_names_without_behavior() {
        let orchestrator = Orchestrator::new();
        orchestrator.add_vocabulary(["myVocab"]).unwrap();
        assert!(orchestrator.has_keyword("myVocab"));
        orchestrator.set_strict(true);
        assert!(orchestrator.compile(&json!({"myVocab": true})).is_ok());
    }

    #[test]
    fn data_meta_schema_wraps_named_pointers() {
        let meta = json!({
            "properties": {
                "minimum": {"type": "number"}
            }
        });
        let wrapped = Orchestrator::data_meta_schema(&meta, &["/properties/minimum"]);
        assert!(wrapped["properties"]["minimum"]["anyOf"].is_array());
        // Original is untouched.
        assert_eq!(meta["properties"]["minimum"], json!({"type": "number"}));
    }

    #[test]
    fn schema_validation_log_mode_registers_despite_failure() {
        use std::sync::Mutex;

        #[derive(Default)]
        struct RecordingLogger {
            messages: Mutex<Vec<String>>,
        }

        impl crate::Logger for RecordingLogger {
            fn error(&self, message: &str) {
                self.messages.lock().unwrap().push(message.to_string());
            }
        }

        let orchestrator = Orchestrator::new();
        orchestrator.set_schema_validation(SchemaValidationMode::Log);
        orchestrator.set_logger(RecordingLogger::default());
        // `type` must be a string or array of strings per the meta-schema; `123` is neither.
        let key = orchestrator
            .add_schema(json!({"type": 123}), Some("urn:bad"))
            .expect("Log mode must not fail registration");
        assert_eq!(key, "urn:bad");
        assert!(orchestrator.get_schema("urn:bad").is_ok());
    }

    #[test]
    fn schema_validation_disabled_skips_the_check() {
        let orchestrator = Orchestrator::new();
        orchestrator.set_schema_validation(SchemaValidationMode::Disabled);
        assert!(orchestrator
            .add_schema(json!({"type": 123}), Some("urn:skip"))
            .is_ok());
    }

    #[test]
    fn strict_mode_rejects_unknown_keyword_at_compile_time() {
        let orchestrator = Orchestrator::new();
        orchestrator.set_strict(true);
        orchestrator
            .add_schema(json!({"totallyMadeUp": true}), Some("urn:strict"))
            .expect("registration itself does not compile the schema");
        assert!(orchestrator.get_schema("urn:strict").is_err());
    }

    #[test]
    fn non_strict_mode_tolerates_unknown_keyword() {
        let orchestrator = Orchestrator::new();
        orchestrator
            .add_schema(json!({"totallyMadeUp": true}), Some("urn:lenient"))
            .expect("registration succeeds");
        assert!(orchestrator.get_schema("urn:lenient").is_ok());
    }
}
