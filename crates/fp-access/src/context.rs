//! The resolution context owned by an embedding application.

use crate::chain::{ArgExpr, ChainMode, Compiled};
use crate::coerce::{Coercion, DefaultCoercion};
use crate::config::AccessConfig;
use crate::error::Result;
use crate::eval::{DefaultEvaluator, Evaluator};
use crate::handler::PropertyHandlerRegistry;
use crate::resolve::{AccessResolver, CacheStats, ChainKey, Request, ResolutionCache};
use crate::scope::VariableScope;
use crate::types::{satisfies, TypeInfo, TypeRef, TypeRegistry};
use crate::value::Value;
use std::sync::Arc;

/// Everything path access needs: the type registry, extension handlers, the
/// external collaborators and every resolution cache.
///
/// A context is `Send + Sync` and meant to be shared by every thread that
/// evaluates paths for one application. Caches never outlive it.
///
/// ```
/// use fp_access::{ResolutionContext, Value};
/// use fp_access::scope::MapVariableScope;
///
/// let cx = ResolutionContext::default();
/// let scope = MapVariableScope::new();
/// scope.insert("name", "dog");
/// let upper = cx.get("name.toUpperCase()", &Value::Null, &scope).unwrap();
/// assert_eq!(upper, Value::string("DOG"));
/// ```
pub struct ResolutionContext {
    config: AccessConfig,
    types: TypeRegistry,
    handlers: PropertyHandlerRegistry,
    cache: ResolutionCache,
    coercion: Arc<dyn Coercion>,
    evaluator: Arc<dyn Evaluator>,
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self::new(AccessConfig::default())
    }
}

impl ResolutionContext {
    pub fn new(config: AccessConfig) -> Self {
        Self {
            cache: ResolutionCache::new(&config),
            config,
            types: TypeRegistry::new(),
            handlers: PropertyHandlerRegistry::new(),
            coercion: Arc::new(DefaultCoercion),
            evaluator: Arc::new(DefaultEvaluator),
        }
    }

    pub fn with_coercion(mut self, coercion: Arc<dyn Coercion>) -> Self {
        self.coercion = coercion;
        self
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn handlers(&self) -> &PropertyHandlerRegistry {
        &self.handlers
    }

    pub fn coercion(&self) -> &dyn Coercion {
        self.coercion.as_ref()
    }

    pub fn evaluator(&self) -> &dyn Evaluator {
        self.evaluator.as_ref()
    }

    pub(crate) fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Reads `path` against `root`, replaying the cached chain when one exists.
    pub fn get(&self, path: &str, root: &Value, scope: &dyn VariableScope) -> Result<Value> {
        let key = self.rooted_key(path, root, ChainMode::Read);
        if let Some(chain) = self.cache.chain(&key, path) {
            if chain.scope_agrees(scope) {
                return chain.run_read(self, root, root, scope);
            }
            tracing::debug!(path, "first segment resolves differently in this scope, rebuilding");
        }
        Ok(self.compile_get(path, root, scope)?.value)
    }

    /// Writes `value` through the last segment of `path`.
    pub fn set(&self, path: &str, root: &Value, scope: &dyn VariableScope, value: Value) -> Result<()> {
        let key = self.rooted_key(path, root, ChainMode::Write);
        if let Some(chain) = self.cache.chain(&key, path) {
            if chain.scope_agrees(scope) {
                return chain.run_write(self, root, root, scope, value);
            }
            tracing::debug!(path, "first segment resolves differently in this scope, rebuilding");
        }
        self.compile_set(path, root, scope, value).map(|_| ())
    }

    /// Reads `path` and converts the result to `target`.
    pub fn get_as(
        &self,
        path: &str,
        root: &Value,
        scope: &dyn VariableScope,
        target: &TypeInfo,
    ) -> Result<Value> {
        let value = self.get(path, root, scope)?;
        if satisfies(&value, target) {
            Ok(value)
        } else {
            self.coercion.convert(&value, target)
        }
    }

    /// Resolves `path` from scratch, publishing the resulting chain.
    pub fn compile_get(&self, path: &str, root: &Value, scope: &dyn VariableScope) -> Result<Compiled> {
        let path: Arc<str> = path.into();
        let request = Request {
            path: &path,
            offset: 0,
            start: root,
            root,
            scope,
            rooted: true,
            null_safe: false,
        };
        let compiled = self.compile(&request, None)?;
        self.publish(self.rooted_key(&path, root, ChainMode::Read), root, &compiled);
        Ok(compiled)
    }

    /// Resolves and performs the write from scratch, publishing the resulting chain.
    pub fn compile_set(
        &self,
        path: &str,
        root: &Value,
        scope: &dyn VariableScope,
        value: Value,
    ) -> Result<Compiled> {
        let path: Arc<str> = path.into();
        let request = Request {
            path: &path,
            offset: 0,
            start: root,
            root,
            scope,
            rooted: true,
            null_safe: false,
        };
        let compiled = self.compile(&request, Some(value))?;
        self.publish(self.rooted_key(&path, root, ChainMode::Write), root, &compiled);
        Ok(compiled)
    }

    /// Evaluates a sub-expression through the configured evaluator.
    pub fn evaluate(&self, text: &str, root: &Value, scope: &dyn VariableScope) -> Result<Value> {
        self.evaluator.evaluate(self, text, root, scope)
    }

    /// The registered type named `name`, remembered per registry generation.
    pub fn lookup_type(&self, name: &str) -> Option<TypeRef> {
        let generation = self.types.generation();
        if let Some(known) = self.cache.type_name(name, generation) {
            return known;
        }
        let found = self.types.lookup(name);
        self.cache.store_type_name(name, found.as_ref(), generation);
        found
    }

    /// Drops every cached member, type name and chain.
    pub fn clear_caches(&self) {
        self.cache.clear();
        tracing::debug!("resolution caches cleared");
    }

    /// Drops cache entries for types that are no longer alive or names that
    /// resolved under an older registry state.
    pub fn purge(&self) -> usize {
        self.cache.purge(self.types.generation()) + self.types.purge()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub(crate) fn arg_expr(&self, text: &str) -> ArgExpr {
        match self.evaluator.literal(text) {
            Some(value) => ArgExpr::Const(value),
            None => ArgExpr::Expr(text.trim().into()),
        }
    }

    /// Writes `path` relative to `receiver`; receiver members win over variables.
    pub(crate) fn set_member(
        &self,
        path: &str,
        receiver: &Value,
        scope: &dyn VariableScope,
        value: Value,
    ) -> Result<()> {
        let key = self.relative_key(path, 0, receiver, ChainMode::Write);
        if let Some(chain) = self.cache.chain(&key, path) {
            return chain.run_write(self, receiver, receiver, scope, value);
        }
        let path: Arc<str> = path.into();
        let request = Request {
            path: &path,
            offset: 0,
            start: receiver,
            root: receiver,
            scope,
            rooted: false,
            null_safe: false,
        };
        let compiled = self.compile(&request, Some(value))?;
        self.publish(key, receiver, &compiled);
        Ok(())
    }

    /// Reads the rest of `path` from `offset` against `current`.
    pub(crate) fn continue_read(
        &self,
        path: &Arc<str>,
        offset: usize,
        current: &Value,
        root: &Value,
        scope: &dyn VariableScope,
        null_safe: bool,
    ) -> Result<Value> {
        let key = self.relative_key(path, offset, current, ChainMode::Read);
        if let Some(chain) = self.cache.chain(&key, path) {
            return chain.run_read(self, current, root, scope);
        }
        let request = Request {
            path,
            offset,
            start: current,
            root,
            scope,
            rooted: false,
            null_safe,
        };
        let compiled = self.compile(&request, None)?;
        self.publish(key, current, &compiled);
        Ok(compiled.value)
    }

    /// Writes through the rest of `path` from `offset` against `current`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn continue_write(
        &self,
        path: &Arc<str>,
        offset: usize,
        current: &Value,
        root: &Value,
        scope: &dyn VariableScope,
        null_safe: bool,
        value: Value,
    ) -> Result<()> {
        let key = self.relative_key(path, offset, current, ChainMode::Write);
        if let Some(chain) = self.cache.chain(&key, path) {
            return chain.run_write(self, current, root, scope, value);
        }
        let request = Request {
            path,
            offset,
            start: current,
            root,
            scope,
            rooted: false,
            null_safe,
        };
        let compiled = self.compile(&request, Some(value))?;
        self.publish(key, current, &compiled);
        Ok(())
    }

    fn rooted_key(&self, path: &str, root: &Value, mode: ChainMode) -> ChainKey {
        ChainKey::new(
            path,
            0,
            root.owner_key(),
            mode == ChainMode::Write,
            true,
            self.types.generation(),
        )
    }

    fn relative_key(&self, path: &str, offset: usize, receiver: &Value, mode: ChainMode) -> ChainKey {
        ChainKey::new(
            path,
            offset,
            receiver.owner_key(),
            mode == ChainMode::Write,
            false,
            self.types.generation(),
        )
    }

    fn compile(&self, request: &Request<'_>, value: Option<Value>) -> Result<Compiled> {
        self.cache.record_compilation();
        let compiled = match value {
            None => AccessResolver::new(self, request, ChainMode::Read).read(request.start)?,
            Some(value) => {
                AccessResolver::new(self, request, ChainMode::Write).write(request.start, value)?
            }
        };
        tracing::debug!(
            path = %request.path,
            offset = request.offset,
            mode = %compiled.chain.mode(),
            nodes = ?compiled.chain.labels(),
            "compiled accessor chain"
        );
        Ok(compiled)
    }

    fn publish(&self, key: ChainKey, start: &Value, compiled: &Compiled) {
        self.cache
            .store_chain(key, start.owner_type(), compiled.chain.clone());
    }
}
