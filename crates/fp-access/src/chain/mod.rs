//! Compiled accessor chains.
//!
//! A chain is the resolved form of one path against one owner type: an arena
//! of [`AccessorNode`]s linked by index. Replaying a chain performs the same
//! reads and writes a fresh resolution would, without looking anything up.
//! A node whose receiver no longer has the type it was resolved for hands the
//! rest of the path to a continuation compiled for the new type.

mod node;

pub use node::*;

use crate::context::ResolutionContext;
use crate::error::{AccessError, Result};
use crate::scope::VariableScope;
use crate::types::TypeKey;
use crate::value::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ChainMode {
    Read,
    Write,
}

/// What the first segment assumed about the variable scope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScopeBinding {
    #[default]
    Unchecked,
    /// Resolved as a variable of this name.
    Bound(Arc<str>),
    /// Resolved against the root because no variable had this name.
    Unbound(Arc<str>),
}

pub struct AccessorChain {
    path: Arc<str>,
    offset: usize,
    mode: ChainMode,
    rooted: bool,
    owner: TypeKey,
    result: TypeKey,
    binding: ScopeBinding,
    nodes: Vec<AccessorNode>,
}

impl std::fmt::Debug for AccessorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessorChain")
            .field("path", &self.path)
            .field("offset", &self.offset)
            .field("mode", &self.mode)
            .field("owner", &self.owner)
            .field("nodes", &self.labels())
            .finish()
    }
}

/// A freshly compiled chain together with the value its compilation produced.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub chain: Arc<AccessorChain>,
    pub value: Value,
}

impl AccessorChain {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Offset in the path where this chain starts; non-zero for continuations.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn mode(&self) -> ChainMode {
        self.mode
    }

    pub fn is_rooted(&self) -> bool {
        self.rooted
    }

    /// Key of the root type the chain was compiled against.
    pub fn owner(&self) -> TypeKey {
        self.owner
    }

    /// Key of the type of the value the compiling pass produced.
    pub fn result_type(&self) -> TypeKey {
        self.result
    }

    pub fn nodes(&self) -> &[AccessorNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.nodes.iter().map(|node| node.kind.label()).collect()
    }

    /// Whether `scope` still resolves the first segment the way it did at compile time.
    pub fn scope_agrees(&self, scope: &dyn VariableScope) -> bool {
        match &self.binding {
            ScopeBinding::Unchecked => true,
            ScopeBinding::Bound(name) => scope.is_resolvable(name),
            ScopeBinding::Unbound(name) => !scope.is_resolvable(name),
        }
    }

    /// Replays a read chain against `root`. Falls back to a full resolution
    /// through `cx` when `root` or `scope` differ from what the chain was built for.
    pub fn get(&self, cx: &ResolutionContext, root: &Value, scope: &dyn VariableScope) -> Result<Value> {
        if self.mode != ChainMode::Read || !self.rooted {
            return Err(AccessError::Generic(format!(
                "chain for '{}' cannot be replayed as a read",
                self.path
            )));
        }
        if root.owner_key() != self.owner || !self.scope_agrees(scope) {
            return cx.get(&self.path, root, scope);
        }
        self.run_read(cx, root, root, scope)
    }

    /// Replays a write chain against `root`.
    pub fn set(
        &self,
        cx: &ResolutionContext,
        root: &Value,
        scope: &dyn VariableScope,
        value: Value,
    ) -> Result<()> {
        if self.mode != ChainMode::Write || !self.rooted {
            return Err(AccessError::Generic(format!(
                "chain for '{}' cannot be replayed as a write",
                self.path
            )));
        }
        if root.owner_key() != self.owner || !self.scope_agrees(scope) {
            return cx.set(&self.path, root, scope, value);
        }
        self.run_write(cx, root, root, scope, value)
    }

    pub(crate) fn run_read(
        &self,
        cx: &ResolutionContext,
        start: &Value,
        root: &Value,
        scope: &dyn VariableScope,
    ) -> Result<Value> {
        let mut current = start.clone();
        let mut cursor = (!self.nodes.is_empty()).then_some(0);
        while let Some(index) = cursor {
            let node = &self.nodes[index];
            if node.null_safe && current.is_null() {
                return Ok(Value::Null);
            }
            if !node.accepts(&current) {
                tracing::trace!(path = %self.path, offset = node.offset, "receiver changed, continuing");
                return cx.continue_read(&self.path, node.offset, &current, root, scope, node.null_safe);
            }
            current = node.value(cx, &current, root, scope)?;
            cursor = node.next;
        }
        Ok(current)
    }

    pub(crate) fn run_write(
        &self,
        cx: &ResolutionContext,
        start: &Value,
        root: &Value,
        scope: &dyn VariableScope,
        value: Value,
    ) -> Result<()> {
        let mut current = start.clone();
        let mut cursor = (!self.nodes.is_empty()).then_some(0);
        while let Some(index) = cursor {
            let node = &self.nodes[index];
            if node.null_safe && current.is_null() {
                return Ok(());
            }
            if !node.accepts(&current) {
                tracing::trace!(path = %self.path, offset = node.offset, "receiver changed, continuing");
                return cx.continue_write(
                    &self.path,
                    node.offset,
                    &current,
                    root,
                    scope,
                    node.null_safe,
                    value,
                );
            }
            match node.next {
                Some(next) => {
                    current = node.value(cx, &current, root, scope)?;
                    cursor = Some(next);
                }
                None => return node.assign(cx, &current, root, scope, value),
            }
        }
        Err(AccessError::syntax(self.offset, "nothing to assign"))
    }
}

/// Assembles a chain while its path is being resolved. [`finish`](Self::finish)
/// hands over the nodes as a ready [`AccessorChain`].
pub struct ChainBuilder {
    path: Arc<str>,
    offset: usize,
    mode: ChainMode,
    rooted: bool,
    owner: TypeKey,
    binding: ScopeBinding,
    nodes: Vec<AccessorNode>,
}

impl ChainBuilder {
    pub fn new(path: Arc<str>, offset: usize, mode: ChainMode, rooted: bool, owner: TypeKey) -> Self {
        Self {
            path,
            offset,
            mode,
            rooted,
            owner,
            binding: ScopeBinding::Unchecked,
            nodes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn bind_scope(&mut self, binding: ScopeBinding) {
        self.binding = binding;
    }

    /// Appends a node after the last one and returns it.
    pub fn push(&mut self, kind: NodeKind, guard: TypeKey, offset: usize, null_safe: bool) -> &AccessorNode {
        let index = self.nodes.len();
        if let Some(last) = self.nodes.last_mut() {
            last.next = Some(index);
        }
        self.nodes.push(AccessorNode {
            kind,
            next: None,
            null_safe,
            offset,
            guard,
        });
        &self.nodes[index]
    }

    pub fn finish(self, result: TypeKey) -> AccessorChain {
        AccessorChain {
            path: self.path,
            offset: self.offset,
            mode: self.mode,
            rooted: self.rooted,
            owner: self.owner,
            result,
            binding: self.binding,
            nodes: self.nodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builder_links_nodes_and_hands_them_over() {
        let mut builder = ChainBuilder::new("this.this".into(), 0, ChainMode::Read, true, TypeKey::NULL);
        assert!(builder.is_empty());
        builder.push(NodeKind::This, TypeKey::NULL, 0, false);
        builder.push(NodeKind::This, TypeKey::NULL, 5, false);

        let chain = builder.finish(TypeKey::NULL);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.labels(), vec!["This", "This"]);
        let links: Vec<_> = chain.nodes().iter().map(|node| node.next).collect();
        assert_eq!(links, vec![Some(1), None]);
        assert_eq!(chain.mode(), ChainMode::Read);
    }
}
