//! Resolution caches owned by a [`crate::ResolutionContext`].
//!
//! Every entry holds the type it was resolved against by `Weak` reference: a
//! cached member or chain never keeps its owner type alive, and [`ResolutionCache::purge`]
//! reclaims entries whose owner is gone. Type keys are never reused, so an entry
//! whose owner died can only miss.

use crate::chain::AccessorChain;
use crate::collections::BoundedCache;
use crate::config::AccessConfig;
use crate::types::{ConstructorInfo, MethodInfo, TypeInfo, TypeKey, TypeRef};
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Order-sensitive hash of a member name and its argument types.
pub fn signature_hash(name: &str, args: &[TypeKey]) -> u64 {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    for (position, key) in args.iter().enumerate() {
        (position, key).hash(&mut hasher);
    }
    hasher.finish()
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Counters {
    fn record<T>(&self, found: Option<T>) -> Option<T> {
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq)]
pub struct CacheStat {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub size: usize,
    pub evictions: u64,
}

impl CacheStat {
    fn collect(counters: &Counters, size: usize, evictions: u64) -> Self {
        let hits = counters.hits.load(Ordering::Relaxed);
        let misses = counters.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        Self {
            hits,
            misses,
            hit_rate: if total == 0 { 0.0 } else { hits as f64 / total as f64 },
            size,
            evictions,
        }
    }
}

impl Display for CacheStat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "hits: {:>8}, misses: {:>8}, hit_rate: {:>6.2}%, size: {:>8}, evicted: {:>8}",
            self.hits,
            self.misses,
            self.hit_rate * 100.0,
            self.size,
            self.evictions
        )
    }
}

#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub methods: CacheStat,
    pub constructors: CacheStat,
    pub type_names: CacheStat,
    pub chains: CacheStat,
    /// Chains built from scratch, including uncached and continuation compiles.
    pub compilations: u64,
}

impl Display for CacheStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Resolution Cache Statistics:")?;
        writeln!(f, "  Methods:       {}", self.methods)?;
        writeln!(f, "  Constructors:  {}", self.constructors)?;
        writeln!(f, "  Type names:    {}", self.type_names)?;
        writeln!(f, "  Chains:        {}", self.chains)?;
        writeln!(f, "  Compilations:  {}", self.compilations)
    }
}

struct MemberEntry<M> {
    owner: Weak<TypeInfo>,
    name: Arc<str>,
    args: Arc<[TypeKey]>,
    member: Arc<M>,
}

// Members themselves are not `Clone`; entries only clone handles
impl<M> Clone for MemberEntry<M> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner.clone(),
            name: self.name.clone(),
            args: self.args.clone(),
            member: self.member.clone(),
        }
    }
}

/// Resolved callables keyed by (owner type, signature hash).
pub struct MemberCache<M> {
    enabled: bool,
    entries: BoundedCache<(TypeKey, u64), MemberEntry<M>>,
    counters: Counters,
}

impl<M> MemberCache<M> {
    fn new(capacity: usize, enabled: bool) -> Self {
        Self {
            enabled,
            entries: BoundedCache::new(capacity),
            counters: Counters::default(),
        }
    }

    pub fn lookup(&self, owner: &TypeInfo, name: &str, args: &[TypeKey]) -> Option<Arc<M>> {
        if !self.enabled {
            return None;
        }
        let found = self
            .entries
            .get(&(owner.key(), signature_hash(name, args)))
            .filter(|entry| {
                entry.owner.strong_count() > 0 && &*entry.name == name && &*entry.args == args
            })
            .map(|entry| entry.member);
        self.counters.record(found)
    }

    pub fn store(&self, owner: &TypeRef, name: &str, args: &[TypeKey], member: Arc<M>) {
        if !self.enabled {
            return;
        }
        let entry = MemberEntry {
            owner: Arc::downgrade(owner),
            name: name.into(),
            args: args.into(),
            member,
        };
        self.entries
            .insert((owner.key(), signature_hash(name, args)), entry);
    }

    fn purge(&self) -> usize {
        self.entries.retain(|_, entry| entry.owner.strong_count() > 0)
    }

    fn stat(&self) -> CacheStat {
        CacheStat::collect(&self.counters, self.entries.len(), self.entries.evictions())
    }

    fn clear(&self) {
        self.entries.clear();
        self.counters.reset();
    }
}

#[derive(Clone)]
struct TypeNameEntry {
    /// `None` records that no type has this name.
    ty: Option<Weak<TypeInfo>>,
    generation: u64,
}

impl TypeNameEntry {
    fn alive(&self) -> bool {
        self.ty.as_ref().map_or(true, |ty| ty.strong_count() > 0)
    }
}

/// Identity of a compiled chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainKey {
    path_hash: u64,
    /// Where compilation started; non-zero for continuations.
    offset: usize,
    owner: TypeKey,
    write: bool,
    /// Whether first-segment rules (self token, variables) applied.
    rooted: bool,
    /// Registry generation the chain's static and literal references were resolved in.
    generation: u64,
}

impl ChainKey {
    pub fn new(
        path: &str,
        offset: usize,
        owner: TypeKey,
        write: bool,
        rooted: bool,
        generation: u64,
    ) -> Self {
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        Self {
            path_hash: hasher.finish(),
            offset,
            owner,
            write,
            rooted,
            generation,
        }
    }
}

#[derive(Clone)]
struct ChainEntry {
    /// `None` when the chain was compiled against `null`.
    owner: Option<Weak<TypeInfo>>,
    chain: Arc<AccessorChain>,
}

impl ChainEntry {
    fn alive(&self) -> bool {
        self.owner
            .as_ref()
            .map_or(true, |owner| owner.strong_count() > 0)
    }
}

/// The caches shared by every resolution through one context.
pub struct ResolutionCache {
    enabled: bool,
    pub methods: MemberCache<MethodInfo>,
    pub constructors: MemberCache<ConstructorInfo>,
    type_names: BoundedCache<Arc<str>, TypeNameEntry>,
    type_name_counters: Counters,
    chains: BoundedCache<ChainKey, ChainEntry>,
    chain_counters: Counters,
    compilations: AtomicU64,
}

impl ResolutionCache {
    pub fn new(config: &AccessConfig) -> Self {
        Self {
            enabled: config.cache_enabled,
            methods: MemberCache::new(config.member_cache_capacity, config.cache_enabled),
            constructors: MemberCache::new(config.member_cache_capacity, config.cache_enabled),
            type_names: BoundedCache::new(config.type_name_cache_capacity),
            type_name_counters: Counters::default(),
            chains: BoundedCache::new(config.chain_cache_capacity),
            chain_counters: Counters::default(),
            compilations: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Type previously found for `name`; `Some(None)` records a known miss.
    pub fn type_name(&self, name: &str, generation: u64) -> Option<Option<TypeRef>> {
        if !self.enabled {
            return None;
        }
        let found = self
            .type_names
            .get(&Arc::from(name))
            .filter(|entry| entry.generation == generation)
            .and_then(|entry| match entry.ty {
                None => Some(None),
                Some(ty) => ty.upgrade().map(Some),
            });
        self.type_name_counters.record(found)
    }

    pub fn store_type_name(&self, name: &str, ty: Option<&TypeRef>, generation: u64) {
        if !self.enabled {
            return;
        }
        let entry = TypeNameEntry {
            ty: ty.map(Arc::downgrade),
            generation,
        };
        self.type_names.insert(name.into(), entry);
    }

    pub fn chain(&self, key: &ChainKey, path: &str) -> Option<Arc<AccessorChain>> {
        if !self.enabled {
            return None;
        }
        let found = self
            .chains
            .get(key)
            .filter(|entry| entry.alive() && entry.chain.path() == path)
            .map(|entry| entry.chain);
        if found.is_some() {
            tracing::trace!(?key, "chain cache hit");
        }
        self.chain_counters.record(found)
    }

    /// Publishes a READY chain. Concurrent compiles of one key race; the last one wins.
    pub fn store_chain(&self, key: ChainKey, owner: Option<&TypeRef>, chain: Arc<AccessorChain>) {
        if !self.enabled {
            return;
        }
        let entry = ChainEntry {
            owner: owner.map(Arc::downgrade),
            chain,
        };
        self.chains.insert(key, entry);
    }

    pub fn record_compilation(&self) {
        self.compilations.fetch_add(1, Ordering::Relaxed);
    }

    /// Drops every entry whose owner type is gone, and name or chain entries
    /// resolved under an older registry generation. Returns how many were dropped.
    pub fn purge(&self, generation: u64) -> usize {
        let dropped = self.methods.purge()
            + self.constructors.purge()
            + self
                .type_names
                .retain(|_, entry| entry.alive() && entry.generation == generation)
            + self
                .chains
                .retain(|key, entry| entry.alive() && key.generation == generation);
        tracing::debug!(dropped, "resolution cache purged");
        dropped
    }

    pub fn clear(&self) {
        self.methods.clear();
        self.constructors.clear();
        self.type_names.clear();
        self.type_name_counters.reset();
        self.chains.clear();
        self.chain_counters.reset();
        self.compilations.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            methods: self.methods.stat(),
            constructors: self.constructors.stat(),
            type_names: CacheStat::collect(
                &self.type_name_counters,
                self.type_names.len(),
                self.type_names.evictions(),
            ),
            chains: CacheStat::collect(
                &self.chain_counters,
                self.chains.len(),
                self.chains.evictions(),
            ),
            compilations: self.compilations.load(Ordering::Relaxed),
        }
    }
}
