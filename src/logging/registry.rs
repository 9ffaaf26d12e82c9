//! Handler registry: logger name → sink bindings.
//!
//! # Resolution
//! ```text
//! record from "app.db.pool"
//!     → binding "app.db.pool" (if any)
//!     → binding "app.db"      (if any)
//!     → binding "app"         (if any)
//!     → binding "root"
//! Each binding whose min level admits the record emits to its sink.
//! A binding with propagate = false ends the walk.
//! ```
//!
//! # Design Decisions
//! - Bindings live in an immutable map behind `ArcSwap`; readers never lock
//! - `bind` is copy-on-write, so a rebind never tears a concurrent dispatch
//! - Rebinding a name only replaces that entry; other names are untouched

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::logging::record::LogRecord;
use crate::logging::sink::Sink;
use crate::logging::Level;

/// Name of the root binding every lookup ends at.
pub const ROOT: &str = "root";

/// A sink attached to a logger name.
#[derive(Clone)]
pub struct HandlerBinding {
    pub logger: Arc<str>,
    pub sink: Arc<dyn Sink>,
    pub min_level: Level,
    pub propagate: bool,
}

impl fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("logger", &self.logger)
            .field("min_level", &self.min_level)
            .field("propagate", &self.propagate)
            .finish_non_exhaustive()
    }
}

/// Names visited when resolving `name`, most specific first.
fn lineage(name: &str) -> impl Iterator<Item = &str> {
    let own = (!name.is_empty() && name != ROOT).then_some(name);
    let ancestors = own
        .into_iter()
        .flat_map(|name| name.rmatch_indices('.').map(move |(i, _)| &name[..i]))
        .filter(|prefix| !prefix.is_empty());
    own.into_iter().chain(ancestors).chain(std::iter::once(ROOT))
}

/// Maps logger names to sinks.
pub struct HandlerRegistry {
    bindings: ArcSwap<HashMap<Arc<str>, HandlerBinding>>,
}

impl HandlerRegistry {
    /// A registry with no bindings; records are dropped until something is bound.
    pub fn new() -> Self {
        Self {
            bindings: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// A registry with only a root binding.
    pub fn with_root(sink: Arc<dyn Sink>, min_level: Level) -> Self {
        let registry = Self::new();
        registry.bind(ROOT, sink, min_level, false);
        registry
    }

    /// Bind (or rebind) `name` to `sink`.
    pub fn bind(&self, name: &str, sink: Arc<dyn Sink>, min_level: Level, propagate: bool) {
        let name: Arc<str> = if name.is_empty() { Arc::from(ROOT) } else { Arc::from(name) };
        let binding = HandlerBinding {
            logger: name.clone(),
            sink,
            min_level,
            propagate,
        };
        self.bindings.rcu(|current| {
            let mut next = (**current).clone();
            next.insert(name.clone(), binding.clone());
            next
        });
    }

    /// The explicit binding for `name`, if one exists.
    pub fn binding(&self, name: &str) -> Option<HandlerBinding> {
        let name = if name.is_empty() { ROOT } else { name };
        self.bindings.load().get(name).cloned()
    }

    /// Whether a record at `level` from `name` would reach any sink.
    pub fn is_enabled(&self, name: &str, level: Level) -> bool {
        let bindings = self.bindings.load();
        for candidate in lineage(name) {
            if let Some(binding) = bindings.get(candidate) {
                if level >= binding.min_level {
                    return true;
                }
                if !binding.propagate {
                    return false;
                }
            }
        }
        false
    }

    /// Deliver `record` to every admitting sink along its lineage.
    /// Returns the number of sinks that received it.
    pub fn dispatch(&self, record: &LogRecord) -> usize {
        let bindings = self.bindings.load();
        let mut delivered = 0;
        for candidate in lineage(&record.logger) {
            if let Some(binding) = bindings.get(candidate) {
                if record.level >= binding.min_level {
                    binding.sink.emit(record);
                    delivered += 1;
                }
                if !binding.propagate {
                    break;
                }
            }
        }
        delivered
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings = self.bindings.load();
        let mut names: Vec<_> = bindings.keys().map(|k| k.as_ref()).collect();
        names.sort_unstable();
        f.debug_struct("HandlerRegistry").field("bindings", &names).finish()
    }
}
