//! Class name resolution for trace filter expressions.
//!
//! Resolving a class name through a loader is expensive, so successful
//! lookups are memoized. Unqualified names fall back to `java.lang.<name>`.

pub mod class_resolver;

pub use class_resolver::{CachingClassResolver, ClassLoader, ClassRegistry, TypeHandle};
