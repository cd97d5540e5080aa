use crate::utils::config::{JAVA_LANG_PREFIX, PACKAGE_SEPARATOR};
use crate::utils::error::ClassNotFoundError;
use log::debug;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// Handle to a loaded type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeHandle {
    name: String,
}

impl TypeHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Fully qualified name of the loaded type
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Underlying loader consulted on a cache miss
pub trait ClassLoader: Send + Sync {
    fn load_class(&self, name: &str) -> Result<TypeHandle, ClassNotFoundError>;
}

/// Loader backed by a fixed set of known type names
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    names: HashSet<String>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, name: impl Into<String>) -> Self {
        self.names.insert(name.into());
        self
    }

    pub fn register(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }
}

impl<S: Into<String>> FromIterator<S> for ClassRegistry {
    fn from_iter<I: IntoIterator<Item = S>>(names: I) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl ClassLoader for ClassRegistry {
    fn load_class(&self, name: &str) -> Result<TypeHandle, ClassNotFoundError> {
        if self.names.contains(name) {
            Ok(TypeHandle::new(name))
        } else {
            Err(ClassNotFoundError(name.to_string()))
        }
    }
}

/// Memoizing resolver in front of a [`ClassLoader`]
///
/// Safe to share between threads. Two callers missing on the same name may
/// both hit the loader; the last insert wins.
pub struct CachingClassResolver<L> {
    loader: L,
    cache: RwLock<HashMap<String, TypeHandle>>,
}

impl<L: ClassLoader> CachingClassResolver<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a class by name
    ///
    /// The name is tried verbatim first. Only when that fails and the name is
    /// unqualified is `java.lang.<name>` tried; its result is cached under
    /// both the requested and the qualified name.
    ///
    /// # Errors
    /// * `ClassNotFoundError` - neither lookup found a type
    pub fn resolve(&self, name: &str) -> Result<TypeHandle, ClassNotFoundError> {
        if let Some(handle) = self.cache.read().get(name) {
            return Ok(handle.clone());
        }

        let handle = match self.loader.load_class(name) {
            Ok(handle) => handle,
            Err(e) if name.contains(PACKAGE_SEPARATOR) => return Err(e),
            Err(_) => {
                let qualified = format!("{}{}", JAVA_LANG_PREFIX, name);
                debug!("Retrying unqualified class {} as {}", name, qualified);
                let handle = self.loader.load_class(&qualified)?;
                self.cache.write().insert(qualified, handle.clone());
                handle
            }
        };

        self.cache.write().insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    /// Number of cached names
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn clear(&self) {
        self.cache.write().clear();
    }
}
