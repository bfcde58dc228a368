//! Compute-once, cache, allow-override attributes.
//!
//! An [`Attrs`] table belongs to one owner (the "context", e.g. a
//! [`Descriptor`](crate::Descriptor)). Each attribute is either required
//! (set from outside), a plain value, or a producer run with the owner as
//! receiver on first read. Producers read sibling attributes through the
//! owner, so the dependency graph is whatever order the producers read in.
//!
//! No borrow of the store is held while a producer runs.

use super::store::{AttrStore, AttrValue};
use crate::error::{Error, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Producer for a derived attribute.
pub type Producer<C> = Rc<dyn Fn(&C) -> Result<AttrValue>>;

/// Plain function producer, used by [`Attrs::install`].
pub type ProducerFn<C> = fn(&C) -> Result<AttrValue>;

/// How an attribute gets its value.
pub enum Definition<C> {
    /// Must be set from outside before it is read.
    Required,
    /// Computed on first read.
    Producer(Producer<C>),
}

impl<C> Clone for Definition<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Required => Self::Required,
            Self::Producer(p) => Self::Producer(Rc::clone(p)),
        }
    }
}

/// Attribute table for one context instance.
pub struct Attrs<C> {
    defs: HashMap<&'static str, Definition<C>>,
    store: RefCell<AttrStore>,
    resolving: RefCell<Vec<&'static str>>,
}

impl<C> Default for Attrs<C> {
    fn default() -> Self {
        Self {
            defs: HashMap::new(),
            store: RefCell::new(AttrStore::new()),
            resolving: RefCell::new(Vec::new()),
        }
    }
}

impl<C> fmt::Debug for Attrs<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.defs.keys().copied().collect();
        names.sort_unstable();
        f.debug_struct("Attrs")
            .field("defined", &names)
            .field("store", &self.store.borrow())
            .finish()
    }
}

impl<C> Attrs<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a named set of plain-function producers.
    pub fn install(&mut self, defs: &[(&'static str, ProducerFn<C>)])
    where
        C: 'static,
    {
        for &(name, producer) in defs {
            self.defs
                .insert(name, Definition::Producer(Rc::new(producer)));
        }
    }

    /// Define `name` as derived by `producer`, replacing any earlier definition.
    pub fn define<F>(&mut self, name: &'static str, producer: F)
    where
        F: Fn(&C) -> Result<AttrValue> + 'static,
    {
        self.defs
            .insert(name, Definition::Producer(Rc::new(producer)));
    }

    /// Define `name` with an immediate value.
    pub fn define_value(&mut self, name: &'static str, value: AttrValue) {
        self.defs.insert(name, Definition::Required);
        self.store.borrow_mut().set(name, value);
    }

    /// Declare `name` as required: reading it unset is a precondition error.
    pub fn require(&mut self, name: &'static str) {
        self.defs.insert(name, Definition::Required);
    }

    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// Defined attribute names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.defs.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Read `name`, running its producer on first access.
    ///
    /// # Errors
    /// `MissingAttribute` if `name` is required (or undefined) and unset,
    /// `AttributeCycle` if the producer re-enters `name`, or whatever the
    /// producer returns. Failed computations are not cached.
    pub fn get(&self, ctx: &C, name: &'static str) -> Result<AttrValue> {
        if let Some(value) = self.store.borrow().get(name) {
            return Ok(value.clone());
        }

        let producer = match self.defs.get(name) {
            Some(Definition::Producer(p)) => Rc::clone(p),
            Some(Definition::Required) | None => {
                return Err(Error::MissingAttribute {
                    missing: name,
                    attribute: self.current().unwrap_or(name),
                });
            }
        };

        if self.resolving.borrow().contains(&name) {
            return Err(Error::AttributeCycle { attribute: name });
        }

        self.resolving.borrow_mut().push(name);
        let result = producer(ctx);
        self.resolving.borrow_mut().pop();

        let value = result?;
        self.store.borrow_mut().set(name, value.clone());
        Ok(value)
    }

    /// Store `value` directly. Dependents that were already computed keep
    /// their cached values.
    pub fn set(&self, name: &'static str, value: AttrValue) {
        self.store.borrow_mut().set(name, value);
    }

    /// Drop the cached value so the next read runs the producer again.
    ///
    /// Returns true if a value was cached.
    pub fn reset(&self, name: &str) -> bool {
        self.store.borrow_mut().remove(name).is_some()
    }

    /// Drop every cached value.
    pub fn reset_all(&self) {
        self.store.borrow_mut().clear();
    }

    /// True if `name` currently has a cached value.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.store.borrow().has(name)
    }

    /// The cached value of `name`, without computing it.
    #[must_use]
    pub fn cached(&self, name: &str) -> Option<AttrValue> {
        self.store.borrow().get(name).cloned()
    }

    fn current(&self) -> Option<&'static str> {
        self.resolving.borrow().last().copied()
    }
}
