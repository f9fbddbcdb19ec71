// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Registry of user-supplied picklers, keyed by host type.
//!
//! Lookup is exact-type first, then an insertion-ordered walk over predicate
//! matchers, so a pickler registered for a whole family of types (everything
//! implementing some trait, say) is found deterministically.  A registry can
//! be built and handed to [`SerOptions`](crate::SerOptions) explicitly, or
//! the process-wide one can be filled through [`register`] and
//! [`register_matcher`].  The process-wide registry is meant to be populated
//! at startup; concurrent registration needs external coordination.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use crate::error::Result;
use crate::ser::Saver;
use crate::value::ObjectRef;

/// A user-supplied encoder for one host type.
///
/// The pickler receives the wrapped object and the live [`Saver`], through
/// which it can emit opcodes and recursively save child values.  It must
/// leave exactly one new item on the virtual stack (a complete fragment);
/// the caller memoizes the object afterwards.
pub trait ObjectPickler: Send + Sync {
    fn pickle(&self, obj: &ObjectRef, saver: &mut dyn Saver) -> Result<()>;
}

impl<F> ObjectPickler for F
where
    F: Fn(&ObjectRef, &mut dyn Saver) -> Result<()> + Send + Sync,
{
    fn pickle(&self, obj: &ObjectRef, saver: &mut dyn Saver) -> Result<()> {
        self(obj, saver)
    }
}

type Matcher = Box<dyn Fn(&ObjectRef) -> bool + Send + Sync>;

/// A mapping from host types to their custom picklers.
#[derive(Default)]
pub struct PicklerRegistry {
    exact: HashMap<TypeId, Arc<dyn ObjectPickler>>,
    matchers: Vec<(Matcher, Arc<dyn ObjectPickler>)>,
}

impl PicklerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pickler for the exact type `T`, superseding any earlier
    /// registration for it.
    pub fn register<T: Any>(&mut self, pickler: Arc<dyn ObjectPickler>) {
        self.exact.insert(TypeId::of::<T>(), pickler);
    }

    /// Register a pickler behind a predicate.  Matchers are consulted in
    /// registration order once exact lookup misses; the first accepting one
    /// wins.
    pub fn register_matcher(
        &mut self,
        matches: impl Fn(&ObjectRef) -> bool + Send + Sync + 'static,
        pickler: Arc<dyn ObjectPickler>,
    ) {
        self.matchers.push((Box::new(matches), pickler));
    }

    /// Find the pickler responsible for `obj`, if any.
    pub fn lookup(&self, obj: &ObjectRef) -> Option<Arc<dyn ObjectPickler>> {
        if let Some(pickler) = self.exact.get(&obj.type_id()) {
            return Some(pickler.clone());
        }
        self.matchers
            .iter()
            .find(|(matches, _)| matches(obj))
            .map(|(_, pickler)| pickler.clone())
    }
}

static GLOBAL: LazyLock<RwLock<PicklerRegistry>> =
    LazyLock::new(|| RwLock::new(PicklerRegistry::new()));

/// Register a pickler for `T` on the process-wide registry.
pub fn register<T: Any>(pickler: Arc<dyn ObjectPickler>) {
    GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register::<T>(pickler);
}

/// Register a predicate matcher on the process-wide registry.
pub fn register_matcher(
    matches: impl Fn(&ObjectRef) -> bool + Send + Sync + 'static,
    pickler: Arc<dyn ObjectPickler>,
) {
    GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register_matcher(matches, pickler);
}

pub(crate) fn global_lookup(obj: &ObjectRef) -> Option<Arc<dyn ObjectPickler>> {
    GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .lookup(obj)
}
