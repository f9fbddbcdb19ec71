// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Reflection over record-like host objects.
//!
//! A type opts into reflection by implementing [`Record`]: a class tag plus a
//! snapshot of its readable state.  The encoder turns that snapshot into a
//! dict whose `"__class__"` entry carries the tag.  The macros below generate
//! the impl for the three common shapes; anything fancier (renamed fields,
//! computed values, fallible reads) can implement the trait by hand.

use std::borrow::Cow;

use crate::error::Result;
use crate::value::Value;

/// Field-by-field access to a record-like host object.
pub trait Record {
    /// The class tag written under `"__class__"`.  Returning `None` omits
    /// the entry, which is how anonymous/synthetic types are written.
    fn class_name(&self) -> Option<Cow<'static, str>>;

    /// A snapshot of the readable state, in write order.  A failing field
    /// accessor should surface as [`Error::FieldRead`](crate::Error).
    fn fields(&self) -> Result<Vec<(Cow<'static, str>, Value)>>;
}

/// Implement [`Record`] with explicit wire names per field, optionally
/// overriding the class tag.
///
/// ```
/// use pickler::pickle_contract;
///
/// struct Sensor {
///     id: i64,
///     temperature: f64,
/// }
///
/// pickle_contract!(Sensor as "telemetry.Sensor" {
///     "sensorId" => id,
///     "reading" => temperature,
/// });
/// ```
///
/// Without the `as` clause the tag is the fully-qualified Rust type name.
#[macro_export]
macro_rules! pickle_contract {
    ($ty:ty as $class:literal { $($name:literal => $field:ident),+ $(,)? }) => {
        impl $crate::Record for $ty {
            fn class_name(&self) -> Option<::std::borrow::Cow<'static, str>> {
                Some(::std::borrow::Cow::Borrowed($class))
            }

            fn fields(
                &self,
            ) -> $crate::Result<Vec<(::std::borrow::Cow<'static, str>, $crate::Value)>> {
                Ok(vec![$(
                    (
                        ::std::borrow::Cow::Borrowed($name),
                        $crate::Value::from(self.$field.clone()),
                    ),
                )+])
            }
        }
    };
    ($ty:ty { $($name:literal => $field:ident),+ $(,)? }) => {
        impl $crate::Record for $ty {
            fn class_name(&self) -> Option<::std::borrow::Cow<'static, str>> {
                Some(::std::borrow::Cow::Borrowed(::std::any::type_name::<$ty>()))
            }

            fn fields(
                &self,
            ) -> $crate::Result<Vec<(::std::borrow::Cow<'static, str>, $crate::Value)>> {
                Ok(vec![$(
                    (
                        ::std::borrow::Cow::Borrowed($name),
                        $crate::Value::from(self.$field.clone()),
                    ),
                )+])
            }
        }
    };
}

/// Implement [`Record`] over named fields, keyed by their declared names.
///
/// ```
/// use pickler::pickle_fields;
///
/// struct Config {
///     retries: i64,
///     verbose: bool,
/// }
///
/// pickle_fields!(Config { retries, verbose });
/// ```
#[macro_export]
macro_rules! pickle_fields {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::Record for $ty {
            fn class_name(&self) -> Option<::std::borrow::Cow<'static, str>> {
                Some(::std::borrow::Cow::Borrowed(::std::any::type_name::<$ty>()))
            }

            fn fields(
                &self,
            ) -> $crate::Result<Vec<(::std::borrow::Cow<'static, str>, $crate::Value)>> {
                Ok(vec![$(
                    (
                        ::std::borrow::Cow::Borrowed(stringify!($field)),
                        $crate::Value::from(self.$field.clone()),
                    ),
                )+])
            }
        }
    };
}

/// Implement [`Record`] over readable accessor methods, keyed by the method
/// names.
///
/// ```
/// use pickler::pickle_accessors;
///
/// struct Gauge(f64);
///
/// impl Gauge {
///     fn level(&self) -> f64 {
///         self.0
///     }
/// }
///
/// pickle_accessors!(Gauge { level });
/// ```
#[macro_export]
macro_rules! pickle_accessors {
    ($ty:ty { $($accessor:ident),+ $(,)? }) => {
        impl $crate::Record for $ty {
            fn class_name(&self) -> Option<::std::borrow::Cow<'static, str>> {
                Some(::std::borrow::Cow::Borrowed(::std::any::type_name::<$ty>()))
            }

            fn fields(
                &self,
            ) -> $crate::Result<Vec<(::std::borrow::Cow<'static, str>, $crate::Value)>> {
                Ok(vec![$(
                    (
                        ::std::borrow::Cow::Borrowed(stringify!($accessor)),
                        $crate::Value::from(self.$accessor()),
                    ),
                )+])
            }
        }
    };
}
