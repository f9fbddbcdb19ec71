// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! A pickle protocol 2 encoder for Rust values.
//!
//! Writes byte streams any Python from 2.3 on reconstructs with a plain
//! `pickle.loads`.  The stream is protocol 2, the newest protocol Python 2
//! reads, and nothing newer is ever emitted.
//!
//! Values enter the encoder in one of two ways:
//!
//! * as a [`Value`] tree built by hand or through the `From` conversions —
//!   this is the door that supports shared references, cyclic lists, and
//!   foreign objects ([`ObjectRef`]) with custom picklers or reflection;
//! * through serde, via [`to_vec`]/[`to_writer`], for anything deriving
//!   `Serialize`.
//!
//! Repeated references are deduplicated through the pickle memo: the first
//! occurrence is written in full and later ones become fetches of its memo
//! slot.  Memo identity is by content for strings and scalar object types,
//! and by allocation for containers, which is what makes a self-containing
//! list come back from `pickle.loads` as exactly that.
//!
//! # Example
//!
//! ```
//! use pickler::{SerOptions, Value};
//!
//! let value = Value::list(vec![Value::from(1i64), Value::from("two")]);
//! let bytes = pickler::value_to_vec(&value, SerOptions::new()).unwrap();
//! assert!(bytes.starts_with(b"\x80\x02") && bytes.ends_with(b"."));
//! ```
//!
//! Through serde:
//!
//! ```
//! use serde_derive::Serialize;
//!
//! #[derive(Serialize)]
//! struct Point {
//!     x: i64,
//!     y: i64,
//! }
//!
//! let bytes = pickler::to_vec(&Point { x: 3, y: 4 }, pickler::SerOptions::new()).unwrap();
//! // pickle.loads(bytes) == {'__class__': 'Point', 'x': 3, 'y': 4}
//! ```

pub mod consts;
mod error;
mod record;
mod registry;
mod ser;
mod value;
mod value_impls;

pub use crate::error::{Error, ErrorCode, Result};
pub use crate::record::Record;
pub use crate::registry::{ObjectPickler, PicklerRegistry, register, register_matcher};
pub use crate::ser::{
    Pickler, Saver, SerOptions, to_vec, to_writer, value_to_vec, value_to_writer,
};
pub use crate::value::{
    HashableValue, ObjectRef, Shared, SharedFrozen, TypedArray, Value, to_value,
};

#[cfg(test)]
#[path = "../test/mod.rs"]
mod test;
