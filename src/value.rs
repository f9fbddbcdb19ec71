// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Host values that can be written as pickles, and conversions into them.

use chrono::{Datelike, NaiveDateTime, TimeDelta, Timelike};
use itertools::Itertools;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive};
use rust_decimal::Decimal;
use std::any::{self, Any, TypeId};
use std::cell::{Ref, RefCell, RefMut};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

pub use crate::value_impls::to_value;

use crate::error::{Error, ErrorCode};
use crate::record::Record;

/// A mutable, aliasable container payload.  Clones share the underlying
/// storage, and `provenance` exposes the allocation identity the memo table
/// keys shared containers by.
#[derive(Debug, Eq, PartialOrd, Ord, Clone)]
pub struct Shared<T>(Rc<RefCell<T>>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Shared(Rc::new(RefCell::new(value)))
    }

    pub fn inner<'a>(&'a self) -> Ref<'a, T> {
        self.0.borrow()
    }

    pub fn inner_mut<'a>(&'a self) -> RefMut<'a, T> {
        self.0.borrow_mut()
    }

    pub fn provenance(&self) -> usize {
        Rc::as_ptr(&self.0).expose_provenance()
    }
}

impl<T> From<T> for Shared<T> {
    fn from(value: T) -> Self {
        Shared::new(value)
    }
}

impl<T> std::cmp::PartialEq for Shared<T>
where
    T: std::cmp::PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        if Rc::ptr_eq(&self.0, &other.0) {
            return true;
        }

        let this_inner = self.0.borrow();
        let other_inner = other.0.borrow();

        this_inner.eq(&other_inner)
    }
}

/// An immutable shared container payload.  Like [`Shared`], but frozen after
/// construction, which is what lets tuples and frozen sets be memoized only
/// after their contents were written.
#[derive(Debug, Eq, PartialOrd, Ord, Clone)]
pub struct SharedFrozen<T>(Rc<T>);

impl<T> SharedFrozen<T> {
    pub fn new(value: T) -> Self {
        SharedFrozen(Rc::new(value))
    }

    pub fn inner<'a>(&'a self) -> &T {
        self.0.as_ref()
    }

    pub fn provenance(&self) -> usize {
        Rc::as_ptr(&self.0).expose_provenance()
    }
}

impl<T> From<T> for SharedFrozen<T> {
    fn from(value: T) -> Self {
        SharedFrozen::new(value)
    }
}

impl<T> std::cmp::PartialEq for SharedFrozen<T>
where
    T: std::cmp::PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        if Rc::ptr_eq(&self.0, &other.0) {
            return true;
        }

        let this_inner = self.inner();
        let other_inner = other.inner();

        this_inner.eq(other_inner)
    }
}

/// A homogeneous array of machine primitives, written as `array.array`.
///
/// The element types mirror the typecodes `array.array` accepts.  Byte
/// arrays are not represented here: `Vec<u8>` converts to [`Value::Bytes`]
/// and becomes a `bytearray`.  Arrays of bools or chars have no typecode
/// either; express them as a tuple or a string.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedArray {
    /// Signed 8-bit, typecode `b`
    I8(Vec<i8>),
    /// Signed 16-bit, typecode `h`
    I16(Vec<i16>),
    /// Unsigned 16-bit, typecode `H`
    U16(Vec<u16>),
    /// Signed 32-bit, typecode `i`
    I32(Vec<i32>),
    /// Unsigned 32-bit, typecode `I`
    U32(Vec<u32>),
    /// Signed 64-bit, typecode `l`
    I64(Vec<i64>),
    /// Unsigned 64-bit, typecode `L`
    U64(Vec<u64>),
    /// 32-bit float, typecode `f`
    F32(Vec<f32>),
    /// 64-bit float, typecode `d`
    F64(Vec<f64>),
}

impl TypedArray {
    /// The `array.array` typecode for this element type.
    pub fn typecode(&self) -> u8 {
        match *self {
            TypedArray::I8(_) => b'b',
            TypedArray::I16(_) => b'h',
            TypedArray::U16(_) => b'H',
            TypedArray::I32(_) => b'i',
            TypedArray::U32(_) => b'I',
            TypedArray::I64(_) => b'l',
            TypedArray::U64(_) => b'L',
            TypedArray::F32(_) => b'f',
            TypedArray::F64(_) => b'd',
        }
    }

    pub fn len(&self) -> usize {
        match *self {
            TypedArray::I8(ref v) => v.len(),
            TypedArray::I16(ref v) => v.len(),
            TypedArray::U16(ref v) => v.len(),
            TypedArray::I32(ref v) => v.len(),
            TypedArray::U32(ref v) => v.len(),
            TypedArray::I64(ref v) => v.len(),
            TypedArray::U64(ref v) => v.len(),
            TypedArray::F32(ref v) => v.len(),
            TypedArray::F64(ref v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for TypedArray {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "array('{}', [", self.typecode() as char)?;
        match *self {
            TypedArray::I8(ref v) => write!(f, "{}", v.iter().format(", "))?,
            TypedArray::I16(ref v) => write!(f, "{}", v.iter().format(", "))?,
            TypedArray::U16(ref v) => write!(f, "{}", v.iter().format(", "))?,
            TypedArray::I32(ref v) => write!(f, "{}", v.iter().format(", "))?,
            TypedArray::U32(ref v) => write!(f, "{}", v.iter().format(", "))?,
            TypedArray::I64(ref v) => write!(f, "{}", v.iter().format(", "))?,
            TypedArray::U64(ref v) => write!(f, "{}", v.iter().format(", "))?,
            TypedArray::F32(ref v) => write!(f, "{}", v.iter().format(", "))?,
            TypedArray::F64(ref v) => write!(f, "{}", v.iter().format(", "))?,
        }
        f.write_str("])")
    }
}

/// A foreign host object carried through the value graph.
///
/// Built from any type implementing [`Record`] (see the derivation macros in
/// this crate), which makes it writable through reflection; or from an
/// arbitrary value via [`ObjectRef::opaque`], in which case only a registered
/// custom pickler can write it.  Identity is the allocation, so repeated
/// references share one memo slot.
#[derive(Clone)]
pub struct ObjectRef {
    any: Rc<dyn Any>,
    record: Option<Rc<dyn Record>>,
    type_name: &'static str,
}

impl ObjectRef {
    /// Wrap a reflectable host object.
    pub fn new<T: Record + 'static>(value: T) -> Self {
        let rc = Rc::new(value);
        ObjectRef {
            any: rc.clone() as Rc<dyn Any>,
            record: Some(rc),
            type_name: any::type_name::<T>(),
        }
    }

    /// Wrap a host object with no reflection capability.  Writing it
    /// requires a custom pickler registered for `T`.
    pub fn opaque<T: Any>(value: T) -> Self {
        ObjectRef {
            any: Rc::new(value),
            record: None,
            type_name: any::type_name::<T>(),
        }
    }

    /// The fully-qualified Rust name of the wrapped type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The `TypeId` of the wrapped value, as the registry keys it.
    pub fn type_id(&self) -> TypeId {
        (*self.any).type_id()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.any.downcast_ref()
    }

    /// The reflection capability, if the wrapped type has one.
    pub fn record(&self) -> Option<&dyn Record> {
        self.record.as_deref()
    }

    pub fn provenance(&self) -> usize {
        Rc::as_ptr(&self.any).cast::<()>().expose_provenance()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ObjectRef({})", self.type_name)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.any, &other.any)
    }
}

/// Represents all host values that can be written as a pickle and restored
/// by `pickle.loads`.
///
/// Note on integers: every machine integer that fits an i64 lives in `I64`;
/// `Int` holds the rest (in particular u64 values above the signed range).
/// Both unpickle as plain Python ints, the split only selects the wire
/// encoding.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "variantly", derive(variantly::Variantly))]
pub enum Value {
    /// None
    None,
    /// Boolean
    Bool(bool),
    /// Short integer
    I64(i64),
    /// Long integer (unbounded length)
    Int(BigInt),
    /// Float
    F64(f64),
    /// Single character, written as a 1-codepoint string
    Char(char),
    /// Unicode string
    String(SharedFrozen<String>),
    /// Bytestring, written as a `bytearray`
    Bytes(SharedFrozen<Vec<u8>>),
    /// Homogeneous primitive array, written as `array.array`
    Array(SharedFrozen<TypedArray>),
    /// Tuple
    #[cfg_attr(feature = "variantly", variantly(rename = "tuple_variant"))]
    Tuple(SharedFrozen<Vec<Value>>),
    /// List
    #[cfg_attr(feature = "variantly", variantly(rename = "list_variant"))]
    List(Shared<Vec<Value>>),
    /// Dictionary (map)
    #[cfg_attr(feature = "variantly", variantly(rename = "dict_variant"))]
    Dict(Shared<BTreeMap<HashableValue, Value>>),
    /// Set
    #[cfg_attr(feature = "variantly", variantly(rename = "set_variant"))]
    Set(Shared<BTreeSet<HashableValue>>),
    /// Frozen (immutable) set
    #[cfg_attr(feature = "variantly", variantly(rename = "frozen_set_variant"))]
    FrozenSet(SharedFrozen<BTreeSet<HashableValue>>),
    /// Wall-clock timestamp, written as `datetime.datetime`
    DateTime(NaiveDateTime),
    /// Time interval, written as `datetime.timedelta`
    TimeDelta(TimeDelta),
    /// Fixed-point decimal, written as `decimal.Decimal`
    Decimal(Decimal),
    /// Foreign host object: custom-pickled or reflected into a dict
    Object(ObjectRef),
}

/// Represents all host values that can be contained in a "hashable" context
/// (i.e., as dictionary keys and set elements).
///
/// In Rust, the type is *not* hashable, since we use B-tree maps and sets
/// instead of the hash variants.  To be able to put all Value instances
/// into these B-trees, we implement a consistent ordering between all
/// the possible types (see below).
#[derive(Clone, Debug)]
#[cfg_attr(feature = "variantly", derive(variantly::Variantly))]
pub enum HashableValue {
    /// None
    None,
    /// Boolean
    Bool(bool),
    /// Short integer
    I64(i64),
    /// Long integer
    Int(BigInt),
    /// Float
    F64(f64),
    /// Bytestring
    Bytes(SharedFrozen<Vec<u8>>),
    /// Unicode string
    String(SharedFrozen<String>),
    /// Tuple
    Tuple(SharedFrozen<Vec<HashableValue>>),
    /// Frozen (immutable) set
    FrozenSet(SharedFrozen<BTreeSet<HashableValue>>),
}

fn values_to_hashable(
    values: SharedFrozen<Vec<Value>>,
) -> Result<SharedFrozen<Vec<HashableValue>>, Error> {
    Ok(values
        .inner()
        .iter()
        .cloned()
        .map(Value::into_hashable)
        .collect::<Result<Vec<_>, _>>()?
        .into())
}

fn hashable_to_values(values: SharedFrozen<Vec<HashableValue>>) -> SharedFrozen<Vec<Value>> {
    values
        .inner()
        .iter()
        .cloned()
        .map(HashableValue::into_value)
        .collect::<Vec<_>>()
        .into()
}

impl Value {
    /// Convert the value into a hashable version, if possible.  If not, return
    /// a ValueNotHashable error.
    pub fn into_hashable(self) -> Result<HashableValue, Error> {
        match self {
            Value::None => Ok(HashableValue::None),
            Value::Bool(b) => Ok(HashableValue::Bool(b)),
            Value::I64(i) => Ok(HashableValue::I64(i)),
            Value::Int(i) => Ok(HashableValue::Int(i)),
            Value::F64(f) => Ok(HashableValue::F64(f)),
            Value::Char(c) => Ok(HashableValue::String(SharedFrozen::new(c.to_string()))),
            Value::Bytes(b) => Ok(HashableValue::Bytes(b)),
            Value::String(s) => Ok(HashableValue::String(s)),
            Value::FrozenSet(v) => Ok(HashableValue::FrozenSet(v)),
            Value::Tuple(v) => values_to_hashable(v).map(HashableValue::Tuple),
            _ => Err(Error::Encoding(ErrorCode::ValueNotHashable)),
        }
    }

    /// Build a list value.
    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Shared::new(items))
    }

    /// Build a tuple value.
    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(SharedFrozen::new(items))
    }

    /// Build a dict value from key/value pairs.
    pub fn dict(entries: impl IntoIterator<Item = (HashableValue, Value)>) -> Value {
        Value::Dict(Shared::new(entries.into_iter().collect()))
    }

    /// Build a set value.
    pub fn set(elements: impl IntoIterator<Item = HashableValue>) -> Value {
        Value::Set(Shared::new(elements.into_iter().collect()))
    }

    /// Build a frozenset value.
    pub fn frozen_set(elements: impl IntoIterator<Item = HashableValue>) -> Value {
        Value::FrozenSet(SharedFrozen::new(elements.into_iter().collect()))
    }
}

impl HashableValue {
    /// Convert the value into its non-hashable version.  This always works.
    pub fn into_value(self) -> Value {
        match self {
            HashableValue::None => Value::None,
            HashableValue::Bool(b) => Value::Bool(b),
            HashableValue::I64(i) => Value::I64(i),
            HashableValue::Int(i) => Value::Int(i),
            HashableValue::F64(f) => Value::F64(f),
            HashableValue::Bytes(b) => Value::Bytes(b),
            HashableValue::String(s) => Value::String(s),
            HashableValue::FrozenSet(v) => Value::FrozenSet(v),
            HashableValue::Tuple(v) => Value::Tuple(hashable_to_values(v)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", if b { "True" } else { "False" }),
            Value::I64(i) => write!(f, "{i}"),
            Value::Int(ref i) => write!(f, "{i}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Char(c) => write!(f, "{c:?}"),
            Value::Bytes(ref b) => {
                let b = b.inner();
                write!(f, "b{b:?}")
            }
            Value::String(ref s) => {
                let s = s.inner();
                write!(f, "{s:?}")
            }
            Value::Array(ref a) => write!(f, "{}", a.inner()),
            Value::List(ref v) => {
                let v = v.inner();
                write!(f, "[{}]", v.iter().format(", "))
            }
            Value::Tuple(ref v) => {
                let v = v.inner();
                if v.len() == 1 {
                    write!(f, "({},)", v[0])
                } else {
                    write!(f, "({})", v.iter().format(", "))
                }
            }
            Value::FrozenSet(ref v) => {
                let v = v.inner();
                write!(f, "frozenset([{}])", v.iter().format(", "))
            }
            Value::Set(ref v) => {
                let v = v.inner();
                if v.is_empty() {
                    write!(f, "set()")
                } else {
                    write!(f, "{{{}}}", v.iter().format(", "))
                }
            }
            Value::Dict(ref v) => {
                let v = v.inner();
                write!(
                    f,
                    "{{{}}}",
                    v.iter()
                        .format_with(", ", |(key, value), g| g(&format_args!("{key}: {value}")))
                )
            }
            Value::DateTime(dt) => write!(
                f,
                "datetime.datetime({}, {}, {}, {}, {}, {}, {})",
                dt.year(),
                dt.month(),
                dt.day(),
                dt.hour(),
                dt.minute(),
                dt.second(),
                dt.nanosecond() / 1_000
            ),
            Value::TimeDelta(d) => {
                let days = d.num_days();
                let rem = d - TimeDelta::days(days);
                let seconds = rem.num_seconds();
                let micros = (rem - TimeDelta::seconds(seconds))
                    .num_microseconds()
                    .unwrap_or(0);
                write!(f, "datetime.timedelta({days}, {seconds}, {micros})")
            }
            Value::Decimal(d) => write!(f, "Decimal('{d}')"),
            Value::Object(ref o) => match o.record().and_then(|r| r.class_name()) {
                Some(class) => write!(f, "<{class} object>"),
                None => write!(f, "<{} object>", o.type_name()),
            },
        }
    }
}

impl fmt::Display for HashableValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            HashableValue::None => write!(f, "None"),
            HashableValue::Bool(b) => write!(f, "{}", if b { "True" } else { "False" }),
            HashableValue::I64(i) => write!(f, "{i}"),
            HashableValue::Int(ref i) => write!(f, "{i}"),
            HashableValue::F64(v) => write!(f, "{v}"),
            HashableValue::Bytes(ref b) => {
                let b = b.inner();
                write!(f, "b{b:?}")
            }
            HashableValue::String(ref s) => {
                let s = s.inner();
                write!(f, "{s:?}")
            }
            HashableValue::Tuple(ref v) => {
                let v = v.inner();
                if v.len() == 1 {
                    write!(f, "({},)", v[0])
                } else {
                    write!(f, "({})", v.iter().format(", "))
                }
            }
            HashableValue::FrozenSet(ref v) => {
                let v = v.inner();
                write!(f, "frozenset([{}])", v.iter().format(", "))
            }
        }
    }
}

impl PartialEq for HashableValue {
    fn eq(&self, other: &HashableValue) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HashableValue {}

impl PartialOrd for HashableValue {
    fn partial_cmp(&self, other: &HashableValue) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Implement a (more or less) consistent ordering for `HashableValue`s
/// so that they can be added to dictionaries and sets.
///
/// Also, like in Python, numeric values with the same value (integral or not)
/// must compare equal.
///
/// For other types, we define an ordering between all types A and B so that all
/// objects of type A are always lesser than objects of type B.  This is done
/// similar to Python 2's ordering of different types.
impl Ord for HashableValue {
    fn cmp(&self, other: &HashableValue) -> Ordering {
        use self::HashableValue::*;
        match *self {
            None => match *other {
                None => Ordering::Equal,
                _ => Ordering::Less,
            },
            Bool(b) => match *other {
                None => Ordering::Greater,
                Bool(b2) => b.cmp(&b2),
                I64(i2) => (b as i64).cmp(&i2),
                Int(ref bi) => BigInt::from(b as i64).cmp(bi),
                F64(f) => float_ord(b as i64 as f64, f),
                _ => Ordering::Less,
            },
            I64(i) => match *other {
                None => Ordering::Greater,
                Bool(b) => i.cmp(&(b as i64)),
                I64(i2) => i.cmp(&i2),
                Int(ref bi) => BigInt::from(i).cmp(bi),
                F64(f) => float_ord(i as f64, f),
                _ => Ordering::Less,
            },
            Int(ref bi) => match *other {
                None => Ordering::Greater,
                Bool(b) => bi.cmp(&BigInt::from(b as i64)),
                I64(i) => bi.cmp(&BigInt::from(i)),
                Int(ref bi2) => bi.cmp(bi2),
                F64(f) => float_bigint_ord(bi, f),
                _ => Ordering::Less,
            },
            F64(f) => match *other {
                None => Ordering::Greater,
                Bool(b) => float_ord(f, b as i64 as f64),
                I64(i) => float_ord(f, i as f64),
                Int(ref bi) => BigInt::from(f as i64).cmp(bi),
                F64(f2) => float_ord(f, f2),
                _ => Ordering::Less,
            },
            Bytes(ref bs) => match *other {
                String(_) | FrozenSet(_) | Tuple(_) => Ordering::Less,
                Bytes(ref bs2) => bs.cmp(bs2),
                _ => Ordering::Greater,
            },
            String(ref s) => match *other {
                FrozenSet(_) | Tuple(_) => Ordering::Less,
                String(ref s2) => s.cmp(s2),
                _ => Ordering::Greater,
            },
            FrozenSet(ref s) => match *other {
                Tuple(_) => Ordering::Less,
                FrozenSet(ref s2) => s.cmp(s2),
                _ => Ordering::Greater,
            },
            Tuple(ref t) => match *other {
                Tuple(ref t2) => t.cmp(t2),
                _ => Ordering::Greater,
            },
        }
    }
}

/// A "reasonable" total ordering for floats.
fn float_ord(f: f64, g: f64) -> Ordering {
    match f.partial_cmp(&g) {
        Some(o) => o,
        None => Ordering::Less,
    }
}

/// Ordering between floats and big integers.
fn float_bigint_ord(bi: &BigInt, g: f64) -> Ordering {
    match bi.to_f64() {
        Some(f) => float_ord(f, g),
        None => {
            if bi.is_positive() {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
    }
}

// Conversions from host types.  These encode the fixed part of value
// classification: which machine type lands in which pickle category.

macro_rules! from_small_int {
    ($($ty:ty)*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Value {
                    Value::I64(value as i64)
                }
            }

            impl From<$ty> for HashableValue {
                fn from(value: $ty) -> HashableValue {
                    HashableValue::I64(value as i64)
                }
            }
        )*
    };
}

from_small_int!(i8 i16 i32 i64 u8 u16 u32);

impl From<u64> for Value {
    fn from(value: u64) -> Value {
        match i64::try_from(value) {
            Ok(v) => Value::I64(v),
            Err(_) => Value::Int(BigInt::from(value)),
        }
    }
}

impl From<u64> for HashableValue {
    fn from(value: u64) -> HashableValue {
        match i64::try_from(value) {
            Ok(v) => HashableValue::I64(v),
            Err(_) => HashableValue::Int(BigInt::from(value)),
        }
    }
}

impl From<i128> for Value {
    fn from(value: i128) -> Value {
        match i64::try_from(value) {
            Ok(v) => Value::I64(v),
            Err(_) => Value::Int(BigInt::from(value)),
        }
    }
}

impl From<u128> for Value {
    fn from(value: u128) -> Value {
        match i64::try_from(value) {
            Ok(v) => Value::I64(v),
            Err(_) => Value::Int(BigInt::from(value)),
        }
    }
}

impl From<BigInt> for Value {
    fn from(value: BigInt) -> Value {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::Bool(value)
    }
}

impl From<bool> for HashableValue {
    fn from(value: bool) -> HashableValue {
        HashableValue::Bool(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Value {
        Value::F64(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Value {
        Value::F64(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Value {
        Value::Char(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::String(SharedFrozen::new(value.to_owned()))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value::String(SharedFrozen::new(value))
    }
}

impl From<&str> for HashableValue {
    fn from(value: &str) -> HashableValue {
        HashableValue::String(SharedFrozen::new(value.to_owned()))
    }
}

impl From<String> for HashableValue {
    fn from(value: String) -> HashableValue {
        HashableValue::String(SharedFrozen::new(value))
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Value {
        Value::Bytes(SharedFrozen::new(value))
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Value {
        Value::Bytes(SharedFrozen::new(value.to_owned()))
    }
}

macro_rules! from_primitive_array {
    ($($ty:ty => $variant:ident,)*) => {
        $(
            impl From<Vec<$ty>> for Value {
                fn from(value: Vec<$ty>) -> Value {
                    Value::Array(SharedFrozen::new(TypedArray::$variant(value)))
                }
            }
        )*
    };
}

from_primitive_array! {
    i8 => I8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

impl From<TypedArray> for Value {
    fn from(value: TypedArray) -> Value {
        Value::Array(SharedFrozen::new(value))
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Value {
        Value::DateTime(value)
    }
}

impl From<TimeDelta> for Value {
    fn from(value: TimeDelta) -> Value {
        Value::TimeDelta(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Value {
        Value::Decimal(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Value {
        Value::Object(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Value {
        Value::List(Shared::new(value))
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Value {
        Value::List(Shared::new(iter.into_iter().collect()))
    }
}

impl From<BTreeMap<HashableValue, Value>> for Value {
    fn from(value: BTreeMap<HashableValue, Value>) -> Value {
        Value::Dict(Shared::new(value))
    }
}

impl From<BTreeSet<HashableValue>> for Value {
    fn from(value: BTreeSet<HashableValue>) -> Value {
        Value::Set(Shared::new(value))
    }
}
