// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Pickle serialization, protocol 2 only.
//!
//! Every complete stream is `PROTO 2`, one self-contained fragment for the
//! top-level value, then `STOP`.  Fragments compose: container encoders call
//! back into [`Pickler::save`] for their children, and the memo table turns
//! repeated references into `BINGET` fetches.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Write;
use std::sync::Arc;

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use chrono::{Datelike, NaiveDateTime, TimeDelta, Timelike};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::consts::*;
use crate::error::{Error, ErrorCode, Result};
use crate::registry::{self, ObjectPickler, PicklerRegistry};
use crate::value::{HashableValue, ObjectRef, Shared, SharedFrozen, TypedArray, Value};
use crate::value_impls::to_value;

/// Value graphs nesting deeper than this are rejected rather than risking
/// the thread's stack.
const MAX_RECURSION_DEPTH: usize = 200;

/// Options for serializing.
#[derive(Clone, Default)]
pub struct SerOptions {
    no_memo: bool,
    registry: Option<Arc<PicklerRegistry>>,
}

impl SerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable the memo table.  Every occurrence of a value is written out
    /// in full, and cyclic containers are no longer detected.
    pub fn without_memo(mut self) -> Self {
        self.no_memo = true;
        self
    }

    /// Consult this registry for custom picklers instead of the
    /// process-wide one.
    pub fn with_registry(mut self, registry: Arc<PicklerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }
}

/// Identity under which a written value is filed in the memo.
///
/// Strings, chars and the value-typed scalars share slots by content, so
/// equal texts collapse to one encoding.  Containers, bytestrings and
/// foreign objects are filed by allocation; that is also what lets a list
/// that reaches itself resolve to a fetch instead of recursing.
#[derive(Clone, PartialEq, Eq, Hash)]
enum MemoKey {
    Addr(usize),
    Str(String),
    Date(i64, u32),
    Delta(i64, i32),
    Dec(Decimal),
}

/// Mapping from written values to their memo slots, assigned densely from 0
/// in write order.
struct MemoTable {
    slots: HashMap<MemoKey, u32>,
}

impl MemoTable {
    fn new() -> MemoTable {
        MemoTable { slots: HashMap::new() }
    }

    fn clear(&mut self) {
        self.slots.clear();
    }

    fn get(&self, key: &MemoKey) -> Option<u32> {
        self.slots.get(key).copied()
    }

    fn insert(&mut self, key: MemoKey) -> u32 {
        let slot = self.slots.len() as u32;
        self.slots.insert(key, slot);
        slot
    }
}

/// The object-safe slice of the serializer handed to custom picklers:
/// recursive saves plus raw opcode emission.
pub trait Saver {
    /// Write a complete self-contained fragment for `value`.
    fn save(&mut self, value: &Value) -> Result<()>;

    /// Write a single opcode byte.
    fn write_opcode(&mut self, opcode: u8) -> Result<()>;

    /// Write raw bytes into the stream.
    fn write_raw(&mut self, bytes: &[u8]) -> Result<()>;

    /// Write a `GLOBAL` reference to `module.name`.
    fn write_global(&mut self, module: &str, name: &str) -> Result<()>;
}

/// A structure for serializing host values into a pickle stream.  One
/// [`dump`](Pickler::dump) call is one session: the memo table and the
/// recursion counter reset at entry.
pub struct Pickler<W: Write> {
    writer: W,
    options: SerOptions,
    memo: MemoTable,
    depth: usize,
}

impl<W: Write> Pickler<W> {
    pub fn new(writer: W, options: SerOptions) -> Pickler<W> {
        Pickler {
            writer,
            options,
            memo: MemoTable::new(),
            depth: 0,
        }
    }

    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Write `value` as a complete protocol 2 pickle.
    pub fn dump(&mut self, value: &Value) -> Result<()> {
        self.memo.clear();
        self.depth = 0;
        self.write_raw(&[PROTO, 2])?;
        self.save(value)?;
        if self.depth != 0 {
            return Err(Error::Encoding(ErrorCode::UnbalancedRecursion));
        }
        self.write_opcode(STOP)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write one value as a self-contained fragment.
    pub fn save(&mut self, value: &Value) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_RECURSION_DEPTH {
            return Err(Error::Encoding(ErrorCode::RecursionTooDeep));
        }
        // The memo is consulted before anything else, so a repeated
        // reference short-circuits identically whatever its category.
        let key = self.memo_key(value);
        if let Some(ref key) = key {
            if self.fetch_memo(key)? {
                self.depth -= 1;
                return Ok(());
            }
        }
        match *value {
            Value::None => self.write_opcode(NONE)?,
            Value::Bool(b) => self.write_opcode(if b { NEWTRUE } else { NEWFALSE })?,
            Value::I64(v) => self.save_int(v)?,
            Value::Int(ref v) => self.save_bigint(v)?,
            Value::F64(v) => self.save_float(v)?,
            Value::Char(c) => self.save_string(&c.to_string(), key)?,
            Value::String(ref s) => self.save_string(s.inner(), key)?,
            Value::Bytes(ref b) => self.save_bytes(b.inner(), key)?,
            Value::Array(ref a) => self.save_array(a.inner(), key)?,
            Value::Tuple(ref t) => self.save_tuple(t, key)?,
            Value::List(ref l) => self.save_list(l, key)?,
            Value::Dict(ref d) => self.save_dict(d, key)?,
            Value::Set(ref s) => self.save_set("set", &*s.inner(), key)?,
            Value::FrozenSet(ref s) => self.save_set("frozenset", s.inner(), key)?,
            Value::DateTime(dt) => self.save_datetime(dt, key)?,
            Value::TimeDelta(d) => self.save_timedelta(d, key)?,
            Value::Decimal(d) => self.save_decimal(d, key)?,
            Value::Object(ref o) => self.save_object(o, key)?,
        }
        self.depth -= 1;
        Ok(())
    }

    /// Write a dict key or set element.  Same encoders, narrower domain.
    pub fn save_hashable(&mut self, value: &HashableValue) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_RECURSION_DEPTH {
            return Err(Error::Encoding(ErrorCode::RecursionTooDeep));
        }
        let key = self.hashable_memo_key(value);
        if let Some(ref key) = key {
            if self.fetch_memo(key)? {
                self.depth -= 1;
                return Ok(());
            }
        }
        match *value {
            HashableValue::None => self.write_opcode(NONE)?,
            HashableValue::Bool(b) => self.write_opcode(if b { NEWTRUE } else { NEWFALSE })?,
            HashableValue::I64(v) => self.save_int(v)?,
            HashableValue::Int(ref v) => self.save_bigint(v)?,
            HashableValue::F64(v) => self.save_float(v)?,
            HashableValue::Bytes(ref b) => self.save_bytes(b.inner(), key)?,
            HashableValue::String(ref s) => self.save_string(s.inner(), key)?,
            HashableValue::Tuple(ref t) => self.save_hashable_tuple(t, key)?,
            HashableValue::FrozenSet(ref s) => self.save_set("frozenset", s.inner(), key)?,
        }
        self.depth -= 1;
        Ok(())
    }

    fn memo_key(&self, value: &Value) -> Option<MemoKey> {
        if self.options.no_memo {
            return None;
        }
        match *value {
            Value::None | Value::Bool(_) | Value::I64(_) | Value::Int(_) | Value::F64(_) => None,
            Value::Char(c) => Some(MemoKey::Str(c.to_string())),
            Value::String(ref s) => Some(MemoKey::Str(s.inner().clone())),
            Value::Bytes(ref b) => Some(MemoKey::Addr(b.provenance())),
            Value::Array(ref a) => Some(MemoKey::Addr(a.provenance())),
            Value::Tuple(ref t) => Some(MemoKey::Addr(t.provenance())),
            Value::List(ref l) => Some(MemoKey::Addr(l.provenance())),
            Value::Dict(ref d) => Some(MemoKey::Addr(d.provenance())),
            Value::Set(ref s) => Some(MemoKey::Addr(s.provenance())),
            Value::FrozenSet(ref s) => Some(MemoKey::Addr(s.provenance())),
            Value::DateTime(dt) => {
                let utc = dt.and_utc();
                Some(MemoKey::Date(utc.timestamp(), utc.timestamp_subsec_nanos()))
            }
            Value::TimeDelta(d) => Some(MemoKey::Delta(d.num_seconds(), d.subsec_nanos())),
            Value::Decimal(d) => Some(MemoKey::Dec(d)),
            Value::Object(ref o) => Some(MemoKey::Addr(o.provenance())),
        }
    }

    fn hashable_memo_key(&self, value: &HashableValue) -> Option<MemoKey> {
        if self.options.no_memo {
            return None;
        }
        match *value {
            HashableValue::None
            | HashableValue::Bool(_)
            | HashableValue::I64(_)
            | HashableValue::Int(_)
            | HashableValue::F64(_) => None,
            HashableValue::Bytes(ref b) => Some(MemoKey::Addr(b.provenance())),
            HashableValue::String(ref s) => Some(MemoKey::Str(s.inner().clone())),
            HashableValue::Tuple(ref t) => Some(MemoKey::Addr(t.provenance())),
            HashableValue::FrozenSet(ref s) => Some(MemoKey::Addr(s.provenance())),
        }
    }

    /// On a memo hit, emit the fetch opcode for the slot and report success.
    fn fetch_memo(&mut self, key: &MemoKey) -> Result<bool> {
        let Some(slot) = self.memo.get(key) else {
            return Ok(false);
        };
        if slot <= 0xff {
            self.write_opcode(BINGET)?;
            self.writer.write_u8(slot as u8)?;
        } else {
            self.write_opcode(LONG_BINGET)?;
            self.writer.write_u32::<LittleEndian>(slot)?;
        }
        Ok(true)
    }

    /// Assign the next slot to `key` and emit the store opcode.  No-op when
    /// memoization is off.
    fn store_memo(&mut self, key: Option<MemoKey>) -> Result<()> {
        let Some(key) = key else {
            return Ok(());
        };
        let slot = self.memo.insert(key);
        if slot <= 0xff {
            self.write_opcode(BINPUT)?;
            self.writer.write_u8(slot as u8)?;
        } else {
            self.write_opcode(LONG_BINPUT)?;
            self.writer.write_u32::<LittleEndian>(slot)?;
        }
        Ok(())
    }

    fn write_opcode(&mut self, opcode: u8) -> Result<()> {
        self.writer.write_u8(opcode).map_err(From::from)
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes).map_err(From::from)
    }

    fn write_global(&mut self, module: &str, name: &str) -> Result<()> {
        self.write_opcode(GLOBAL)?;
        self.write_raw(module.as_bytes())?;
        self.write_raw(b"\n")?;
        self.write_raw(name.as_bytes())?;
        self.write_raw(b"\n")
    }

    /// Integers take the narrowest opcode that holds their value.
    fn save_int(&mut self, value: i64) -> Result<()> {
        if value >= 0 {
            if value <= 0xff {
                self.write_opcode(BININT1)?;
                return self.writer.write_u8(value as u8).map_err(From::from);
            }
            if value <= 0xffff {
                self.write_opcode(BININT2)?;
                return self
                    .writer
                    .write_u16::<LittleEndian>(value as u16)
                    .map_err(From::from);
            }
        }
        if let Ok(v) = i32::try_from(value) {
            self.write_opcode(BININT)?;
            self.writer.write_i32::<LittleEndian>(v).map_err(From::from)
        } else {
            self.write_opcode(INT)?;
            self.write_raw(value.to_string().as_bytes())?;
            self.write_raw(b"\n")
        }
    }

    /// Values beyond 64 bits ride the text INT opcode, whose decimal payload
    /// has no magnitude limit.
    fn save_bigint(&mut self, value: &BigInt) -> Result<()> {
        if let Some(v) = value.to_i64() {
            return self.save_int(v);
        }
        self.write_opcode(INT)?;
        self.write_raw(value.to_string().as_bytes())?;
        self.write_raw(b"\n")
    }

    fn save_float(&mut self, value: f64) -> Result<()> {
        self.write_opcode(BINFLOAT)?;
        self.writer.write_f64::<BigEndian>(value).map_err(From::from)
    }

    fn save_string(&mut self, value: &str, key: Option<MemoKey>) -> Result<()> {
        self.write_opcode(BINUNICODE)?;
        self.writer.write_u32::<LittleEndian>(value.len() as u32)?;
        self.write_raw(value.as_bytes())?;
        self.store_memo(key)
    }

    /// Bytestrings reconstruct as `bytearray(text, "latin-1")`, where the
    /// text holds one codepoint per byte.
    fn save_bytes(&mut self, bytes: &[u8], key: Option<MemoKey>) -> Result<()> {
        self.write_global("__builtin__", "bytearray")?;
        let widened: String = bytes.iter().map(|&b| b as char).collect();
        self.save(&Value::from(widened))?;
        self.save(&Value::from("latin-1"))?;
        self.write_opcode(TUPLE2)?;
        self.write_opcode(REDUCE)?;
        self.store_memo(key)
    }

    /// Primitive arrays reconstruct as `array.array(typecode, [items])`.
    fn save_array(&mut self, array: &TypedArray, key: Option<MemoKey>) -> Result<()> {
        self.write_global("array", "array")?;
        self.write_opcode(SHORT_BINSTRING)?;
        self.write_raw(&[1, array.typecode()])?;
        self.write_opcode(EMPTY_LIST)?;
        self.write_opcode(MARK)?;
        match *array {
            TypedArray::I8(ref v) => {
                for &x in v {
                    self.save(&Value::I64(x as i64))?;
                }
            }
            TypedArray::I16(ref v) => {
                for &x in v {
                    self.save(&Value::I64(x as i64))?;
                }
            }
            TypedArray::U16(ref v) => {
                for &x in v {
                    self.save(&Value::I64(x as i64))?;
                }
            }
            TypedArray::I32(ref v) => {
                for &x in v {
                    self.save(&Value::I64(x as i64))?;
                }
            }
            TypedArray::U32(ref v) => {
                for &x in v {
                    self.save(&Value::I64(x as i64))?;
                }
            }
            TypedArray::I64(ref v) => {
                for &x in v {
                    self.save(&Value::I64(x))?;
                }
            }
            TypedArray::U64(ref v) => {
                for &x in v {
                    self.save(&Value::from(x))?;
                }
            }
            TypedArray::F32(ref v) => {
                for &x in v {
                    self.save(&Value::F64(x as f64))?;
                }
            }
            TypedArray::F64(ref v) => {
                for &x in v {
                    self.save(&Value::F64(x))?;
                }
            }
        }
        self.write_opcode(APPENDS)?;
        self.write_opcode(TUPLE2)?;
        self.write_opcode(REDUCE)?;
        self.store_memo(key)
    }

    fn save_tuple(&mut self, tuple: &SharedFrozen<Vec<Value>>, key: Option<MemoKey>) -> Result<()> {
        let items = tuple.inner();
        // A tuple is memoized only after its contents are written, so an
        // element aliasing the tuple itself could never resolve.
        for item in items.iter() {
            if let Value::Tuple(ref inner) = *item {
                if inner.provenance() == tuple.provenance() {
                    return Err(Error::Encoding(ErrorCode::RecursiveTuple));
                }
            }
        }
        match items.len() {
            0 => self.write_opcode(EMPTY_TUPLE)?,
            1 => {
                self.save(&items[0])?;
                self.write_opcode(TUPLE1)?;
            }
            2 => {
                self.save(&items[0])?;
                self.save(&items[1])?;
                self.write_opcode(TUPLE2)?;
            }
            3 => {
                self.save(&items[0])?;
                self.save(&items[1])?;
                self.save(&items[2])?;
                self.write_opcode(TUPLE3)?;
            }
            _ => {
                self.write_opcode(MARK)?;
                for item in items.iter() {
                    self.save(item)?;
                }
                self.write_opcode(TUPLE)?;
            }
        }
        self.store_memo(key)
    }

    fn save_hashable_tuple(
        &mut self,
        tuple: &SharedFrozen<Vec<HashableValue>>,
        key: Option<MemoKey>,
    ) -> Result<()> {
        let items = tuple.inner();
        for item in items.iter() {
            if let HashableValue::Tuple(ref inner) = *item {
                if inner.provenance() == tuple.provenance() {
                    return Err(Error::Encoding(ErrorCode::RecursiveTuple));
                }
            }
        }
        match items.len() {
            0 => self.write_opcode(EMPTY_TUPLE)?,
            1 => {
                self.save_hashable(&items[0])?;
                self.write_opcode(TUPLE1)?;
            }
            2 => {
                self.save_hashable(&items[0])?;
                self.save_hashable(&items[1])?;
                self.write_opcode(TUPLE2)?;
            }
            3 => {
                self.save_hashable(&items[0])?;
                self.save_hashable(&items[1])?;
                self.save_hashable(&items[2])?;
                self.write_opcode(TUPLE3)?;
            }
            _ => {
                self.write_opcode(MARK)?;
                for item in items.iter() {
                    self.save_hashable(item)?;
                }
                self.write_opcode(TUPLE)?;
            }
        }
        self.store_memo(key)
    }

    fn save_list(&mut self, list: &Shared<Vec<Value>>, key: Option<MemoKey>) -> Result<()> {
        self.write_opcode(EMPTY_LIST)?;
        // The slot must exist before the items drain, so a list reaching
        // itself resolves to a fetch instead of recursing forever.
        self.store_memo(key)?;
        self.write_opcode(MARK)?;
        let items = list.inner();
        for item in items.iter() {
            self.save(item)?;
        }
        self.write_opcode(APPENDS)
    }

    fn save_dict(
        &mut self,
        dict: &Shared<BTreeMap<HashableValue, Value>>,
        key: Option<MemoKey>,
    ) -> Result<()> {
        self.write_opcode(EMPTY_DICT)?;
        self.store_memo(key)?;
        self.write_opcode(MARK)?;
        let entries = dict.inner();
        for (k, v) in entries.iter() {
            self.save_hashable(k)?;
            self.save(v)?;
        }
        self.write_opcode(SETITEMS)
    }

    /// Sets reconstruct through `set([items])` (or `frozenset`); protocol 2
    /// has no set opcodes of its own.
    fn save_set(
        &mut self,
        name: &str,
        elements: &BTreeSet<HashableValue>,
        key: Option<MemoKey>,
    ) -> Result<()> {
        self.write_global("__builtin__", name)?;
        self.write_opcode(EMPTY_LIST)?;
        self.write_opcode(MARK)?;
        for element in elements.iter() {
            self.save_hashable(element)?;
        }
        self.write_opcode(APPENDS)?;
        self.write_opcode(TUPLE1)?;
        self.write_opcode(REDUCE)?;
        self.store_memo(key)
    }

    /// Timestamps reconstruct through the seven-field `datetime.datetime`
    /// constructor.
    fn save_datetime(&mut self, dt: NaiveDateTime, key: Option<MemoKey>) -> Result<()> {
        self.write_global("datetime", "datetime")?;
        self.write_opcode(MARK)?;
        // Leap-second nanoseconds fold into the last representable micro.
        let micro = (dt.nanosecond() / 1_000).min(999_999);
        let fields = [
            dt.year() as i64,
            dt.month() as i64,
            dt.day() as i64,
            dt.hour() as i64,
            dt.minute() as i64,
            dt.second() as i64,
            micro as i64,
        ];
        for field in fields {
            self.save(&Value::I64(field))?;
        }
        self.write_opcode(TUPLE)?;
        self.write_opcode(REDUCE)?;
        self.store_memo(key)
    }

    fn save_timedelta(&mut self, delta: TimeDelta, key: Option<MemoKey>) -> Result<()> {
        self.write_global("datetime", "timedelta")?;
        let days = delta.num_days();
        let rem = delta - TimeDelta::days(days);
        let seconds = rem.num_seconds();
        let micros = (rem - TimeDelta::seconds(seconds))
            .num_microseconds()
            .unwrap_or(0);
        // TUPLE3 consumes exactly three stack items; no MARK needed.
        self.save(&Value::I64(days))?;
        self.save(&Value::I64(seconds))?;
        self.save(&Value::I64(micros))?;
        self.write_opcode(TUPLE3)?;
        self.write_opcode(REDUCE)?;
        self.store_memo(key)
    }

    fn save_decimal(&mut self, decimal: Decimal, key: Option<MemoKey>) -> Result<()> {
        self.write_global("decimal", "Decimal")?;
        self.save(&Value::from(decimal.to_string()))?;
        self.write_opcode(TUPLE1)?;
        self.write_opcode(REDUCE)?;
        self.store_memo(key)
    }

    /// Foreign objects: a registered custom pickler wins over reflection;
    /// with neither, the object cannot be written.
    fn save_object(&mut self, obj: &ObjectRef, key: Option<MemoKey>) -> Result<()> {
        if let Some(pickler) = self.lookup_pickler(obj) {
            pickler.pickle(obj, self).map_err(|err| match err {
                Error::Io(_) => err,
                other => Error::Custom(format!(
                    "custom pickler for {}: {other}",
                    obj.type_name()
                )),
            })?;
            return self.store_memo(key);
        }
        let Some(record) = obj.record() else {
            return Err(Error::Encoding(ErrorCode::Unpicklable(
                obj.type_name().to_owned(),
            )));
        };
        let class = record.class_name();
        let fields = record.fields()?;
        self.write_opcode(EMPTY_DICT)?;
        self.store_memo(key)?;
        self.write_opcode(MARK)?;
        if let Some(class) = class {
            self.save(&Value::from("__class__"))?;
            self.save(&Value::from(class.into_owned()))?;
        }
        for (name, value) in fields {
            self.save(&Value::from(name.into_owned()))?;
            self.save(&value)?;
        }
        self.write_opcode(SETITEMS)
    }

    fn lookup_pickler(&self, obj: &ObjectRef) -> Option<Arc<dyn ObjectPickler>> {
        match self.options.registry {
            Some(ref explicit) => explicit.lookup(obj),
            None => registry::global_lookup(obj),
        }
    }
}

impl<W: Write> Saver for Pickler<W> {
    fn save(&mut self, value: &Value) -> Result<()> {
        Pickler::save(self, value)
    }

    fn write_opcode(&mut self, opcode: u8) -> Result<()> {
        Pickler::write_opcode(self, opcode)
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        Pickler::write_raw(self, bytes)
    }

    fn write_global(&mut self, module: &str, name: &str) -> Result<()> {
        Pickler::write_global(self, module, name)
    }
}

/// Serialize a value into any writer, as one complete pickle.
pub fn value_to_writer<W: Write>(writer: &mut W, value: &Value, options: SerOptions) -> Result<()> {
    Pickler::new(writer, options).dump(value)
}

/// Serialize a value into a byte vector.
pub fn value_to_vec(value: &Value, options: SerOptions) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    value_to_writer(&mut buf, value, options)?;
    Ok(buf)
}

/// Serialize any serde-serializable object into a writer.
pub fn to_writer<W: Write, T: Serialize>(
    writer: &mut W,
    value: &T,
    options: SerOptions,
) -> Result<()> {
    let value = to_value(value)?;
    value_to_writer(writer, &value, options)
}

/// Serialize any serde-serializable object into a byte vector.
pub fn to_vec<T: Serialize>(value: &T, options: SerOptions) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    to_writer(&mut buf, value, options)?;
    Ok(buf)
}
