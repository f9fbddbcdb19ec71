// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Converting serde-serializable objects into `Value` trees.

use std::collections::BTreeMap;

use serde::ser::{self, Serialize};

use crate::error::{Error, Result};
use crate::value::{HashableValue, Shared, SharedFrozen, Value};

/// Convert any serializable object into a [`Value`].
///
/// The mapping follows the wire categories: sequences become lists, Rust
/// tuples become tuples, maps become dicts (keys must be hashable), unit
/// enum variants become their bare label, and structs become dicts carrying
/// a `"__class__"` entry with the serde name — so `#[serde(rename = "…")]`
/// on the container doubles as a class-tag override.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    value.serialize(Serializer)
}

struct Serializer;

impl ser::Serializer for Serializer {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = SerializeVec;
    type SerializeTuple = SerializeTuple;
    type SerializeTupleStruct = SerializeTuple;
    type SerializeTupleVariant = SerializeTupleVariant;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeStruct;
    type SerializeStructVariant = SerializeStructVariant;

    fn serialize_bool(self, value: bool) -> Result<Value> {
        Ok(Value::Bool(value))
    }

    fn serialize_i8(self, value: i8) -> Result<Value> {
        Ok(Value::I64(value as i64))
    }

    fn serialize_i16(self, value: i16) -> Result<Value> {
        Ok(Value::I64(value as i64))
    }

    fn serialize_i32(self, value: i32) -> Result<Value> {
        Ok(Value::I64(value as i64))
    }

    fn serialize_i64(self, value: i64) -> Result<Value> {
        Ok(Value::I64(value))
    }

    fn serialize_i128(self, value: i128) -> Result<Value> {
        Ok(Value::from(value))
    }

    fn serialize_u8(self, value: u8) -> Result<Value> {
        Ok(Value::I64(value as i64))
    }

    fn serialize_u16(self, value: u16) -> Result<Value> {
        Ok(Value::I64(value as i64))
    }

    fn serialize_u32(self, value: u32) -> Result<Value> {
        Ok(Value::I64(value as i64))
    }

    fn serialize_u64(self, value: u64) -> Result<Value> {
        Ok(Value::from(value))
    }

    fn serialize_u128(self, value: u128) -> Result<Value> {
        Ok(Value::from(value))
    }

    fn serialize_f32(self, value: f32) -> Result<Value> {
        Ok(Value::F64(value as f64))
    }

    fn serialize_f64(self, value: f64) -> Result<Value> {
        Ok(Value::F64(value))
    }

    fn serialize_char(self, value: char) -> Result<Value> {
        Ok(Value::Char(value))
    }

    fn serialize_str(self, value: &str) -> Result<Value> {
        Ok(Value::String(SharedFrozen::new(value.to_owned())))
    }

    fn serialize_bytes(self, value: &[u8]) -> Result<Value> {
        Ok(Value::Bytes(SharedFrozen::new(value.to_owned())))
    }

    fn serialize_none(self) -> Result<Value> {
        Ok(Value::None)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value> {
        value.serialize(Serializer)
    }

    fn serialize_unit(self) -> Result<Value> {
        Ok(Value::None)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value> {
        Ok(Value::None)
    }

    // Unit variants are written as their bare label; consumers that need
    // the enum type have to wrap it in a custom pickler.
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value> {
        Ok(Value::from(variant))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value> {
        value.serialize(Serializer)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value> {
        let inner = value.serialize(Serializer)?;
        Ok(Value::dict([(HashableValue::from(variant), inner)]))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeVec> {
        Ok(SerializeVec {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeTuple> {
        Ok(SerializeTuple {
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SerializeTuple> {
        self.serialize_tuple(len)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeTupleVariant> {
        Ok(SerializeTupleVariant {
            variant,
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<SerializeMap> {
        Ok(SerializeMap {
            entries: BTreeMap::new(),
            next_key: None,
        })
    }

    fn serialize_struct(self, name: &'static str, _len: usize) -> Result<SerializeStruct> {
        let mut entries = BTreeMap::new();
        entries.insert(HashableValue::from("__class__"), Value::from(name));
        Ok(SerializeStruct { entries })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<SerializeStructVariant> {
        Ok(SerializeStructVariant {
            variant,
            entries: BTreeMap::new(),
        })
    }
}

struct SerializeVec {
    items: Vec<Value>,
}

impl ser::SerializeSeq for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.items.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::List(Shared::new(self.items)))
    }
}

struct SerializeTuple {
    items: Vec<Value>,
}

impl ser::SerializeTuple for SerializeTuple {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.items.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Tuple(SharedFrozen::new(self.items)))
    }
}

impl ser::SerializeTupleStruct for SerializeTuple {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.items.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Tuple(SharedFrozen::new(self.items)))
    }
}

struct SerializeTupleVariant {
    variant: &'static str,
    items: Vec<Value>,
}

impl ser::SerializeTupleVariant for SerializeTupleVariant {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.items.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::dict([(
            HashableValue::from(self.variant),
            Value::Tuple(SharedFrozen::new(self.items)),
        )]))
    }
}

struct SerializeMap {
    entries: BTreeMap<HashableValue, Value>,
    next_key: Option<HashableValue>,
}

impl ser::SerializeMap for SerializeMap {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<()> {
        self.next_key = Some(to_value(key)?.into_hashable()?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        // serde drives serialize_key strictly before serialize_value.
        let key = self.next_key.take().expect("serialize_value before serialize_key");
        self.entries.insert(key, to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Dict(Shared::new(self.entries)))
    }
}

struct SerializeStruct {
    entries: BTreeMap<HashableValue, Value>,
}

impl ser::SerializeStruct for SerializeStruct {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, name: &'static str, value: &T) -> Result<()> {
        self.entries.insert(HashableValue::from(name), to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Dict(Shared::new(self.entries)))
    }
}

struct SerializeStructVariant {
    variant: &'static str,
    entries: BTreeMap<HashableValue, Value>,
}

impl ser::SerializeStructVariant for SerializeStructVariant {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, name: &'static str, value: &T) -> Result<()> {
        self.entries.insert(HashableValue::from(name), to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::dict([(
            HashableValue::from(self.variant),
            Value::Dict(Shared::new(self.entries)),
        )]))
    }
}
