// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Tests for the pickle writer.  Expected byte strings were checked against
//! CPython's `pickle.loads`/`pickle.dumps` (protocol 2).


use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, TimeDelta};
use quickcheck::quickcheck;
use rust_decimal::Decimal;
use serde_derive::Serialize;

use crate::consts::*;
use crate::{
    Error, ErrorCode, HashableValue, ObjectRef, PicklerRegistry, Record, Saver, SerOptions,
    Shared, Value, to_value, value_to_vec,
};

fn dumps(value: &Value) -> Vec<u8> {
    value_to_vec(value, SerOptions::new()).unwrap()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Walk a stream we produced and return the opcodes in order, skipping each
/// opcode's payload.  Panics on anything malformed, so the property tests
/// double as a structural check.
fn opcodes(stream: &[u8]) -> Vec<u8> {
    assert_eq!(&stream[..2], &[PROTO, 2], "missing protocol header");
    let mut ops = Vec::new();
    let mut i = 2;
    while i < stream.len() {
        let op = stream[i];
        ops.push(op);
        i += 1;
        match op {
            BININT1 | BINPUT | BINGET => i += 1,
            BININT2 => i += 2,
            BININT | LONG_BINPUT | LONG_BINGET => i += 4,
            BINFLOAT => i += 8,
            BINUNICODE => {
                let len = u32::from_le_bytes(stream[i..i + 4].try_into().unwrap()) as usize;
                i += 4 + len;
            }
            SHORT_BINSTRING => {
                let len = stream[i] as usize;
                i += 1 + len;
            }
            INT => {
                while stream[i] != b'\n' {
                    i += 1;
                }
                i += 1;
            }
            GLOBAL => {
                for _ in 0..2 {
                    while stream[i] != b'\n' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            MARK | STOP | NONE | APPENDS | EMPTY_DICT | EMPTY_LIST | SETITEMS | TUPLE
            | EMPTY_TUPLE | REDUCE | TUPLE1 | TUPLE2 | TUPLE3 | NEWTRUE | NEWFALSE => {}
            other => panic!("unexpected opcode {other:#x} at offset {}", i - 1),
        }
    }
    assert_eq!(ops.last(), Some(&STOP), "missing STOP trailer");
    ops
}

// Scalars

#[test]
fn none_value() {
    assert_eq!(dumps(&Value::None), [PROTO, 2, NONE, STOP]);
}

#[test]
fn booleans() {
    assert_eq!(dumps(&Value::Bool(true)), [PROTO, 2, NEWTRUE, STOP]);
    assert_eq!(dumps(&Value::Bool(false)), [PROTO, 2, NEWFALSE, STOP]);
}

#[test]
fn one_byte_ints() {
    assert_eq!(dumps(&Value::I64(0)), [PROTO, 2, BININT1, 0, STOP]);
    assert_eq!(dumps(&Value::I64(127)), [PROTO, 2, BININT1, 127, STOP]);
    assert_eq!(dumps(&Value::I64(255)), [PROTO, 2, BININT1, 255, STOP]);
}

#[test]
fn two_byte_ints() {
    assert_eq!(dumps(&Value::I64(256)), [PROTO, 2, BININT2, 0, 1, STOP]);
    assert_eq!(dumps(&Value::I64(65535)), [PROTO, 2, BININT2, 255, 255, STOP]);
}

#[test]
fn four_byte_ints() {
    assert_eq!(
        dumps(&Value::I64(65536)),
        [PROTO, 2, BININT, 0, 0, 1, 0, STOP]
    );
    assert_eq!(
        dumps(&Value::I64(-1)),
        [PROTO, 2, BININT, 255, 255, 255, 255, STOP]
    );
    assert_eq!(
        dumps(&Value::I64(i32::MAX as i64)),
        [PROTO, 2, BININT, 255, 255, 255, 127, STOP]
    );
}

#[test]
fn text_ints_beyond_i32() {
    let mut expected = vec![PROTO, 2, INT];
    expected.extend_from_slice(b"2147483648\n");
    expected.push(STOP);
    assert_eq!(dumps(&Value::I64(1 << 31)), expected);

    let mut expected = vec![PROTO, 2, INT];
    expected.extend_from_slice(b"-1099511627776\n");
    expected.push(STOP);
    assert_eq!(dumps(&Value::I64(-(1 << 40))), expected);
}

#[test]
fn u64_above_signed_range() {
    let mut expected = vec![PROTO, 2, INT];
    expected.extend_from_slice(b"18446744073709551615\n");
    expected.push(STOP);
    assert_eq!(dumps(&Value::from(u64::MAX)), expected);
}

#[test]
fn small_bigint_narrows() {
    use num_bigint::BigInt;
    assert_eq!(
        dumps(&Value::Int(BigInt::from(7))),
        [PROTO, 2, BININT1, 7, STOP]
    );
}

#[test]
fn floats() {
    assert_eq!(
        dumps(&Value::F64(1.5)),
        [PROTO, 2, BINFLOAT, 0x3F, 0xF8, 0, 0, 0, 0, 0, 0, STOP]
    );
}

quickcheck! {
    fn ints_take_the_narrowest_opcode(v: i64) -> bool {
        let out = dumps(&Value::I64(v));
        let op = out[2];
        match v {
            0..=255 => op == BININT1,
            256..=65535 => op == BININT2,
            _ if i32::try_from(v).is_ok() => op == BININT,
            _ => op == INT,
        }
    }
}

// Strings and bytes

#[test]
fn short_string() {
    assert_eq!(
        dumps(&Value::from("AB")),
        [PROTO, 2, BINUNICODE, 2, 0, 0, 0, b'A', b'B', BINPUT, 0, STOP]
    );
}

#[test]
fn char_writes_as_one_codepoint_string() {
    assert_eq!(
        dumps(&Value::Char('A')),
        [PROTO, 2, BINUNICODE, 1, 0, 0, 0, b'A', BINPUT, 0, STOP]
    );
}

#[test]
fn char_and_equal_string_share_a_slot() {
    let value = Value::list(vec![Value::Char('A'), Value::from("A")]);
    assert_eq!(
        dumps(&value),
        [
            PROTO, 2, EMPTY_LIST, BINPUT, 0, MARK, BINUNICODE, 1, 0, 0, 0, b'A', BINPUT, 1,
            BINGET, 1, APPENDS, STOP
        ]
    );
}

#[test]
fn bytes_reconstruct_through_latin1_bytearray() {
    let mut expected = vec![PROTO, 2, GLOBAL];
    expected.extend_from_slice(b"__builtin__\nbytearray\n");
    // 0x00 and 0xFF widened to codepoints, then UTF-8 encoded.
    expected.extend_from_slice(&[BINUNICODE, 3, 0, 0, 0, 0x00, 0xC3, 0xBF, BINPUT, 0]);
    expected.extend_from_slice(&[BINUNICODE, 7, 0, 0, 0]);
    expected.extend_from_slice(b"latin-1");
    expected.extend_from_slice(&[BINPUT, 1, TUPLE2, REDUCE, BINPUT, 2, STOP]);
    assert_eq!(dumps(&Value::from(vec![0u8, 0xFF])), expected);
}

// Containers

#[test]
fn flat_list() {
    let value = Value::list(vec![Value::I64(1), Value::I64(2), Value::I64(3)]);
    assert_eq!(
        dumps(&value),
        [
            PROTO, 2, EMPTY_LIST, BINPUT, 0, MARK, BININT1, 1, BININT1, 2, BININT1, 3, APPENDS,
            STOP
        ]
    );
}

#[test]
fn empty_list() {
    assert_eq!(
        dumps(&Value::list(vec![])),
        [PROTO, 2, EMPTY_LIST, BINPUT, 0, MARK, APPENDS, STOP]
    );
}

#[test]
fn tuples_by_length() {
    assert_eq!(
        dumps(&Value::tuple(vec![])),
        [PROTO, 2, EMPTY_TUPLE, BINPUT, 0, STOP]
    );
    assert_eq!(
        dumps(&Value::tuple(vec![Value::I64(1)])),
        [PROTO, 2, BININT1, 1, TUPLE1, BINPUT, 0, STOP]
    );
    assert_eq!(
        dumps(&Value::tuple(vec![Value::I64(1), Value::I64(2)])),
        [PROTO, 2, BININT1, 1, BININT1, 2, TUPLE2, BINPUT, 0, STOP]
    );
    assert_eq!(
        dumps(&Value::tuple(vec![
            Value::I64(1),
            Value::I64(2),
            Value::I64(3)
        ])),
        [PROTO, 2, BININT1, 1, BININT1, 2, BININT1, 3, TUPLE3, BINPUT, 0, STOP]
    );
    assert_eq!(
        dumps(&Value::tuple(vec![
            Value::I64(1),
            Value::I64(2),
            Value::I64(3),
            Value::I64(4)
        ])),
        [
            PROTO, 2, MARK, BININT1, 1, BININT1, 2, BININT1, 3, BININT1, 4, TUPLE, BINPUT, 0,
            STOP
        ]
    );
}

#[test]
fn dict() {
    let value = Value::dict([(HashableValue::from("a"), Value::I64(1))]);
    assert_eq!(
        dumps(&value),
        [
            PROTO, 2, EMPTY_DICT, BINPUT, 0, MARK, BINUNICODE, 1, 0, 0, 0, b'a', BINPUT, 1,
            BININT1, 1, SETITEMS, STOP
        ]
    );
}

#[test]
fn set_reconstructs_through_builtin_set() {
    let value = Value::set([HashableValue::I64(1), HashableValue::I64(2)]);
    let mut expected = vec![PROTO, 2, GLOBAL];
    expected.extend_from_slice(b"__builtin__\nset\n");
    expected.extend_from_slice(&[
        EMPTY_LIST, MARK, BININT1, 1, BININT1, 2, APPENDS, TUPLE1, REDUCE, BINPUT, 0, STOP,
    ]);
    assert_eq!(dumps(&value), expected);
}

#[test]
fn frozenset_reconstructs_through_builtin_frozenset() {
    let value = Value::frozen_set([HashableValue::I64(1)]);
    let out = dumps(&value);
    assert!(contains(&out, b"__builtin__\nfrozenset\n"));
    assert_eq!(opcodes(&out).last(), Some(&STOP));
}

#[test]
fn primitive_array() {
    let mut expected = vec![PROTO, 2, GLOBAL];
    expected.extend_from_slice(b"array\narray\n");
    expected.extend_from_slice(&[SHORT_BINSTRING, 1, b'i', EMPTY_LIST, MARK]);
    expected.extend_from_slice(&[BININT1, 1, BININT1, 2, BININT1, 3]);
    expected.extend_from_slice(&[APPENDS, TUPLE2, REDUCE, BINPUT, 0, STOP]);
    assert_eq!(dumps(&Value::from(vec![1i32, 2, 3])), expected);
}

#[test]
fn array_typecodes() {
    use crate::TypedArray;
    let cases: Vec<(TypedArray, u8)> = vec![
        (TypedArray::I8(vec![1]), b'b'),
        (TypedArray::I16(vec![1]), b'h'),
        (TypedArray::U16(vec![1]), b'H'),
        (TypedArray::I32(vec![1]), b'i'),
        (TypedArray::U32(vec![1]), b'I'),
        (TypedArray::I64(vec![1]), b'l'),
        (TypedArray::U64(vec![1]), b'L'),
        (TypedArray::F32(vec![1.0]), b'f'),
        (TypedArray::F64(vec![1.0]), b'd'),
    ];
    for (array, code) in cases {
        assert_eq!(array.typecode(), code);
        let out = dumps(&Value::from(array));
        assert!(contains(&out, &[SHORT_BINSTRING, 1, code]));
    }
}

// Dates, intervals, decimals

#[test]
fn datetime_constructor_call() {
    let dt = NaiveDate::from_ymd_opt(2020, 1, 2)
        .unwrap()
        .and_hms_micro_opt(3, 4, 5, 6000)
        .unwrap();
    let mut expected = vec![PROTO, 2, GLOBAL];
    expected.extend_from_slice(b"datetime\ndatetime\n");
    expected.extend_from_slice(&[
        MARK, BININT2, 0xE4, 0x07, BININT1, 1, BININT1, 2, BININT1, 3, BININT1, 4, BININT1, 5,
        BININT2, 0x70, 0x17, TUPLE, REDUCE, BINPUT, 0, STOP,
    ]);
    assert_eq!(dumps(&Value::DateTime(dt)), expected);
}

#[test]
fn timedelta_constructor_call() {
    let delta =
        TimeDelta::days(2) + TimeDelta::seconds(3661) + TimeDelta::microseconds(500);
    let mut expected = vec![PROTO, 2, GLOBAL];
    expected.extend_from_slice(b"datetime\ntimedelta\n");
    expected.extend_from_slice(&[
        BININT1, 2, BININT2, 0x4D, 0x0E, BININT2, 0xF4, 0x01, TUPLE3, REDUCE, BINPUT, 0, STOP,
    ]);
    assert_eq!(dumps(&Value::TimeDelta(delta)), expected);
}

#[test]
fn decimal_constructor_call() {
    let mut expected = vec![PROTO, 2, GLOBAL];
    expected.extend_from_slice(b"decimal\nDecimal\n");
    expected.extend_from_slice(&[BINUNICODE, 4, 0, 0, 0]);
    expected.extend_from_slice(b"3.14");
    expected.extend_from_slice(&[BINPUT, 0, TUPLE1, REDUCE, BINPUT, 1, STOP]);
    assert_eq!(dumps(&Value::Decimal(Decimal::new(314, 2))), expected);
}

// Memoization

#[test]
fn equal_strings_share_a_slot() {
    let value = Value::list(vec![Value::from("x"), Value::from("x")]);
    assert_eq!(
        dumps(&value),
        [
            PROTO, 2, EMPTY_LIST, BINPUT, 0, MARK, BINUNICODE, 1, 0, 0, 0, b'x', BINPUT, 1,
            BINGET, 1, APPENDS, STOP
        ]
    );
}

#[test]
fn repeated_tuple_fetches_its_slot() {
    let shared = Value::tuple(vec![Value::I64(1), Value::I64(2)]);
    let value = Value::list(vec![shared.clone(), shared]);
    assert_eq!(
        dumps(&value),
        [
            PROTO, 2, EMPTY_LIST, BINPUT, 0, MARK, BININT1, 1, BININT1, 2, TUPLE2, BINPUT, 1,
            BINGET, 1, APPENDS, STOP
        ]
    );
}

#[test]
fn self_containing_list_terminates() {
    let backing = Shared::new(Vec::new());
    let value = Value::List(backing.clone());
    backing.inner_mut().push(Value::List(backing.clone()));
    assert_eq!(
        dumps(&value),
        [PROTO, 2, EMPTY_LIST, BINPUT, 0, MARK, BINGET, 0, APPENDS, STOP]
    );
}

#[test]
fn repeated_bytearrays_share_the_latin1_literal() {
    let bytes = Value::from(vec![7u8]);
    let other = Value::from(vec![9u8]);
    let out = dumps(&Value::list(vec![bytes, other]));
    // "latin-1" is written once; the second bytearray fetches its slot.
    let hits = out
        .windows(b"latin-1".len())
        .filter(|window| *window == b"latin-1")
        .count();
    assert_eq!(hits, 1);
}

#[test]
fn memoization_can_be_disabled() {
    let value = Value::list(vec![Value::from("x"), Value::from("x")]);
    let out = value_to_vec(&value, SerOptions::new().without_memo()).unwrap();
    assert_eq!(
        out,
        [
            PROTO, 2, EMPTY_LIST, MARK, BINUNICODE, 1, 0, 0, 0, b'x', BINUNICODE, 1, 0, 0, 0,
            b'x', APPENDS, STOP
        ]
    );
}

#[test]
fn shallow_nesting_stays_on_one_byte_slots() {
    let mut value = Value::list(vec![Value::I64(1)]);
    for _ in 0..7 {
        value = Value::list(vec![value]);
    }
    let ops = opcodes(&dumps(&value));
    assert!(!ops.contains(&LONG_BINGET));
    assert!(!ops.contains(&LONG_BINPUT));
    assert_eq!(ops.iter().filter(|&&op| op == BINPUT).count(), 8);
}

#[test]
fn slot_256_switches_to_long_binput() {
    let items: Vec<Value> = (0..300).map(|i| Value::from(format!("k{i}"))).collect();
    let ops = opcodes(&dumps(&Value::list(items)));
    // Slots 0..=255 (the list plus 255 strings) store through BINPUT, the
    // remaining 45 strings through LONG_BINPUT.
    assert_eq!(ops.iter().filter(|&&op| op == BINPUT).count(), 256);
    assert_eq!(ops.iter().filter(|&&op| op == LONG_BINPUT).count(), 45);
}

#[test]
fn long_binget_fetches_high_slots() {
    let mut items: Vec<Value> = (0..300).map(|i| Value::from(format!("k{i}"))).collect();
    items.push(Value::from("k299".to_owned()));
    let ops = opcodes(&dumps(&Value::list(items)));
    assert_eq!(ops.iter().filter(|&&op| op == LONG_BINGET).count(), 1);
}

// Recursion bounds

#[test]
fn deep_nesting_within_the_limit() {
    let mut value = Value::I64(0);
    for _ in 0..150 {
        value = Value::list(vec![value]);
    }
    opcodes(&dumps(&value));
}

#[test]
fn nesting_beyond_the_limit_fails() {
    let mut value = Value::I64(0);
    for _ in 0..250 {
        value = Value::list(vec![value]);
    }
    match value_to_vec(&value, SerOptions::new()) {
        Err(Error::Encoding(ErrorCode::RecursionTooDeep)) => {}
        other => panic!("expected recursion failure, got {other:?}"),
    }
}

// Foreign objects

struct Opaque;

#[test]
fn unregistered_opaque_object_is_rejected() {
    let value = Value::from(ObjectRef::opaque(Opaque));
    match value_to_vec(&value, SerOptions::new()) {
        Err(Error::Encoding(ErrorCode::Unpicklable(name))) => {
            assert!(name.contains("Opaque"));
        }
        other => panic!("expected unpicklable failure, got {other:?}"),
    }
}

struct Wrapped(i64);

#[test]
fn custom_pickler_from_an_explicit_registry() {
    let mut registry = PicklerRegistry::new();
    registry.register::<Wrapped>(Arc::new(|obj: &ObjectRef, saver: &mut dyn Saver| {
        let wrapped = obj.downcast_ref::<Wrapped>().unwrap();
        saver.save(&Value::I64(wrapped.0))
    }));
    let options = SerOptions::new().with_registry(Arc::new(registry));
    let value = Value::from(ObjectRef::opaque(Wrapped(7)));
    assert_eq!(
        value_to_vec(&value, options).unwrap(),
        [PROTO, 2, BININT1, 7, BINPUT, 0, STOP]
    );
}

struct Tagged {
    n: i64,
}

crate::pickle_fields!(Tagged { n });

#[test]
fn registered_pickler_beats_reflection() {
    let mut registry = PicklerRegistry::new();
    registry.register::<Tagged>(Arc::new(|_: &ObjectRef, saver: &mut dyn Saver| {
        saver.save(&Value::from("custom"))
    }));
    let options = SerOptions::new().with_registry(Arc::new(registry));
    let value = Value::from(ObjectRef::new(Tagged { n: 1 }));
    let out = value_to_vec(&value, options).unwrap();
    assert!(contains(&out, b"custom"));
    assert!(!contains(&out, b"__class__"));
}

#[test]
fn exact_registration_supersedes_earlier_one() {
    let mut registry = PicklerRegistry::new();
    registry.register::<Wrapped>(Arc::new(|_: &ObjectRef, saver: &mut dyn Saver| {
        saver.save(&Value::I64(1))
    }));
    registry.register::<Wrapped>(Arc::new(|_: &ObjectRef, saver: &mut dyn Saver| {
        saver.save(&Value::I64(2))
    }));
    let options = SerOptions::new().with_registry(Arc::new(registry));
    let value = Value::from(ObjectRef::opaque(Wrapped(0)));
    assert_eq!(
        value_to_vec(&value, options).unwrap(),
        [PROTO, 2, BININT1, 2, BINPUT, 0, STOP]
    );
}

struct MarkA;
struct MarkB;

#[test]
fn matchers_walk_in_registration_order() {
    let mut registry = PicklerRegistry::new();
    registry.register_matcher(
        |obj: &ObjectRef| {
            obj.downcast_ref::<MarkA>().is_some() || obj.downcast_ref::<MarkB>().is_some()
        },
        Arc::new(|_: &ObjectRef, saver: &mut dyn Saver| saver.save(&Value::I64(1))),
    );
    registry.register_matcher(
        |obj: &ObjectRef| obj.downcast_ref::<MarkB>().is_some(),
        Arc::new(|_: &ObjectRef, saver: &mut dyn Saver| saver.save(&Value::I64(2))),
    );
    let options = SerOptions::new().with_registry(Arc::new(registry));
    // Both matchers accept MarkB; the first registered one wins.
    let value = Value::from(ObjectRef::opaque(MarkB));
    assert_eq!(
        value_to_vec(&value, options.clone()).unwrap(),
        [PROTO, 2, BININT1, 1, BINPUT, 0, STOP]
    );
    let value = Value::from(ObjectRef::opaque(MarkA));
    assert_eq!(
        value_to_vec(&value, options).unwrap(),
        [PROTO, 2, BININT1, 1, BINPUT, 0, STOP]
    );
}

struct GlobalThing(i64);

#[test]
fn process_wide_registry_is_consulted_by_default() {
    crate::register::<GlobalThing>(Arc::new(|obj: &ObjectRef, saver: &mut dyn Saver| {
        let thing = obj.downcast_ref::<GlobalThing>().unwrap();
        saver.save(&Value::I64(thing.0))
    }));
    let value = Value::from(ObjectRef::opaque(GlobalThing(9)));
    assert_eq!(dumps(&value), [PROTO, 2, BININT1, 9, BINPUT, 0, STOP]);
}

#[test]
fn repeated_custom_object_fetches_its_slot() {
    let mut registry = PicklerRegistry::new();
    registry.register::<Wrapped>(Arc::new(|obj: &ObjectRef, saver: &mut dyn Saver| {
        let wrapped = obj.downcast_ref::<Wrapped>().unwrap();
        saver.save(&Value::I64(wrapped.0))
    }));
    let options = SerOptions::new().with_registry(Arc::new(registry));
    let object = Value::from(ObjectRef::opaque(Wrapped(5)));
    let value = Value::list(vec![object.clone(), object]);
    assert_eq!(
        value_to_vec(&value, options).unwrap(),
        [
            PROTO, 2, EMPTY_LIST, BINPUT, 0, MARK, BININT1, 5, BINPUT, 1, BINGET, 1, APPENDS,
            STOP
        ]
    );
}

// Record reflection

struct Sensor {
    id: i64,
    temperature: f64,
}

crate::pickle_contract!(Sensor as "telemetry.Sensor" {
    "sensorId" => id,
    "reading" => temperature,
});

#[test]
fn contract_records_use_wire_names_and_class_override() {
    let value = Value::from(ObjectRef::new(Sensor {
        id: 3,
        temperature: 21.5,
    }));
    let out = dumps(&value);
    assert!(contains(&out, b"__class__"));
    assert!(contains(&out, b"telemetry.Sensor"));
    assert!(contains(&out, b"sensorId"));
    assert!(contains(&out, b"reading"));
    assert!(!contains(&out, b"temperature"));
    let ops = opcodes(&out);
    assert_eq!(ops[0], EMPTY_DICT);
    assert_eq!(ops[ops.len() - 2], SETITEMS);
}

struct Config {
    retries: i64,
    verbose: bool,
}

crate::pickle_fields!(Config { retries, verbose });

#[test]
fn field_records_use_declared_names_and_type_name() {
    let value = Value::from(ObjectRef::new(Config {
        retries: 2,
        verbose: false,
    }));
    let out = dumps(&value);
    assert!(contains(&out, b"__class__"));
    assert!(contains(&out, b"Config"));
    assert!(contains(&out, b"retries"));
    assert!(contains(&out, b"verbose"));
}

struct Gauge(f64);

impl Gauge {
    fn level(&self) -> f64 {
        self.0
    }
}

crate::pickle_accessors!(Gauge { level });

#[test]
fn accessor_records_read_through_methods() {
    let out = dumps(&Value::from(ObjectRef::new(Gauge(0.5))));
    assert!(contains(&out, b"level"));
    assert!(contains(&out, b"__class__"));
}

struct Anonymous {
    n: i64,
}

impl Record for Anonymous {
    fn class_name(&self) -> Option<Cow<'static, str>> {
        None
    }

    fn fields(&self) -> crate::Result<Vec<(Cow<'static, str>, Value)>> {
        Ok(vec![(Cow::Borrowed("n"), Value::I64(self.n))])
    }
}

#[test]
fn anonymous_records_omit_the_class_entry() {
    let out = dumps(&Value::from(ObjectRef::new(Anonymous { n: 4 })));
    assert!(!contains(&out, b"__class__"));
    assert_eq!(
        out,
        [
            PROTO, 2, EMPTY_DICT, BINPUT, 0, MARK, BINUNICODE, 1, 0, 0, 0, b'n', BINPUT, 1,
            BININT1, 4, SETITEMS, STOP
        ]
    );
}

struct Broken;

impl Record for Broken {
    fn class_name(&self) -> Option<Cow<'static, str>> {
        Some(Cow::Borrowed("Broken"))
    }

    fn fields(&self) -> crate::Result<Vec<(Cow<'static, str>, Value)>> {
        Err(Error::FieldRead {
            field: "payload".to_owned(),
            source: "backing store gone".into(),
        })
    }
}

#[test]
fn failing_field_reads_surface_with_their_cause() {
    match value_to_vec(&Value::from(ObjectRef::new(Broken)), SerOptions::new()) {
        Err(Error::FieldRead { field, .. }) => assert_eq!(field, "payload"),
        other => panic!("expected field read failure, got {other:?}"),
    }
}

#[test]
fn repeated_record_fetches_its_slot() {
    let object = Value::from(ObjectRef::new(Anonymous { n: 1 }));
    let value = Value::list(vec![object.clone(), object]);
    let ops = opcodes(&dumps(&value));
    assert_eq!(ops.iter().filter(|&&op| op == EMPTY_DICT).count(), 1);
    assert_eq!(ops.iter().filter(|&&op| op == BINGET).count(), 1);
}

// Serde front door

#[derive(Serialize)]
struct Point {
    x: i64,
    y: i64,
}

#[test]
fn serde_structs_become_class_tagged_dicts() {
    let value = to_value(&Point { x: 1, y: 2 }).unwrap();
    let expected = Value::dict([
        (HashableValue::from("__class__"), Value::from("Point")),
        (HashableValue::from("x"), Value::I64(1)),
        (HashableValue::from("y"), Value::I64(2)),
    ]);
    assert_eq!(value, expected);
}

#[derive(Serialize)]
#[serde(rename = "geo.Point")]
struct RenamedPoint {
    x: i64,
}

#[test]
fn serde_rename_overrides_the_class_tag() {
    let value = to_value(&RenamedPoint { x: 0 }).unwrap();
    let out = dumps(&value);
    assert!(contains(&out, b"geo.Point"));
    assert!(!contains(&out, b"RenamedPoint"));
}

#[derive(Serialize)]
enum Color {
    Red,
    Green,
}

#[test]
fn serde_unit_variants_become_their_label() {
    assert_eq!(to_value(&Color::Red).unwrap(), Value::from("Red"));
    assert_eq!(to_value(&Color::Green).unwrap(), Value::from("Green"));
}

#[derive(Serialize)]
enum Shape {
    Circle(f64),
}

#[test]
fn serde_newtype_variants_become_singleton_dicts() {
    let value = to_value(&Shape::Circle(2.0)).unwrap();
    let expected = Value::dict([(HashableValue::from("Circle"), Value::F64(2.0))]);
    assert_eq!(value, expected);
}

#[test]
fn serde_scalars_and_containers() {
    assert_eq!(to_value(&true).unwrap(), Value::Bool(true));
    assert_eq!(to_value(&'x').unwrap(), Value::Char('x'));
    assert_eq!(to_value(&None::<i64>).unwrap(), Value::None);
    assert_eq!(to_value(&Some(5i64)).unwrap(), Value::I64(5));
    assert_eq!(
        to_value(&u64::MAX).unwrap(),
        Value::Int(num_bigint::BigInt::from(u64::MAX))
    );
    assert_eq!(
        to_value(&vec![1i64, 2]).unwrap(),
        Value::list(vec![Value::I64(1), Value::I64(2)])
    );

    let mut map = BTreeMap::new();
    map.insert("k".to_owned(), 1i64);
    assert_eq!(
        to_value(&map).unwrap(),
        Value::dict([(HashableValue::from("k"), Value::I64(1))])
    );
}

#[test]
fn serde_tuples_write_as_tuples() {
    let out = crate::to_vec(&(1i64, "a"), SerOptions::new()).unwrap();
    assert_eq!(
        out,
        [
            PROTO, 2, BININT1, 1, BINUNICODE, 1, 0, 0, 0, b'a', BINPUT, 0, TUPLE2, BINPUT, 1,
            STOP
        ]
    );
}

// Display

#[test]
fn python_flavoured_display() {
    let value = Value::list(vec![Value::I64(1), Value::from("a"), Value::None]);
    assert_eq!(value.to_string(), "[1, \"a\", None]");
    assert_eq!(Value::Bool(true).to_string(), "True");
    assert_eq!(
        Value::from(crate::TypedArray::I32(vec![1, 2])).to_string(),
        "array('i', [1, 2])"
    );
}

// Properties

quickcheck! {
    fn streams_are_framed_and_walkable(v: Value) -> bool {
        let out = dumps(&v);
        let ops = opcodes(&out);
        out.starts_with(&[PROTO, 2]) && ops.last() == Some(&STOP)
    }

    fn hashable_streams_are_framed(v: HashableValue) -> bool {
        let out = dumps(&v.into_value());
        out.starts_with(&[PROTO, 2]) && out.ends_with(&[STOP])
    }
}
