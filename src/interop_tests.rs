//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Cross-interpreter checks over a zoo of descriptors and inhabitants:
//! the length calculator, the writer, both readers and the classifier
//! must all agree on every one of them.

use num_bigint::{BigInt, BigUint};

use encoding::*;
use error::ReadError;
use kind::{classify, Kind};
use length::length;
use read::of_bytes;
use size::{SizeWidth, TagSize};
use stream::{check_stream, read_stream, Status};
use value::Value;
use write::to_bytes;

fn s(text: &str) -> Value {
    Value::String(text.to_string())
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|&v| Value::Int(v)).collect()
}

fn option_case_none() -> Case {
    case(CaseTag::Tag(0), Some("none"), empty(),
         |v| match *v {
             Value::Option(None) => Some(Value::Unit),
             _ => None,
         },
         |_| Value::none())
}

fn option_case_some(e: Encoding) -> Case {
    case(CaseTag::Tag(1), Some("some"), e,
         |v| match *v {
             Value::Option(Some(ref inner)) => Some((**inner).clone()),
             _ => None,
         },
         |v| Value::some(v))
}

fn int_list() -> Encoding {
    mu("ints", |rec| union(TagSize::Uint8, vec![
        case(CaseTag::Tag(0), Some("nil"), null(),
             |v| match *v {
                 Value::Seq(ref items) if items.is_empty() =>
                     Some(Value::Unit),
                 _ => None,
             },
             |_| Value::Seq(vec![])),
        case(CaseTag::Tag(1), Some("cons"),
             tup2(uint8(), dynamic_size(rec.clone())),
             |v| match *v {
                 Value::Seq(ref items) if !items.is_empty() =>
                     Some(Value::Tuple(vec![
                         items[0].clone(),
                         Value::Seq(items[1..].to_vec()),
                     ])),
                 _ => None,
             },
             |v| {
                 let items = v.to_tuple().clone();
                 let mut seq = vec![items[0].clone()];
                 seq.extend(items[1].to_seq().iter().cloned());
                 Value::Seq(seq)
             }),
    ]))
}

/// Descriptors paired with inhabitants of their value shape.
fn zoo() -> Vec<(Encoding, Vec<Value>)> {
    vec![
        (boolean(), vec![Value::Bool(false), Value::Bool(true)]),
        (int8(), ints(&[-128, -1, 0, 127])),
        (uint8(), ints(&[0, 1, 255])),
        (int16(), ints(&[-32768, -1, 0, 32767])),
        (uint16(), ints(&[0, 255, 65535])),
        (int31(), ints(&[-(1 << 30), -1, 0, (1 << 30) - 1])),
        (int32(), ints(&[i32::MIN as i64, 0, i32::MAX as i64])),
        (int64(), ints(&[i64::MIN, -1, 0, i64::MAX])),
        (ranged_int(-5, 10), ints(&[-5, 0, 10])),
        (ranged_int(100, 400), ints(&[100, 250, 400])),
        (ranged_int(0, 100000), ints(&[0, 99999])),
        (float(), vec![Value::Float(0.0), Value::Float(-2.5),
                       Value::Float(1.0e300)]),
        (ranged_float(-1.0, 1.0), vec![Value::Float(-1.0),
                                       Value::Float(0.25)]),
        (z(), vec![
            Value::Z(BigInt::from(0)),
            Value::Z(BigInt::from(-1)),
            Value::Z(BigInt::from(63)),
            Value::Z(BigInt::from(-300)),
            Value::Z(BigInt::parse_bytes(
                b"123456789123456789123456789", 10).unwrap()),
        ]),
        (n(), vec![
            Value::N(BigUint::from(0u8)),
            Value::N(BigUint::from(127u8)),
            Value::N(BigUint::from(128u8)),
            Value::N(BigUint::parse_bytes(
                b"340282366920938463463374607431768211456", 10).unwrap()),
        ]),
        (fixed_string(3), vec![s("abc")]),
        (string(), vec![s(""), s("hello world")]),
        (fixed_bytes(2), vec![Value::Bytes(vec![0xFF, 0x00])]),
        (bytes(), vec![Value::Bytes(vec![]),
                       Value::Bytes(vec![1, 2, 3])]),
        (variable_string(), vec![s(""), s("tail")]),
        (string_enum(vec![("a", Value::Int(10)), ("b", Value::Int(20)),
                          ("c", Value::Int(30))]),
         ints(&[10, 20, 30])),
        (dynamic_size(list(uint8())), vec![
            Value::Seq(vec![]),
            Value::Seq(ints(&[1, 2, 3])),
        ]),
        (dynamic_size(array(int16())), vec![
            Value::Seq(ints(&[-1, 0, 1])),
        ]),
        (list(uint16()), vec![Value::Seq(ints(&[1, 2]))]),
        (obj2(req("code", uint16()), req("message", string())), vec![
            Value::Tuple(vec![Value::Int(0x0102), s("hi")]),
        ]),
        (obj3(req("a", uint8()), req("b", z()), req("c", string())), vec![
            Value::Tuple(vec![Value::Int(7),
                              Value::Z(BigInt::from(-64)),
                              s("three")]),
        ]),
        (tup5(uint8(), int16(), boolean(), z(), string()), vec![
            Value::Tuple(vec![Value::Int(1), Value::Int(-2),
                              Value::Bool(true),
                              Value::Z(BigInt::from(300)),
                              s("five")]),
        ]),
        (obj1(opt("flag", boolean())), vec![
            Value::none(),
            Value::some(Value::Bool(true)),
        ]),
        (obj1(opt("tail", variable_bytes())), vec![
            Value::none(),
            Value::some(Value::Bytes(vec![1, 2, 3])),
        ]),
        (tup2(variable_string(), uint16()), vec![
            Value::Tuple(vec![s("head"), Value::Int(9)]),
        ]),
        (union(TagSize::Uint8, vec![
            option_case_none(),
            option_case_some(int32()),
        ]), vec![
            Value::none(),
            Value::some(Value::Int(0x11223344)),
        ]),
        (union(TagSize::Uint16, vec![
            option_case_none(),
            option_case_some(string()),
        ]), vec![
            Value::none(),
            Value::some(s("payload")),
        ]),
        (int_list(), vec![
            Value::Seq(vec![]),
            Value::Seq(ints(&[1, 2, 3])),
        ]),
        (padded(uint16(), 3), ints(&[513])),
        (check_size(6, string()), vec![s("ab")]),
        (def("temperature",
             describe(Some("a temperature"), Some("in millikelvin"),
                      ranged_int(0, 1000000))),
         ints(&[0, 293150])),
        (splitted(uint8(), string()), ints(&[42])),
        (delayed(|| tup2(uint8(), uint8())), vec![
            Value::Tuple(vec![Value::Int(3), Value::Int(4)]),
        ]),
        (dynamic_size_with(SizeWidth::Uint8, variable_bytes()),
         vec![Value::Bytes(vec![]), Value::Bytes(vec![9; 255])]),
        (dynamic_size_with(SizeWidth::Uint16, variable_string()),
         vec![s("sixteen")]),
    ]
}

fn drive_chunked(e: &Encoding, bytes: &[u8], chunk_size: usize)
                 -> (Value, u64) {
    let mut status = read_stream(e, vec![]);
    let mut chunks = bytes.chunks(chunk_size);
    loop {
        match status {
            Status::Success { value, consumed, .. } =>
                return (value, consumed),
            Status::Await(pending) => {
                let chunk = chunks.next().expect("starved the reader")
                    .to_vec();
                status = pending.feed(chunk);
            },
            Status::Error(e) => panic!("stream error: {:?}", e),
        }
    }
}

#[test]
fn lengths_agree_with_serialized_forms() {
    for (e, values) in zoo() {
        for v in &values {
            let bytes = to_bytes(&e, v)
                .unwrap_or_else(|err| panic!("write {:?} / {:?}: {:?}",
                                             e, v, err));
            assert_eq!(length(&e, v).unwrap(), bytes.len(),
                       "length disagrees for {:?} / {:?}", e, v);
            if let Kind::Fixed(n) = classify(&e) {
                assert_eq!(n, bytes.len(),
                           "fixed length disagrees for {:?}", e);
            }
        }
    }
}

#[test]
fn every_value_round_trips() {
    for (e, values) in zoo() {
        for v in &values {
            let bytes = to_bytes(&e, v).unwrap();
            let back = of_bytes(&e, &bytes)
                .unwrap_or_else(|err| panic!("read {:?} / {:?}: {:?}",
                                             e, v, err));
            assert_eq!(*v, back, "round trip failed for {:?}", e);
        }
    }
}

#[test]
fn trailing_garbage_is_rejected() {
    for (e, values) in zoo() {
        if classify(&e).is_variable() {
            // A variable descriptor consumes its whole context, trailing
            // garbage included, so the property does not apply.
            continue;
        }
        for v in &values {
            let mut bytes = to_bytes(&e, v).unwrap();
            bytes.push(0);
            assert_eq!(Err(ReadError::ExtraBytes), of_bytes(&e, &bytes),
                       "garbage accepted for {:?} / {:?}", e, v);
        }
    }
}

#[test]
fn every_chunking_agrees_with_the_one_shot_reader() {
    for (e, values) in zoo() {
        if classify(&e).is_variable() {
            continue;
        }
        for v in &values {
            let bytes = to_bytes(&e, v).unwrap();
            for chunk_size in 1..bytes.len() + 1 {
                let (value, consumed) =
                    drive_chunked(&e, &bytes, chunk_size);
                assert_eq!(*v, value,
                           "chunked read disagrees for {:?}", e);
                assert_eq!(bytes.len() as u64, consumed);
            }
        }
    }
}

#[test]
fn structure_checking_accepts_every_form() {
    for (e, values) in zoo() {
        if classify(&e).is_variable() {
            continue;
        }
        for v in &values {
            let bytes = to_bytes(&e, v).unwrap();
            match check_stream(&e, vec![bytes]) {
                Status::Success { value, .. } =>
                    assert_eq!(Value::Unit, value),
                other => panic!("check failed for {:?}: {:?}", e, other),
            }
        }
    }
}
