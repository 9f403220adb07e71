//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The failure taxonomy shared by the interpreters.
//!
//! Both error enums are themselves describable: `read_error_encoding()` and
//! `write_error_encoding()` return descriptors under which an error value
//! (via `to_value`/`from_value`) serializes like any other datum, so a
//! protocol can ship its own failures over the wire it already speaks.

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use encoding::{case, empty, float, int31, obj1, obj2, obj3, req, union, z,
               Case, CaseTag, Encoding};
use size::TagSize;
use value::Value;

quick_error! {
    /// Errors produced while parsing bytes back into a value.
    #[derive(Debug, Clone, PartialEq)]
    pub enum ReadError {
        /// The current read context holds fewer bytes than the next atom
        /// needs.
        NotEnoughData {
            description("not enough data")
            display("not enough bytes remaining in the read context")
        }
        /// A delimited context was not fully consumed.
        ExtraBytes {
            description("extra bytes")
            display("input contains bytes beyond the decoded value")
        }
        /// No union case accepted the input.
        NoCaseMatched {
            description("no case matched")
            display("no case accepted the input")
        }
        /// A union tag or enumeration index without a matching case.
        UnexpectedTag(tag: u32) {
            description("unexpected tag")
            display("tag {} does not select any case", tag)
        }
        /// A length prefix holding an unusable size.
        InvalidSize(size: i64) {
            description("invalid size")
            display("invalid length prefix {}", size)
        }
        /// An integer outside the range its descriptor allows.
        InvalidInt(minimum: i64, value: i64, maximum: i64) {
            description("invalid integer")
            display("integer {} outside the range [{}, {}]",
                    value, minimum, maximum)
        }
        /// A float outside the range its descriptor allows.
        InvalidFloat(minimum: f64, value: f64, maximum: f64) {
            description("invalid float")
            display("float {} outside the range [{}, {}]",
                    value, minimum, maximum)
        }
        /// An arbitrary-precision integer padded with a redundant final
        /// continuation group.
        TrailingZero {
            description("trailing zero")
            display("non-canonical arbitrary-precision integer")
        }
        /// A value longer than its `check_size` bound.
        SizeLimitExceeded {
            description("size limit exceeded")
            display("decoded value exceeds the configured size limit")
        }
        /// A list with more elements than its declared maximum.
        ListTooLong {
            description("list too long")
            display("list exceeds its maximum length")
        }
        /// An array with more elements than its declared maximum.
        ArrayTooLong {
            description("array too long")
            display("array exceeds its maximum length")
        }
        /// A string payload which is not valid UTF-8.
        InvalidUtf8 {
            description("invalid UTF-8")
            display("string payload is not valid UTF-8")
        }
    }
}

quick_error! {
    /// Errors produced while measuring or serializing a value.
    #[derive(Debug, Clone, PartialEq)]
    pub enum WriteError {
        /// The serialized form would exceed a `check_size` bound.
        SizeLimitExceeded {
            description("size limit exceeded")
            display("serialized value exceeds the configured size limit")
        }
        /// No union case accepted the value.
        NoCaseMatched {
            description("no case matched")
            display("no case accepted the value")
        }
        /// An integer outside the range its descriptor allows.
        InvalidInt(minimum: i64, value: i64, maximum: i64) {
            description("invalid integer")
            display("integer {} outside the range [{}, {}]",
                    value, minimum, maximum)
        }
        /// A float outside the range its descriptor allows.
        InvalidFloat(minimum: f64, value: f64, maximum: f64) {
            description("invalid float")
            display("float {} outside the range [{}, {}]",
                    value, minimum, maximum)
        }
        /// A byte sequence whose length differs from its fixed descriptor.
        InvalidBytesLength(expected: usize, found: usize) {
            description("invalid bytes length")
            display("byte sequence of {} bytes where exactly {} are required",
                    found, expected)
        }
        /// A string whose length differs from its fixed descriptor.
        InvalidStringLength(expected: usize, found: usize) {
            description("invalid string length")
            display("string of {} bytes where exactly {} are required",
                    found, expected)
        }
        /// A negative value where a natural number is required.
        InvalidNatural {
            description("invalid natural")
            display("negative value where a natural number is required")
        }
        /// A payload too long for its length-prefix width.
        InvalidSize(size: usize) {
            description("invalid size")
            display("payload of {} bytes does not fit the length prefix",
                    size)
        }
        /// A list with more elements than its declared maximum.
        ListTooLong {
            description("list too long")
            display("list exceeds its maximum length")
        }
        /// An array with more elements than its declared maximum.
        ArrayTooLong {
            description("array too long")
            display("array exceeds its maximum length")
        }
    }
}

/// The wire shape of a self-described error: the case name followed by the
/// payload components.
fn tagged(name: &str, payload: Vec<Value>) -> Value {
    let mut items = vec![Value::String(name.to_string())];
    items.extend(payload);
    Value::Tuple(items)
}

fn big(i: i64) -> Value {
    Value::Z(BigInt::from(i))
}

fn err_case(tag: u16, name: &'static str, payload: Encoding, arity: usize)
            -> Case {
    case(
        CaseTag::Tag(tag), Some(name), payload,
        move |v: &Value| {
            let items = v.to_tuple();
            match items.first() {
                Some(&Value::String(ref n)) if n == name => (),
                _ => return None,
            }
            Some(match arity {
                0 => Value::Unit,
                1 => items[1].clone(),
                _ => Value::Tuple(items[1..].to_vec()),
            })
        },
        move |payload: Value| {
            match arity {
                0 => tagged(name, vec![]),
                1 => tagged(name, vec![payload]),
                _ => tagged(name, payload.to_tuple().clone()),
            }
        },
    )
}

fn int_pair(a: &'static str, b: &'static str) -> Encoding {
    obj2(req(a, z()), req(b, z()))
}

fn int_triple() -> Encoding {
    obj3(req("min", z()), req("value", z()), req("max", z()))
}

fn float_triple() -> Encoding {
    obj3(req("min", float()), req("value", float()), req("max", float()))
}

/// A descriptor for `ReadError` values converted with
/// [`ReadError::to_value`].
pub fn read_error_encoding() -> Encoding {
    union(TagSize::Uint8, vec![
        err_case(0, "not_enough_data", empty(), 0),
        err_case(1, "extra_bytes", empty(), 0),
        err_case(2, "no_case_matched", empty(), 0),
        err_case(3, "unexpected_tag", obj1(req("tag", int31())), 1),
        err_case(4, "invalid_size", obj1(req("size", z())), 1),
        err_case(5, "invalid_int", int_triple(), 3),
        err_case(6, "invalid_float", float_triple(), 3),
        err_case(7, "trailing_zero", empty(), 0),
        err_case(8, "size_limit_exceeded", empty(), 0),
        err_case(9, "list_too_long", empty(), 0),
        err_case(10, "array_too_long", empty(), 0),
        err_case(11, "invalid_utf8", empty(), 0),
    ])
}

/// A descriptor for `WriteError` values converted with
/// [`WriteError::to_value`].
pub fn write_error_encoding() -> Encoding {
    union(TagSize::Uint8, vec![
        err_case(0, "size_limit_exceeded", empty(), 0),
        err_case(1, "no_case_matched", empty(), 0),
        err_case(2, "invalid_int", int_triple(), 3),
        err_case(3, "invalid_float", float_triple(), 3),
        err_case(4, "invalid_bytes_length", int_pair("expected", "found"), 2),
        err_case(5, "invalid_string_length", int_pair("expected", "found"), 2),
        err_case(6, "invalid_natural", empty(), 0),
        err_case(7, "invalid_size", obj1(req("size", z())), 1),
        err_case(8, "list_too_long", empty(), 0),
        err_case(9, "array_too_long", empty(), 0),
    ])
}

impl ReadError {
    /// Converts this error to the value shape of
    /// [`read_error_encoding`].
    pub fn to_value(&self) -> Value {
        match *self {
            ReadError::NotEnoughData => tagged("not_enough_data", vec![]),
            ReadError::ExtraBytes => tagged("extra_bytes", vec![]),
            ReadError::NoCaseMatched => tagged("no_case_matched", vec![]),
            ReadError::UnexpectedTag(tag) =>
                tagged("unexpected_tag", vec![Value::Int(tag as i64)]),
            ReadError::InvalidSize(size) =>
                tagged("invalid_size", vec![big(size)]),
            ReadError::InvalidInt(min, v, max) =>
                tagged("invalid_int", vec![big(min), big(v), big(max)]),
            ReadError::InvalidFloat(min, v, max) =>
                tagged("invalid_float",
                       vec![Value::Float(min), Value::Float(v),
                            Value::Float(max)]),
            ReadError::TrailingZero => tagged("trailing_zero", vec![]),
            ReadError::SizeLimitExceeded =>
                tagged("size_limit_exceeded", vec![]),
            ReadError::ListTooLong => tagged("list_too_long", vec![]),
            ReadError::ArrayTooLong => tagged("array_too_long", vec![]),
            ReadError::InvalidUtf8 => tagged("invalid_utf8", vec![]),
        }
    }

    /// Inverts [`to_value`](ReadError::to_value).
    ///
    /// Returns `None` if the value does not have the shape produced by
    /// `read_error_encoding()`.
    pub fn from_value(v: &Value) -> Option<ReadError> {
        let items = match *v {
            Value::Tuple(ref items) => items,
            _ => return None,
        };
        let name = match items.first() {
            Some(&Value::String(ref n)) => &n[..],
            _ => return None,
        };

        match (name, &items[1..]) {
            ("not_enough_data", &[]) => Some(ReadError::NotEnoughData),
            ("extra_bytes", &[]) => Some(ReadError::ExtraBytes),
            ("no_case_matched", &[]) => Some(ReadError::NoCaseMatched),
            ("unexpected_tag", &[Value::Int(tag)]) =>
                Some(ReadError::UnexpectedTag(tag as u32)),
            ("invalid_size", &[Value::Z(ref size)]) =>
                size.to_i64().map(ReadError::InvalidSize),
            ("invalid_int",
             &[Value::Z(ref min), Value::Z(ref v), Value::Z(ref max)]) =>
                match (min.to_i64(), v.to_i64(), max.to_i64()) {
                    (Some(min), Some(v), Some(max)) =>
                        Some(ReadError::InvalidInt(min, v, max)),
                    _ => None,
                },
            ("invalid_float",
             &[Value::Float(min), Value::Float(v), Value::Float(max)]) =>
                Some(ReadError::InvalidFloat(min, v, max)),
            ("trailing_zero", &[]) => Some(ReadError::TrailingZero),
            ("size_limit_exceeded", &[]) =>
                Some(ReadError::SizeLimitExceeded),
            ("list_too_long", &[]) => Some(ReadError::ListTooLong),
            ("array_too_long", &[]) => Some(ReadError::ArrayTooLong),
            ("invalid_utf8", &[]) => Some(ReadError::InvalidUtf8),
            _ => None,
        }
    }
}

impl WriteError {
    /// Converts this error to the value shape of
    /// [`write_error_encoding`].
    pub fn to_value(&self) -> Value {
        match *self {
            WriteError::SizeLimitExceeded =>
                tagged("size_limit_exceeded", vec![]),
            WriteError::NoCaseMatched => tagged("no_case_matched", vec![]),
            WriteError::InvalidInt(min, v, max) =>
                tagged("invalid_int", vec![big(min), big(v), big(max)]),
            WriteError::InvalidFloat(min, v, max) =>
                tagged("invalid_float",
                       vec![Value::Float(min), Value::Float(v),
                            Value::Float(max)]),
            WriteError::InvalidBytesLength(expected, found) =>
                tagged("invalid_bytes_length",
                       vec![big(expected as i64), big(found as i64)]),
            WriteError::InvalidStringLength(expected, found) =>
                tagged("invalid_string_length",
                       vec![big(expected as i64), big(found as i64)]),
            WriteError::InvalidNatural => tagged("invalid_natural", vec![]),
            WriteError::InvalidSize(size) =>
                tagged("invalid_size", vec![big(size as i64)]),
            WriteError::ListTooLong => tagged("list_too_long", vec![]),
            WriteError::ArrayTooLong => tagged("array_too_long", vec![]),
        }
    }

    /// Inverts [`to_value`](WriteError::to_value).
    ///
    /// Returns `None` if the value does not have the shape produced by
    /// `write_error_encoding()`.
    pub fn from_value(v: &Value) -> Option<WriteError> {
        let items = match *v {
            Value::Tuple(ref items) => items,
            _ => return None,
        };
        let name = match items.first() {
            Some(&Value::String(ref n)) => &n[..],
            _ => return None,
        };

        fn sizes(a: &BigInt, b: &BigInt) -> Option<(usize, usize)> {
            match (a.to_usize(), b.to_usize()) {
                (Some(a), Some(b)) => Some((a, b)),
                _ => None,
            }
        }

        match (name, &items[1..]) {
            ("size_limit_exceeded", &[]) =>
                Some(WriteError::SizeLimitExceeded),
            ("no_case_matched", &[]) => Some(WriteError::NoCaseMatched),
            ("invalid_int",
             &[Value::Z(ref min), Value::Z(ref v), Value::Z(ref max)]) =>
                match (min.to_i64(), v.to_i64(), max.to_i64()) {
                    (Some(min), Some(v), Some(max)) =>
                        Some(WriteError::InvalidInt(min, v, max)),
                    _ => None,
                },
            ("invalid_float",
             &[Value::Float(min), Value::Float(v), Value::Float(max)]) =>
                Some(WriteError::InvalidFloat(min, v, max)),
            ("invalid_bytes_length", &[Value::Z(ref e), Value::Z(ref f)]) =>
                sizes(e, f).map(|(e, f)| WriteError::InvalidBytesLength(e, f)),
            ("invalid_string_length", &[Value::Z(ref e), Value::Z(ref f)]) =>
                sizes(e, f).map(
                    |(e, f)| WriteError::InvalidStringLength(e, f)),
            ("invalid_natural", &[]) => Some(WriteError::InvalidNatural),
            ("invalid_size", &[Value::Z(ref size)]) =>
                size.to_usize().map(WriteError::InvalidSize),
            ("list_too_long", &[]) => Some(WriteError::ListTooLong),
            ("array_too_long", &[]) => Some(WriteError::ArrayTooLong),
            _ => None,
        }
    }
}
