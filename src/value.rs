//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The dynamic tree of host values driven through the interpreters.

use num_bigint::{BigInt, BigUint};

/// A host value, the in-memory form every descriptor serializes from and
/// deserializes to.
///
/// User-defined data types are mapped to and from this tree by the
/// projection closures carried in `conv` wrappers and union cases. The
/// shape of a `Value` must match the descriptor it is interpreted under;
/// presenting a mismatched shape is a programmer error and panics, exactly
/// as using a wrongly-typed value would fail to compile in a statically
/// typed rendition.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// The value of `null`, `empty`, `constant` and `ignore` descriptors.
    Unit,
    /// A boolean.
    Bool(bool),
    /// Any fixed-width or range-restricted integer.
    Int(i64),
    /// A binary64 float.
    Float(f64),
    /// An arbitrary-precision signed integer.
    Z(BigInt),
    /// An arbitrary-precision non-negative integer.
    N(BigUint),
    /// A UTF-8 string.
    String(String),
    /// A raw byte sequence.
    Bytes(Vec<u8>),
    /// The elements of an array or list.
    Seq(Vec<Value>),
    /// The components of an object or tuple composition.
    Tuple(Vec<Value>),
    /// An optional field value.
    Option(Option<Box<Value>>),
}

macro_rules! accessor {
    ($(#[$doc:meta])* $meth:ident, $variant:ident ( $t:ty ), $what:expr) => {
        $(#[$doc])*
        ///
        /// # Panics
        ///
        /// Panics if the value has a different shape.
        pub fn $meth(&self) -> &$t {
            match *self {
                Value::$variant(ref v) => v,
                ref other => panic!(
                    "value does not match encoding: expected {}, got {:?}",
                    $what, other),
            }
        }
    }
}

impl Value {
    /// Convenience constructor for a present optional value.
    pub fn some(v: Value) -> Self {
        Value::Option(Some(Box::new(v)))
    }

    /// Convenience constructor for an absent optional value.
    pub fn none() -> Self {
        Value::Option(None)
    }

    accessor! {
        /// Borrows this value as a boolean.
        to_bool, Bool(bool), "a boolean"
    }
    accessor! {
        /// Borrows this value as a fixed-width integer.
        to_int, Int(i64), "an integer"
    }
    accessor! {
        /// Borrows this value as a float.
        to_float, Float(f64), "a float"
    }
    accessor! {
        /// Borrows this value as an arbitrary-precision signed integer.
        to_z, Z(BigInt), "an arbitrary-precision integer"
    }
    accessor! {
        /// Borrows this value as a string.
        to_str, String(String), "a string"
    }
    accessor! {
        /// Borrows this value as a byte sequence.
        to_bytes, Bytes(Vec<u8>), "a byte sequence"
    }
    accessor! {
        /// Borrows this value as a sequence of elements.
        to_seq, Seq(Vec<Value>), "a sequence"
    }
    accessor! {
        /// Borrows this value as a product of components.
        to_tuple, Tuple(Vec<Value>), "a tuple"
    }

    /// Borrows this value as an optional value.
    ///
    /// # Panics
    ///
    /// Panics if the value has a different shape.
    pub fn to_option(&self) -> Option<&Value> {
        match *self {
            Value::Option(ref o) => o.as_ref().map(|b| &**b),
            ref other => panic!(
                "value does not match encoding: expected an option, got {:?}",
                other),
        }
    }

    /// Checks that this value is `Unit`.
    ///
    /// # Panics
    ///
    /// Panics if the value has a different shape.
    pub fn to_unit(&self) {
        match *self {
            Value::Unit => (),
            ref other => panic!(
                "value does not match encoding: expected unit, got {:?}",
                other),
        }
    }
}

#[cfg(test)]
mod test {
    use num_bigint::BigInt;

    use super::*;

    #[test]
    fn accessors_return_the_payload() {
        assert_eq!(&true, Value::Bool(true).to_bool());
        assert_eq!(&42, Value::Int(42).to_int());
        assert_eq!(&BigInt::from(-7), Value::Z(BigInt::from(-7)).to_z());
        assert_eq!("hi", &Value::String("hi".to_string()).to_str()[..]);
        assert_eq!(Some(&Value::Int(1)),
                   Value::some(Value::Int(1)).to_option());
        assert_eq!(None, Value::none().to_option());
        Value::Unit.to_unit();
    }

    #[test]
    #[should_panic(expected = "expected an integer")]
    fn accessors_panic_on_shape_mismatch() {
        Value::Bool(false).to_int();
    }
}
