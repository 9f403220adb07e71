//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Exact serialized lengths, computed without serializing.

use num_bigint::BigUint;

use encoding::{BytesKind, Encoding, Field};
use error::WriteError;
use kind::{classify, Kind};
use value::Value;
use wire;

/// Borrows the two halves of a pair value.
pub(crate) fn pair_of_value(v: &Value) -> (&Value, &Value) {
    let items = v.to_tuple();
    if items.len() != 2 {
        panic!("value does not match encoding: expected a pair of values, \
                got a tuple of {}", items.len());
    }
    (&items[0], &items[1])
}

/// Obtains the natural number a value denotes. A signed value is accepted
/// when it is non-negative.
pub(crate) fn natural_of_value(v: &Value) -> Result<BigUint, WriteError> {
    match *v {
        Value::N(ref n) => Ok(n.clone()),
        Value::Z(ref z) => z.to_biguint().ok_or(WriteError::InvalidNatural),
        ref other => panic!(
            "value does not match encoding: expected a natural number, \
             got {:?}", other),
    }
}

fn seq_length(array: bool, max_length: Option<usize>, elem: &Encoding,
              v: &Value) -> Result<usize, WriteError> {
    let items = v.to_seq();
    if let Some(max) = max_length {
        if items.len() > max {
            return Err(if array {
                WriteError::ArrayTooLong
            } else {
                WriteError::ListTooLong
            });
        }
    }

    let mut total = 0;
    for item in items {
        total += length(elem, item)?;
    }
    Ok(total)
}

/// Computes the exact number of bytes `write` would emit for `v` under
/// `e`.
///
/// A fixed-kind descriptor answers from its classification alone, without
/// inspecting the value.
pub fn length(e: &Encoding, v: &Value) -> Result<usize, WriteError> {
    if let Kind::Fixed(n) = classify(e) {
        return Ok(n);
    }

    match *e {
        Encoding::Ignore => Ok(0),
        Encoding::Z => Ok(wire::z_length(v.to_z())),
        Encoding::N => Ok(wire::n_length(&natural_of_value(v)?)),
        Encoding::String(BytesKind::Variable) => Ok(v.to_str().len()),
        Encoding::Bytes(BytesKind::Variable) => Ok(v.to_bytes().len()),
        Encoding::Array { max_length, ref elem } =>
            seq_length(true, max_length, elem, v),
        Encoding::List { max_length, ref elem } =>
            seq_length(false, max_length, elem, v),
        Encoding::Obj(ref field) => match *field {
            Field::Req { ref encoding, .. }
            | Field::Dft { ref encoding, .. } => length(encoding, v),
            Field::Opt { kind: Kind::Variable, ref encoding, .. } =>
                match v.to_option() {
                    None => Ok(0),
                    Some(inner) => length(encoding, inner),
                },
            Field::Opt { ref encoding, .. } => match v.to_option() {
                None => Ok(1),
                Some(inner) => Ok(1 + length(encoding, inner)?),
            },
        },
        Encoding::Objs { ref left, ref right, .. }
        | Encoding::Tups { ref left, ref right, .. } => {
            let (lv, rv) = pair_of_value(v);
            Ok(length(left, lv)? + length(right, rv)?)
        },
        Encoding::Tup(ref inner) => length(inner, v),
        Encoding::Union { tag_size, ref cases, .. } => {
            for case in cases.iter() {
                if let ::encoding::CaseTag::TextOnly = case.tag {
                    continue;
                }
                if let Some(payload) = (case.project)(v) {
                    return Ok(tag_size.bytes() +
                              length(&case.encoding, &payload)?);
                }
            }
            Err(WriteError::NoCaseMatched)
        },
        Encoding::Mu { ref body, .. } => length(&(body)(e), v),
        Encoding::Conv { ref project, ref inner, .. } =>
            length(inner, &(project)(v)),
        Encoding::Describe { ref inner, .. }
        | Encoding::Def { ref inner, .. } => length(inner, v),
        Encoding::Splitted { ref binary, .. } => length(binary, v),
        Encoding::DynamicSize { width, ref inner } =>
            Ok(width.bytes() + length(inner, v)?),
        Encoding::CheckSize { limit, ref inner } => {
            let n = length(inner, v)?;
            if n > limit {
                Err(WriteError::SizeLimitExceeded)
            } else {
                Ok(n)
            }
        },
        Encoding::Delayed(ref body) => length(&(body)(), v),
        // Everything else is fixed-kind and already answered above.
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod test {
    use num_bigint::BigInt;

    use encoding::*;
    use error::WriteError;
    use size::TagSize;
    use value::Value;

    use super::*;

    #[test]
    fn fixed_descriptors_answer_without_the_value() {
        assert_eq!(2, length(&uint16(), &Value::Int(0x0102)).unwrap());
        assert_eq!(8, length(&float(), &Value::Float(1.5)).unwrap());
        assert_eq!(1, length(&ranged_int(-5, 10), &Value::Int(3)).unwrap());
        assert_eq!(6, length(&padded(int16(), 4), &Value::Int(1)).unwrap());
        assert_eq!(3, length(&fixed_string(3),
                             &Value::String("abc".to_string())).unwrap());
    }

    #[test]
    fn dynamic_descriptors_walk_the_value() {
        let e = obj2(req("code", uint16()), req("message", string()));
        let v = Value::Tuple(vec![
            Value::Int(0x0102),
            Value::String("hi".to_string()),
        ]);
        assert_eq!(8, length(&e, &v).unwrap());

        assert_eq!(1, length(&z(), &Value::Z(BigInt::from(0))).unwrap());
        assert_eq!(2, length(&z(), &Value::Z(BigInt::from(-300))).unwrap());

        let seq = Value::Seq(vec![Value::Int(1), Value::Int(2),
                                  Value::Int(3)]);
        assert_eq!(7, length(&dynamic_size(list(uint8())), &seq).unwrap());
    }

    #[test]
    fn optional_fields() {
        let e = obj1(opt("a", uint16()));
        assert_eq!(1, length(&e, &Value::none()).unwrap());
        assert_eq!(3, length(&e, &Value::some(Value::Int(7))).unwrap());

        let e = obj1(opt("a", variable_bytes()));
        assert_eq!(0, length(&e, &Value::none()).unwrap());
        assert_eq!(2, length(
            &e, &Value::some(Value::Bytes(vec![1, 2]))).unwrap());
    }

    #[test]
    fn unions_take_the_first_matching_case() {
        let e = union(TagSize::Uint8, vec![
            case(CaseTag::Tag(0), None, null(),
                 |v| match *v {
                     Value::Option(None) => Some(Value::Unit),
                     _ => None,
                 },
                 |_| Value::none()),
            case(CaseTag::Tag(1), None, int32(),
                 |v| match *v {
                     Value::Option(Some(ref inner)) =>
                         Some((**inner).clone()),
                     _ => None,
                 },
                 |v| Value::some(v)),
        ]);

        assert_eq!(1, length(&e, &Value::none()).unwrap());
        assert_eq!(5, length(&e, &Value::some(Value::Int(3))).unwrap());
        assert_eq!(Err(WriteError::NoCaseMatched),
                   length(&e, &Value::Bool(true)));
    }

    #[test]
    fn size_guards() {
        let e = check_size(3, string());
        assert_eq!(Err(WriteError::SizeLimitExceeded),
                   length(&e, &Value::String("oops".to_string())));

        let e = bounded_list(2, uint8());
        assert_eq!(Err(WriteError::ListTooLong),
                   length(&e, &Value::Seq(vec![Value::Int(1); 3])));
        assert_eq!(2, length(&e, &Value::Seq(vec![Value::Int(1); 2]))
                   .unwrap());
    }
}
