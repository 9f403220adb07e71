//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! One-shot parsing of byte slices back into values.
//!
//! The reader walks the descriptor with a byte budget, the "context":
//! the window of bytes the current sub-descriptor is allowed to consume.
//! Length prefixes and fixed-length compositions narrow the context on
//! entry and restore it on exit; variable descriptors simply consume
//! whatever their context still holds.

use encoding::{BytesKind, CaseTag, Encoding, Field};
use error::ReadError;
use kind::{classify, Kind};
use size::{self, IntWidth, SizeWidth, TagSize};
use value::Value;
use wire;

struct ReadState<'a> {
    buf: &'a [u8],
    offset: usize,
    remaining: usize,
}

impl<'a> ReadState<'a> {
    /// Claims the next `n` bytes of the context and returns the offset
    /// they start at.
    fn take(&mut self, n: usize) -> Result<usize, ReadError> {
        if n > self.remaining {
            return Err(ReadError::NotEnoughData);
        }
        let at = self.offset;
        self.offset += n;
        self.remaining -= n;
        Ok(at)
    }

    /// Runs `body` with the context narrowed to exactly `n` bytes and
    /// requires it to consume all of them.
    fn delimited<F>(&mut self, n: usize, body: F) -> Result<Value, ReadError>
    where F : FnOnce(&mut ReadState<'a>) -> Result<Value, ReadError> {
        if n > self.remaining {
            return Err(ReadError::NotEnoughData);
        }
        let saved = self.remaining - n;
        self.remaining = n;
        let v = body(self)?;
        if self.remaining != 0 {
            return Err(ReadError::ExtraBytes);
        }
        self.remaining = saved;
        Ok(v)
    }
}

fn read_groups(st: &mut ReadState) -> Result<Vec<u8>, ReadError> {
    let mut groups = Vec::new();
    loop {
        let at = st.take(1)?;
        let group = st.buf[at];
        groups.push(group);
        if group & 0x80 == 0 {
            return Ok(groups);
        }
    }
}

fn read_ranged(st: &mut ReadState, width: IntWidth)
               -> Result<i64, ReadError> {
    let at = st.take(width.bytes())?;
    Ok(match width {
        IntWidth::Int8 => wire::get_i8(st.buf, at) as i64,
        IntWidth::Uint8 => wire::get_u8(st.buf, at) as i64,
        IntWidth::Int16 => wire::get_i16(st.buf, at) as i64,
        IntWidth::Uint16 => wire::get_u16(st.buf, at) as i64,
        IntWidth::Int31 => wire::get_i32(st.buf, at) as i64,
    })
}

fn read_seq(st: &mut ReadState, array: bool, max_length: Option<usize>,
            elem: &Encoding) -> Result<Value, ReadError> {
    let mut items = Vec::new();
    while st.remaining > 0 {
        items.push(read_rec(elem, st)?);
        if let Some(max) = max_length {
            if items.len() > max {
                return Err(if array {
                    ReadError::ArrayTooLong
                } else {
                    ReadError::ListTooLong
                });
            }
        }
    }
    Ok(Value::Seq(items))
}

fn read_rec(e: &Encoding, st: &mut ReadState) -> Result<Value, ReadError> {
    match *e {
        Encoding::Null | Encoding::Empty | Encoding::Constant(_) =>
            Ok(Value::Unit),
        Encoding::Ignore => {
            let remaining = st.remaining;
            st.take(remaining)?;
            Ok(Value::Unit)
        },
        Encoding::Bool => {
            let at = st.take(size::BOOL)?;
            Ok(Value::Bool(wire::get_u8(st.buf, at) != 0))
        },
        Encoding::Int8 => {
            let at = st.take(size::INT8)?;
            Ok(Value::Int(wire::get_i8(st.buf, at) as i64))
        },
        Encoding::Uint8 => {
            let at = st.take(size::INT8)?;
            Ok(Value::Int(wire::get_u8(st.buf, at) as i64))
        },
        Encoding::Int16 => {
            let at = st.take(size::INT16)?;
            Ok(Value::Int(wire::get_i16(st.buf, at) as i64))
        },
        Encoding::Uint16 => {
            let at = st.take(size::INT16)?;
            Ok(Value::Int(wire::get_u16(st.buf, at) as i64))
        },
        Encoding::Int31 => {
            let at = st.take(size::INT32)?;
            let v = wire::get_i32(st.buf, at) as i64;
            if v < size::MIN_INT31 || v > size::MAX_INT31 {
                return Err(ReadError::InvalidInt(
                    size::MIN_INT31, v, size::MAX_INT31));
            }
            Ok(Value::Int(v))
        },
        Encoding::Int32 => {
            let at = st.take(size::INT32)?;
            Ok(Value::Int(wire::get_i32(st.buf, at) as i64))
        },
        Encoding::Int64 => {
            let at = st.take(size::INT64)?;
            Ok(Value::Int(wire::get_i64(st.buf, at)))
        },
        Encoding::RangedInt { minimum, maximum } => {
            let raw = read_ranged(st, size::range_width(minimum, maximum))?;
            let v = if minimum > 0 { raw + minimum } else { raw };
            if v < minimum || v > maximum {
                return Err(ReadError::InvalidInt(minimum, v, maximum));
            }
            Ok(Value::Int(v))
        },
        Encoding::Float => {
            let at = st.take(size::FLOAT)?;
            Ok(Value::Float(wire::get_f64(st.buf, at)))
        },
        Encoding::RangedFloat { minimum, maximum } => {
            let at = st.take(size::FLOAT)?;
            let v = wire::get_f64(st.buf, at);
            if v < minimum || v > maximum {
                return Err(ReadError::InvalidFloat(minimum, v, maximum));
            }
            Ok(Value::Float(v))
        },
        Encoding::Z => {
            let groups = read_groups(st)?;
            Ok(Value::Z(wire::z_from_groups(&groups)?))
        },
        Encoding::N => {
            let groups = read_groups(st)?;
            Ok(Value::N(wire::n_from_groups(&groups)?))
        },
        Encoding::String(kind) => {
            let n = match kind {
                BytesKind::Fixed(n) => n,
                BytesKind::Variable => st.remaining,
            };
            let at = st.take(n)?;
            match ::std::str::from_utf8(&st.buf[at..at + n]) {
                Ok(s) => Ok(Value::String(s.to_owned())),
                Err(_) => Err(ReadError::InvalidUtf8),
            }
        },
        Encoding::Bytes(kind) => {
            let n = match kind {
                BytesKind::Fixed(n) => n,
                BytesKind::Variable => st.remaining,
            };
            let at = st.take(n)?;
            Ok(Value::Bytes(st.buf[at..at + n].to_vec()))
        },
        Encoding::StringEnum(ref cases) => {
            let index = match size::enum_width(cases.len()) {
                SizeWidth::Uint8 => {
                    let at = st.take(1)?;
                    wire::get_u8(st.buf, at) as i64
                },
                SizeWidth::Uint16 => {
                    let at = st.take(2)?;
                    wire::get_u16(st.buf, at) as i64
                },
                SizeWidth::Uint30 => {
                    let at = st.take(4)?;
                    wire::get_i32(st.buf, at) as i64
                },
            };
            if index < 0 {
                return Err(ReadError::InvalidSize(index));
            }
            if index as usize >= cases.len() {
                return Err(ReadError::UnexpectedTag(index as u32));
            }
            Ok(cases[index as usize].1.clone())
        },
        Encoding::Array { max_length, ref elem } =>
            read_seq(st, true, max_length, elem),
        Encoding::List { max_length, ref elem } =>
            read_seq(st, false, max_length, elem),
        Encoding::Obj(ref field) => match *field {
            Field::Req { ref encoding, .. }
            | Field::Dft { ref encoding, .. } => read_rec(encoding, st),
            Field::Opt { kind: Kind::Variable, ref encoding, .. } => {
                if st.remaining == 0 {
                    Ok(Value::none())
                } else {
                    Ok(Value::some(read_rec(encoding, st)?))
                }
            },
            Field::Opt { ref encoding, .. } => {
                let at = st.take(1)?;
                if wire::get_u8(st.buf, at) == 0 {
                    Ok(Value::none())
                } else {
                    Ok(Value::some(read_rec(encoding, st)?))
                }
            },
        },
        Encoding::Objs { kind, ref left, ref right }
        | Encoding::Tups { kind, ref left, ref right } =>
            read_pair(st, kind, left, right),
        Encoding::Tup(ref inner) => read_rec(inner, st),
        Encoding::Union { tag_size, ref cases, .. } => {
            let tag = match tag_size {
                TagSize::Uint8 => {
                    let at = st.take(1)?;
                    wire::get_u8(st.buf, at) as u16
                },
                TagSize::Uint16 => {
                    let at = st.take(2)?;
                    wire::get_u16(st.buf, at)
                },
            };
            let case = match cases.iter().find(|case| match case.tag {
                CaseTag::Tag(t) => t == tag,
                CaseTag::TextOnly => false,
            }) {
                Some(case) => case,
                None => return Err(ReadError::UnexpectedTag(tag as u32)),
            };
            let payload = read_rec(&case.encoding, st)?;
            Ok((case.inject)(payload))
        },
        Encoding::Mu { ref body, .. } => read_rec(&(body)(e), st),
        Encoding::Conv { ref inject, ref inner, .. } => {
            let v = read_rec(inner, st)?;
            Ok((inject)(v))
        },
        Encoding::Describe { ref inner, .. }
        | Encoding::Def { ref inner, .. } => read_rec(inner, st),
        Encoding::Splitted { ref binary, .. } => read_rec(binary, st),
        Encoding::DynamicSize { width, ref inner } => {
            let declared = match width {
                SizeWidth::Uint8 => {
                    let at = st.take(1)?;
                    wire::get_u8(st.buf, at) as i64
                },
                SizeWidth::Uint16 => {
                    let at = st.take(2)?;
                    wire::get_u16(st.buf, at) as i64
                },
                SizeWidth::Uint30 => {
                    let at = st.take(4)?;
                    wire::get_i32(st.buf, at) as i64
                },
            };
            if declared < 0 {
                return Err(ReadError::InvalidSize(declared));
            }
            st.delimited(declared as usize, |st| read_rec(inner, st))
        },
        Encoding::CheckSize { limit, ref inner } => {
            let start = st.offset;
            let v = read_rec(inner, st)?;
            if st.offset - start > limit {
                Err(ReadError::SizeLimitExceeded)
            } else {
                Ok(v)
            }
        },
        Encoding::Padded { ref inner, padding } => {
            let v = read_rec(inner, st)?;
            st.take(padding)?;
            Ok(v)
        },
        Encoding::Delayed(ref body) => read_rec(&(body)(), st),
    }
}

/// Reads the two halves of a composition, splitting the context as the
/// combined kind dictates.
fn read_pair(st: &mut ReadState, kind: Kind, left: &Encoding,
             right: &Encoding) -> Result<Value, ReadError> {
    match kind {
        Kind::Fixed(n) => st.delimited(n, |st| {
            let lv = read_rec(left, st)?;
            let rv = read_rec(right, st)?;
            Ok(Value::Tuple(vec![lv, rv]))
        }),
        Kind::Dynamic => {
            let lv = read_rec(left, st)?;
            let rv = read_rec(right, st)?;
            Ok(Value::Tuple(vec![lv, rv]))
        },
        Kind::Variable => match (classify(left), classify(right)) {
            (Kind::Variable, Kind::Fixed(n)) => {
                // The left half gets everything except the known tail.
                if n > st.remaining {
                    return Err(ReadError::NotEnoughData);
                }
                let head = st.remaining - n;
                let lv = st.delimited(head, |st| read_rec(left, st))?;
                let rv = read_rec(right, st)?;
                Ok(Value::Tuple(vec![lv, rv]))
            },
            (_, Kind::Variable) => {
                let lv = read_rec(left, st)?;
                let rv = read_rec(right, st)?;
                Ok(Value::Tuple(vec![lv, rv]))
            },
            _ => unreachable!(),
        },
    }
}

/// Parses a value of `e` from `buf`, consuming at most `length` bytes
/// starting at `offset`; returns the consumed byte count and the value.
pub fn read(e: &Encoding, buf: &[u8], offset: usize, length: usize)
            -> Result<(usize, Value), ReadError> {
    if offset > buf.len() || length > buf.len() - offset {
        return Err(ReadError::NotEnoughData);
    }
    let mut st = ReadState {
        buf: buf,
        offset: offset,
        remaining: length,
    };
    let v = read_rec(e, &mut st)?;
    Ok((st.offset - offset, v))
}

/// Parses a value of `e` spanning all of `buf`.
///
/// Fails with `ExtraBytes` if the value does not account for every byte.
pub fn of_bytes(e: &Encoding, buf: &[u8]) -> Result<Value, ReadError> {
    let (consumed, v) = read(e, buf, 0, buf.len())?;
    if consumed != buf.len() {
        return Err(ReadError::ExtraBytes);
    }
    Ok(v)
}

#[cfg(test)]
mod test {
    use num_bigint::{BigInt, BigUint};

    use encoding::*;
    use error::ReadError;
    use size::{MAX_INT31, MIN_INT31, TagSize};
    use test_helpers::parse;
    use value::Value;
    use write::to_bytes;

    use super::*;

    #[test]
    fn primitives() {
        assert_eq!(Value::Bool(true),
                   of_bytes(&boolean(), &parse("01")).unwrap());
        // Any non-zero byte reads as true.
        assert_eq!(Value::Bool(true),
                   of_bytes(&boolean(), &parse("02")).unwrap());
        assert_eq!(Value::Int(-2), of_bytes(&int8(), &parse("FE")).unwrap());
        assert_eq!(Value::Int(0x0102),
                   of_bytes(&uint16(), &parse("01 02")).unwrap());
        assert_eq!(Value::Int(-2),
                   of_bytes(&int32(), &parse("FF FF FF FE")).unwrap());
        assert_eq!(Value::Float(1.0),
                   of_bytes(&float(),
                            &parse("3F F0 00 00 00 00 00 00")).unwrap());
    }

    #[test]
    fn objects_with_length_prefixed_tails() {
        let e = obj2(req("code", uint16()), req("message", string()));
        let v = of_bytes(&e, &parse("01 02 | 00 00 00 02 | 68 69"))
            .unwrap();
        assert_eq!(Value::Tuple(vec![
            Value::Int(0x0102),
            Value::String("hi".to_string()),
        ]), v);
    }

    #[test]
    fn arbitrary_precision_integers() {
        assert_eq!(Value::Z(BigInt::from(-300)),
                   of_bytes(&z(), &parse("EC 04")).unwrap());
        assert_eq!(Value::N(BigUint::from(300u32)),
                   of_bytes(&n(), &parse("AC 02")).unwrap());
        assert_eq!(Err(ReadError::TrailingZero),
                   of_bytes(&z(), &parse("80 00")));
        assert_eq!(Err(ReadError::NotEnoughData),
                   of_bytes(&z(), &parse("80")));
    }

    #[test]
    fn unions_read_the_tag_then_the_payload() {
        let e = union(TagSize::Uint8, vec![
            case(CaseTag::Tag(0), Some("none"), empty(),
                 |v| match *v {
                     Value::Option(None) => Some(Value::Unit),
                     _ => None,
                 },
                 |_| Value::none()),
            case(CaseTag::Tag(1), Some("some"), int32(),
                 |v| match *v {
                     Value::Option(Some(ref inner)) =>
                         Some((**inner).clone()),
                     _ => None,
                 },
                 |v| Value::some(v)),
        ]);

        assert_eq!(Value::some(Value::Int(0x11223344)),
                   of_bytes(&e, &parse("01 11 22 33 44")).unwrap());
        assert_eq!(Value::none(), of_bytes(&e, &parse("00")).unwrap());
        assert_eq!(Err(ReadError::UnexpectedTag(2)),
                   of_bytes(&e, &parse("02")));
    }

    #[test]
    fn length_prefixed_lists() {
        let e = dynamic_size(list(uint8()));
        assert_eq!(Value::Seq(vec![Value::Int(1), Value::Int(2),
                                   Value::Int(3)]),
                   of_bytes(&e, &parse("00 00 00 03 | 01 02 03")).unwrap());

        // A declared size the inner descriptor does not fill.
        let e = dynamic_size(uint8());
        assert_eq!(Err(ReadError::ExtraBytes),
                   of_bytes(&e, &parse("00 00 00 02 | 01 02")));
    }

    #[test]
    fn negative_length_prefixes_are_rejected() {
        let e = string();
        assert_eq!(Err(ReadError::InvalidSize(-1)),
                   of_bytes(&e, &parse("FF FF FF FF")));
    }

    #[test]
    fn enums_read_their_index() {
        let e = string_enum(vec![
            ("a", Value::Int(10)),
            ("b", Value::Int(20)),
            ("c", Value::Int(30)),
        ]);
        assert_eq!(Value::Int(20), of_bytes(&e, &parse("01")).unwrap());
        assert_eq!(Err(ReadError::UnexpectedTag(3)),
                   of_bytes(&e, &parse("03")));
    }

    #[test]
    fn ranged_integers_reverse_the_offset() {
        let e = ranged_int(100, 400);
        assert_eq!(Value::Int(250),
                   of_bytes(&e, &parse("00 96")).unwrap());
        assert_eq!(Err(ReadError::InvalidInt(100, 500, 400)),
                   of_bytes(&e, &parse("01 90")));
    }

    #[test]
    fn int31_bounds_are_checked() {
        assert_eq!(Err(ReadError::InvalidInt(MIN_INT31, 0x7FFFFFFF,
                                             MAX_INT31)),
                   of_bytes(&int31(), &parse("7F FF FF FF")));
        assert_eq!(Value::Int(-5),
                   of_bytes(&int31(), &parse("FF FF FF FB")).unwrap());
    }

    #[test]
    fn variable_pairs_split_on_the_fixed_tail() {
        let e = tup2(variable_string(), uint16());
        assert_eq!(Value::Tuple(vec![
            Value::String("hi".to_string()),
            Value::Int(0x0102),
        ]), of_bytes(&e, &parse("'hi' 01 02")).unwrap());

        let e = tup2(uint16(), variable_string());
        assert_eq!(Value::Tuple(vec![
            Value::Int(0x0102),
            Value::String("hi".to_string()),
        ]), of_bytes(&e, &parse("01 02 'hi'")).unwrap());
    }

    #[test]
    fn optional_fields() {
        let e = obj1(opt("a", uint16()));
        assert_eq!(Value::none(), of_bytes(&e, &parse("00")).unwrap());
        assert_eq!(Value::some(Value::Int(7)),
                   of_bytes(&e, &parse("01 00 07")).unwrap());

        let e = obj1(opt("a", variable_bytes()));
        assert_eq!(Value::none(), of_bytes(&e, &parse("")).unwrap());
        assert_eq!(Value::some(Value::Bytes(vec![1, 2])),
                   of_bytes(&e, &parse("01 02")).unwrap());
    }

    #[test]
    fn leftover_input_is_rejected() {
        assert_eq!(Err(ReadError::ExtraBytes),
                   of_bytes(&uint8(), &parse("01 00")));
        let (consumed, v) = read(&uint8(), &parse("01 00"), 0, 2).unwrap();
        assert_eq!((1, Value::Int(1)), (consumed, v));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        assert_eq!(Err(ReadError::InvalidUtf8),
                   of_bytes(&fixed_string(2), &parse("FF FE")));
        assert_eq!(Value::Bytes(vec![0xFF, 0xFE]),
                   of_bytes(&fixed_bytes(2), &parse("FF FE")).unwrap());
    }

    #[test]
    fn recursive_descriptors_round_trip() {
        let e = mu("ints", |rec| union(TagSize::Uint8, vec![
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
        ]));

        let v = Value::Seq(vec![Value::Int(1), Value::Int(2),
                                Value::Int(3)]);
        let bytes = to_bytes(&e, &v).unwrap();
        assert_eq!(parse("01 01 | 00 00 00 0D \
                          01 02 | 00 00 00 07 \
                          01 03 | 00 00 00 01 | 00"),
                   bytes);
        assert_eq!(v, of_bytes(&e, &bytes).unwrap());
    }

    #[test]
    fn padded_payloads_skip_their_padding() {
        let e = padded(uint8(), 2);
        assert_eq!(Value::Int(7),
                   of_bytes(&e, &parse("07 00 00")).unwrap());
        assert_eq!(Err(ReadError::NotEnoughData),
                   of_bytes(&e, &parse("07 00")));
    }

    #[test]
    fn check_size_bounds_the_consumption() {
        let e = check_size(3, string());
        assert_eq!(Err(ReadError::SizeLimitExceeded),
                   of_bytes(&e, &parse("00 00 00 01 41")));
    }
}
