//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Serialization of values into byte buffers.

use encoding::{BytesKind, CaseTag, Encoding, Field};
use error::WriteError;
use kind::Kind;
use length::{length, natural_of_value, pair_of_value};
use size::{self, IntWidth, SizeWidth, TagSize};
use value::Value;
use wire;

struct WriteState<'a> {
    buf: &'a mut [u8],
    offset: usize,
}

impl<'a> WriteState<'a> {
    /// Reserves the next `n` bytes and returns the offset they start at.
    fn claim(&mut self, n: usize) -> usize {
        if n > self.buf.len() - self.offset {
            panic!("write buffer too small; pre-size it with length()");
        }
        let at = self.offset;
        self.offset += n;
        at
    }
}

fn check_int(v: i64, minimum: i64, maximum: i64) -> Result<(), WriteError> {
    if v < minimum || v > maximum {
        Err(WriteError::InvalidInt(minimum, v, maximum))
    } else {
        Ok(())
    }
}

fn write_ranged(st: &mut WriteState, width: IntWidth, v: i64) {
    let at = st.claim(width.bytes());
    match width {
        IntWidth::Int8 => wire::put_i8_raw(st.buf, at, v as i8),
        IntWidth::Uint8 => wire::put_u8(st.buf, at, v as u8),
        IntWidth::Int16 => wire::put_i16(st.buf, at, v as i16),
        IntWidth::Uint16 => wire::put_u16(st.buf, at, v as u16),
        IntWidth::Int31 => wire::put_i32(st.buf, at, v as i32),
    }
}

fn write_seq(st: &mut WriteState, array: bool, max_length: Option<usize>,
             elem: &Encoding, v: &Value) -> Result<(), WriteError> {
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
    for item in items {
        write_rec(elem, item, st)?;
    }
    Ok(())
}

fn write_rec(e: &Encoding, v: &Value, st: &mut WriteState)
             -> Result<(), WriteError> {
    match *e {
        Encoding::Null | Encoding::Empty | Encoding::Constant(_)
        | Encoding::Ignore => {
            v.to_unit();
            Ok(())
        },
        Encoding::Bool => {
            let at = st.claim(size::BOOL);
            wire::put_u8(st.buf, at, if *v.to_bool() { 1 } else { 0 });
            Ok(())
        },
        Encoding::Int8 => {
            let v = *v.to_int();
            check_int(v, -128, 127)?;
            let at = st.claim(size::INT8);
            wire::put_i8_raw(st.buf, at, v as i8);
            Ok(())
        },
        Encoding::Uint8 => {
            let v = *v.to_int();
            check_int(v, 0, 0xFF)?;
            let at = st.claim(size::INT8);
            wire::put_u8(st.buf, at, v as u8);
            Ok(())
        },
        Encoding::Int16 => {
            let v = *v.to_int();
            check_int(v, -32768, 32767)?;
            let at = st.claim(size::INT16);
            wire::put_i16(st.buf, at, v as i16);
            Ok(())
        },
        Encoding::Uint16 => {
            let v = *v.to_int();
            check_int(v, 0, 0xFFFF)?;
            let at = st.claim(size::INT16);
            wire::put_u16(st.buf, at, v as u16);
            Ok(())
        },
        Encoding::Int31 => {
            let v = *v.to_int();
            check_int(v, size::MIN_INT31, size::MAX_INT31)?;
            let at = st.claim(size::INT32);
            wire::put_i32(st.buf, at, v as i32);
            Ok(())
        },
        Encoding::Int32 => {
            let v = *v.to_int();
            check_int(v, i32::MIN as i64, i32::MAX as i64)?;
            let at = st.claim(size::INT32);
            wire::put_i32(st.buf, at, v as i32);
            Ok(())
        },
        Encoding::Int64 => {
            let at = st.claim(size::INT64);
            wire::put_i64(st.buf, at, *v.to_int());
            Ok(())
        },
        Encoding::RangedInt { minimum, maximum } => {
            let v = *v.to_int();
            check_int(v, minimum, maximum)?;
            let offset = if minimum > 0 { v - minimum } else { v };
            write_ranged(st, size::range_width(minimum, maximum), offset);
            Ok(())
        },
        Encoding::Float => {
            let at = st.claim(size::FLOAT);
            wire::put_f64(st.buf, at, *v.to_float());
            Ok(())
        },
        Encoding::RangedFloat { minimum, maximum } => {
            let v = *v.to_float();
            if v < minimum || v > maximum {
                return Err(WriteError::InvalidFloat(minimum, v, maximum));
            }
            let at = st.claim(size::FLOAT);
            wire::put_f64(st.buf, at, v);
            Ok(())
        },
        Encoding::Z => {
            let groups = wire::z_to_groups(v.to_z());
            let at = st.claim(groups.len());
            st.buf[at..at + groups.len()].copy_from_slice(&groups);
            Ok(())
        },
        Encoding::N => {
            let groups = wire::n_to_groups(&natural_of_value(v)?);
            let at = st.claim(groups.len());
            st.buf[at..at + groups.len()].copy_from_slice(&groups);
            Ok(())
        },
        Encoding::String(kind) => {
            let s = v.to_str();
            if let BytesKind::Fixed(n) = kind {
                if s.len() != n {
                    return Err(WriteError::InvalidStringLength(n, s.len()));
                }
            }
            let at = st.claim(s.len());
            st.buf[at..at + s.len()].copy_from_slice(s.as_bytes());
            Ok(())
        },
        Encoding::Bytes(kind) => {
            let b = v.to_bytes();
            if let BytesKind::Fixed(n) = kind {
                if b.len() != n {
                    return Err(WriteError::InvalidBytesLength(n, b.len()));
                }
            }
            let at = st.claim(b.len());
            st.buf[at..at + b.len()].copy_from_slice(b);
            Ok(())
        },
        Encoding::StringEnum(ref cases) => {
            let index = match cases.iter().position(|&(_, ref c)| c == v) {
                Some(index) => index,
                None => return Err(WriteError::NoCaseMatched),
            };
            match size::enum_width(cases.len()) {
                SizeWidth::Uint8 => {
                    let at = st.claim(1);
                    wire::put_u8(st.buf, at, index as u8);
                },
                SizeWidth::Uint16 => {
                    let at = st.claim(2);
                    wire::put_u16(st.buf, at, index as u16);
                },
                SizeWidth::Uint30 => {
                    let at = st.claim(4);
                    wire::put_i32(st.buf, at, index as i32);
                },
            }
            Ok(())
        },
        Encoding::Array { max_length, ref elem } =>
            write_seq(st, true, max_length, elem, v),
        Encoding::List { max_length, ref elem } =>
            write_seq(st, false, max_length, elem, v),
        Encoding::Obj(ref field) => match *field {
            Field::Req { ref encoding, .. }
            | Field::Dft { ref encoding, .. } => write_rec(encoding, v, st),
            Field::Opt { kind: Kind::Variable, ref encoding, .. } =>
                match v.to_option() {
                    None => Ok(()),
                    Some(inner) => write_rec(encoding, inner, st),
                },
            Field::Opt { ref encoding, .. } => match v.to_option() {
                None => {
                    let at = st.claim(1);
                    wire::put_u8(st.buf, at, 0);
                    Ok(())
                },
                Some(inner) => {
                    let at = st.claim(1);
                    wire::put_u8(st.buf, at, 1);
                    write_rec(encoding, inner, st)
                },
            },
        },
        Encoding::Objs { ref left, ref right, .. }
        | Encoding::Tups { ref left, ref right, .. } => {
            let (lv, rv) = pair_of_value(v);
            write_rec(left, lv, st)?;
            write_rec(right, rv, st)
        },
        Encoding::Tup(ref inner) => write_rec(inner, v, st),
        Encoding::Union { tag_size, ref cases, .. } => {
            for case in cases.iter() {
                let tag = match case.tag {
                    CaseTag::Tag(tag) => tag,
                    CaseTag::TextOnly => continue,
                };
                if let Some(payload) = (case.project)(v) {
                    match tag_size {
                        TagSize::Uint8 => {
                            let at = st.claim(1);
                            wire::put_u8(st.buf, at, tag as u8);
                        },
                        TagSize::Uint16 => {
                            let at = st.claim(2);
                            wire::put_u16(st.buf, at, tag);
                        },
                    }
                    return write_rec(&case.encoding, &payload, st);
                }
            }
            Err(WriteError::NoCaseMatched)
        },
        Encoding::Mu { ref body, .. } => write_rec(&(body)(e), v, st),
        Encoding::Conv { ref project, ref inner, .. } =>
            write_rec(inner, &(project)(v), st),
        Encoding::Describe { ref inner, .. }
        | Encoding::Def { ref inner, .. } => write_rec(inner, v, st),
        Encoding::Splitted { ref binary, .. } => write_rec(binary, v, st),
        Encoding::DynamicSize { width, ref inner } => {
            let prefix_at = st.claim(width.bytes());
            let payload_start = st.offset;
            write_rec(inner, v, st)?;

            // Back-patch the now-known payload length.
            let payload_len = st.offset - payload_start;
            if payload_len > width.max_value() {
                return Err(WriteError::InvalidSize(payload_len));
            }
            match width {
                SizeWidth::Uint8 =>
                    wire::put_u8(st.buf, prefix_at, payload_len as u8),
                SizeWidth::Uint16 =>
                    wire::put_u16(st.buf, prefix_at, payload_len as u16),
                SizeWidth::Uint30 =>
                    wire::put_i32(st.buf, prefix_at, payload_len as i32),
            }
            Ok(())
        },
        Encoding::CheckSize { limit, ref inner } => {
            let start = st.offset;
            write_rec(inner, v, st)?;
            if st.offset - start > limit {
                Err(WriteError::SizeLimitExceeded)
            } else {
                Ok(())
            }
        },
        Encoding::Padded { ref inner, padding } => {
            write_rec(inner, v, st)?;
            let at = st.claim(padding);
            for b in &mut st.buf[at..at + padding] {
                *b = 0;
            }
            Ok(())
        },
        Encoding::Delayed(ref body) => write_rec(&(body)(), v, st),
    }
}

/// Serializes `v` under `e` into `buf` starting at `offset`; returns the
/// offset one past the last byte written.
///
/// A failed write leaves the buffer contents past `offset` unspecified.
///
/// # Panics
///
/// Panics if the buffer cannot hold the serialized form (pre-size it with
/// [`length`]) or if the value does not match the descriptor's shape.
pub fn write(e: &Encoding, v: &Value, buf: &mut [u8], offset: usize)
             -> Result<usize, WriteError> {
    if offset > buf.len() {
        panic!("write offset {} beyond the end of the buffer", offset);
    }
    let mut st = WriteState { buf: buf, offset: offset };
    write_rec(e, v, &mut st)?;
    Ok(st.offset)
}

/// Serializes `v` under `e` into a freshly allocated buffer.
pub fn to_bytes(e: &Encoding, v: &Value) -> Result<Vec<u8>, WriteError> {
    let len = length(e, v)?;
    let mut buf = vec![0; len];
    let end = write(e, v, &mut buf, 0)?;
    debug_assert_eq!(len, end);
    Ok(buf)
}

/// Serializes `v` under `e` and splits the result into blocks of at most
/// `block_size` bytes.
///
/// # Panics
///
/// Panics if `block_size` is zero.
pub fn to_bytes_list(block_size: usize, e: &Encoding, v: &Value)
                     -> Result<Vec<Vec<u8>>, WriteError> {
    if block_size == 0 {
        panic!("to_bytes_list requires a positive block size");
    }
    let bytes = to_bytes(e, v)?;
    Ok(bytes.chunks(block_size).map(|chunk| chunk.to_vec()).collect())
}
