//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Low-level byte codecs underneath the interpreters.
//!
//! Fixed-width quantities are big-endian two's complement. The
//! arbitrary-precision codecs speak in "groups": little-endian 7-bit
//! continuation bytes, with the first group of a signed number ceding one
//! bit to the sign.

use num_bigint::{BigInt, BigUint, Sign};

use error::ReadError;

/// Writes `v` at `offset`.
pub fn put_u8(buf: &mut [u8], offset: usize, v: u8) {
    buf[offset] = v;
}

macro_rules! put_get {
    ($put:ident, $get:ident, $t:ident, $n:expr) => {
        /// Writes `v` big-endian at `offset`.
        pub fn $put(buf: &mut [u8], offset: usize, v: $t) {
            buf[offset..offset + $n].copy_from_slice(&v.to_be_bytes());
        }

        /// Reads a big-endian value at `offset`.
        pub fn $get(buf: &[u8], offset: usize) -> $t {
            let mut bytes = [0u8; $n];
            bytes.copy_from_slice(&buf[offset..offset + $n]);
            $t::from_be_bytes(bytes)
        }
    }
}

put_get!(put_i8_raw, get_i8, i8, 1);
put_get!(put_u16, get_u16, u16, 2);
put_get!(put_i16, get_i16, i16, 2);
put_get!(put_i32, get_i32, i32, 4);
put_get!(put_i64, get_i64, i64, 8);

/// Reads the byte at `offset`.
pub fn get_u8(buf: &[u8], offset: usize) -> u8 {
    buf[offset]
}

/// Writes `v` as a big-endian IEEE-754 binary64 at `offset`.
pub fn put_f64(buf: &mut [u8], offset: usize, v: f64) {
    buf[offset..offset + 8].copy_from_slice(&v.to_bits().to_be_bytes());
}

/// Reads a big-endian IEEE-754 binary64 at `offset`.
pub fn get_f64(buf: &[u8], offset: usize) -> f64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    f64::from_bits(u64::from_be_bytes(bytes))
}

/// Extracts up to 8 bits starting at bit `start` of a little-endian byte
/// array. Bits beyond the array read as zero.
fn bits_at(bytes: &[u8], start: usize, count: usize) -> u8 {
    let mut v = 0u8;
    for i in 0..count {
        let bit = start + i;
        let byte = bit / 8;
        if byte >= bytes.len() {
            break;
        }
        v |= ((bytes[byte] >> (bit % 8)) & 1) << i;
    }
    v
}

/// Encodes a signed arbitrary-precision integer into continuation groups.
///
/// The first group is `(continuation | sign | 6 magnitude bits)`, every
/// later group `(continuation | 7 magnitude bits)`. Zero is the single
/// group `0x00`.
pub fn z_to_groups(v: &BigInt) -> Vec<u8> {
    let mag = v.magnitude();
    let bytes = mag.to_bytes_le();
    let bits = mag.bits() as usize;

    let mut out = Vec::with_capacity(z_length(v));
    let mut first = bits_at(&bytes, 0, 6);
    if v.sign() == Sign::Minus {
        first |= 0x40;
    }
    if bits > 6 {
        first |= 0x80;
    }
    out.push(first);

    let mut start = 6;
    while start < bits {
        let mut group = bits_at(&bytes, start, 7);
        start += 7;
        if start < bits {
            group |= 0x80;
        }
        out.push(group);
    }
    out
}

/// Encodes a non-negative arbitrary-precision integer into continuation
/// groups. Every group is `(continuation | 7 magnitude bits)`.
pub fn n_to_groups(v: &BigUint) -> Vec<u8> {
    let bytes = v.to_bytes_le();
    let bits = v.bits() as usize;

    let mut out = Vec::with_capacity(n_length(v));
    let mut start = 0;
    loop {
        let mut group = bits_at(&bytes, start, 7);
        start += 7;
        if start < bits {
            group |= 0x80;
        }
        out.push(group);
        if start >= bits {
            break;
        }
    }
    out
}

/// Number of groups `z_to_groups` produces for `v`.
pub fn z_length(v: &BigInt) -> usize {
    let bits = v.magnitude().bits() as usize;
    if bits <= 6 {
        1
    } else {
        1 + (bits - 6 + 6) / 7
    }
}

/// Number of groups `n_to_groups` produces for `v`.
pub fn n_length(v: &BigUint) -> usize {
    let bits = v.bits() as usize;
    if bits == 0 {
        1
    } else {
        (bits + 6) / 7
    }
}

/// Rejects a final continuation group carrying no magnitude bits. Such an
/// encoding decodes to the same number as its prefix, so only the shortest
/// form is accepted.
fn check_canonical(groups: &[u8]) -> Result<(), ReadError> {
    match groups.last() {
        Some(&last) if groups.len() > 1 && (last & 0x7F) == 0 =>
            Err(ReadError::TrailingZero),
        _ => Ok(()),
    }
}

/// Decodes the groups of a signed arbitrary-precision integer.
///
/// `groups` must be the complete group run: every byte but the last with
/// its continuation bit set, the last with it clear.
pub fn z_from_groups(groups: &[u8]) -> Result<BigInt, ReadError> {
    check_canonical(groups)?;

    let first = groups[0];
    let mut mag = BigUint::from(first & 0x3F);
    let mut shift = 6usize;
    for &group in &groups[1..] {
        mag |= BigUint::from(group & 0x7F) << shift;
        shift += 7;
    }

    if first & 0x40 != 0 {
        Ok(-BigInt::from(mag))
    } else {
        Ok(BigInt::from(mag))
    }
}

/// Decodes the groups of a non-negative arbitrary-precision integer.
pub fn n_from_groups(groups: &[u8]) -> Result<BigUint, ReadError> {
    check_canonical(groups)?;

    let mut mag = BigUint::from(0u8);
    let mut shift = 0usize;
    for &group in groups {
        mag |= BigUint::from(group & 0x7F) << shift;
        shift += 7;
    }
    Ok(mag)
}
