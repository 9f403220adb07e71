//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! wireform is a library of encoding combinators: composable, typed
//! descriptors that each define both a compact tagless binary format and a
//! structured textual rendering for one shape of data, and that drive
//! every operation over that format from the single descriptor value.
//!
//! # Introduction
//!
//! ## Features
//!
//! - One descriptor, four interpreters: exact serialized length,
//! serialization, one-shot parsing, and incremental parsing all walk the
//! same immutable tree and agree on the same value space.
//!
//! - Tagless output. The bytes carry no type information beyond what you
//! explicitly paid for (union tags, length prefixes), so the format is as
//! compact as a hand-rolled one.
//!
//! - Ill-formed descriptors do not exist. Every constructor validates its
//! composition immediately; a composition whose bytes could not be parsed
//! back unambiguously is rejected while you build it, not when a peer
//! sends you data.
//!
//! - Incremental reading. Any self-delimiting descriptor can be parsed
//! from a sequence of chunks, suspending between chunks with no thread,
//! no callback and no buffering discipline imposed on the caller.
//!
//! ## Why use wireform?
//!
//! - You want a binary data format, so JSON/TOML/etc is out.
//!
//! - You want the format specified next to the types it serializes, with
//! the parser and printer derived from one place.
//!
//! - You want a stream protocol without inventing an extra framing
//! mechanism: length prefixes and fixed widths already delimit values.
//!
//! - You need arbitrary-precision integers, range-restricted integers, or
//! closed string enumerations on the wire without ad-hoc encodings.
//!
//! ## Why *not* to use wireform?
//!
//! - You want a self-describing data format. A wireform reader must hold
//! the same descriptor the writer used; if pre-agreed schemas are not
//! available, wireform isn't the right choice.
//!
//! - You want automatic derivation for your own structs. Descriptors
//! here are values, built by hand and mapped onto your types through
//! conversion closures.
//!
//! # Getting Started
//!
//! A descriptor is built by composing constructors, and then handed to
//! the interpreters together with a [`Value`] of the matching shape:
//!
//! ```
//! use wireform::{obj2, of_bytes, req, string, to_bytes, uint16, Value};
//!
//! let message = obj2(
//!     req("code", uint16()),
//!     req("message", string()));
//!
//! let value = Value::Tuple(vec![
//!     Value::Int(0x0102),
//!     Value::String("hi".to_owned()),
//! ]);
//!
//! let bytes = to_bytes(&message, &value).unwrap();
//! assert_eq!(&b"\x01\x02\x00\x00\x00\x02hi"[..], &bytes[..]);
//! assert_eq!(value, of_bytes(&message, &bytes).unwrap());
//! ```
//!
//! The same descriptor feeds the incremental reader, which suspends
//! whenever the bytes supplied so far run out:
//!
//! ```
//! use wireform::{obj2, read_stream, req, string, uint16, Status};
//!
//! let message = obj2(
//!     req("code", uint16()),
//!     req("message", string()));
//!
//! let status = read_stream(&message, vec![b"\x01\x02\x00\x00".to_vec()]);
//! let status = match status {
//!     Status::Await(pending) => pending.feed(b"\x00\x02\x68".to_vec()),
//!     _ => unreachable!(),
//! };
//! match status {
//!     Status::Await(pending) => match pending.feed(b"\x69".to_vec()) {
//!         Status::Success { consumed, .. } => assert_eq!(8, consumed),
//!         _ => unreachable!(),
//!     },
//!     _ => unreachable!(),
//! }
//! ```
//!
//! # Kinds
//!
//! Every descriptor has a kind, computed when it is built:
//!
//! - `Fixed(n)`: the serialized form is exactly `n` bytes for every
//! value (integers, floats, fixed strings, ...).
//!
//! - `Dynamic`: the length varies but the bytes delimit themselves
//! (length-prefixed values, arbitrary-precision integers, ...).
//!
//! - `Variable`: the length varies and only an enclosing context can
//! bound it (bare sequences, unprefixed strings, ...).
//!
//! Kinds are what make the tagless format parseable: a variable
//! descriptor is only accepted where some enclosing frame bounds it, and
//! compositions that would leave a parser with no way to find the
//! boundary between two values are rejected by the constructors
//! themselves. Wrapping a variable descriptor in
//! [`dynamic_size`](fn.dynamic_size.html) makes it dynamic again at the
//! cost of a length prefix.
//!
//! # Physical Format
//!
//! Fixed-width integers are big-endian two's complement; floats are
//! big-endian IEEE-754 binary64; booleans are one byte, writing 0 or 1
//! and reading any non-zero byte as true.
//!
//! A range-restricted integer is written in the narrowest of the 1-, 2-
//! and 4-byte widths spanning its range; when the whole range is
//! positive, values are offset by the minimum first.
//!
//! Arbitrary-precision integers are sequences of little-endian 7-bit
//! groups, each byte carrying a continuation bit in its high bit; signed
//! numbers cede bit 6 of the first byte to the sign of the magnitude. A
//! final group carrying no bits is rejected, so every number has exactly
//! one accepted form.
//!
//! Strings and byte sequences are raw bytes, with the length coming from
//! the descriptor (fixed) or the enclosing context (variable). Sequences
//! are their elements back to back, with no count. Optional fields carry
//! a one-byte presence prefix unless they are variable, in which case
//! presence is simply the context being non-empty.
//!
//! Union values are a 1- or 2-byte big-endian tag followed by the
//! matching case's payload. String enumerations are an unsigned index in
//! the narrowest width addressing the enumeration. Length prefixes are 1
//! or 2 unsigned bytes, or the default 4-byte form: a big-endian signed
//! 32-bit count whose negative values are invalid on the wire.

#![deny(missing_docs)]

#[macro_use] extern crate quick_error;
extern crate num_bigint;
extern crate num_traits;

pub mod size;
pub mod kind;
pub mod value;
pub mod wire;
pub mod encoding;
pub mod error;
pub mod length;
pub mod write;
pub mod read;
pub mod stream;

#[cfg(test)] mod test_helpers;
#[cfg(test)] mod interop_tests;

pub use self::encoding::*;
pub use self::error::{read_error_encoding, write_error_encoding};
pub use self::error::{ReadError, WriteError};
pub use self::kind::{classify, fixed_length, Kind};
pub use self::length::length;
pub use self::read::{of_bytes, read};
pub use self::stream::{check_stream, read_stream, Pending, Status};
pub use self::value::Value;
pub use self::write::{to_bytes, to_bytes_list, write};
