//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Incremental parsing over a sequence of byte chunks.
//!
//! The reader here accepts its input piecewise: whenever the chunks
//! supplied so far run out mid-value, it suspends into an [`Await`] that
//! can be resumed with the next chunk, and a resumed parse picks up
//! exactly where the bytes stopped. Feeding the same bytes in any chunking
//! yields the same value as the one-shot reader.
//!
//! The suspension state is an explicit machine: a stack of pending
//! operations, a stack of partial values, and a stack of context limits.
//! Dropping an `Await` cancels the parse; nothing is held beyond the
//! machine itself.

use std::cmp::min;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use encoding::{BytesKind, CaseTag, Encoding, Field, InjectFn};
use error::ReadError;
use kind::{classify, Kind};
use size::{self, IntWidth, SizeWidth, TagSize};
use value::Value;
use wire;

/// Outcome of feeding chunks to the incremental reader.
pub enum Status {
    /// The value is complete.
    Success {
        /// The decoded value (`Unit` when only checking structure).
        value: Value,
        /// Total bytes consumed across all chunks.
        consumed: u64,
        /// Unconsumed input: the tail of the chunk the value ended in,
        /// followed by any chunks never touched.
        remaining: Vec<Vec<u8>>,
    },
    /// The input ran out mid-value; feed the next chunk to continue.
    Await(Pending),
    /// The input cannot decode to a value of the descriptor.
    Error(ReadError),
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Status::Success { ref value, consumed, ref remaining } =>
                f.debug_struct("Success")
                .field("value", value)
                .field("consumed", &consumed)
                .field("remaining", remaining)
                .finish(),
            Status::Await(_) => f.write_str("Await(..)"),
            Status::Error(ref e) => f.debug_tuple("Error").field(e).finish(),
        }
    }
}

/// A suspended incremental parse.
pub struct Pending {
    machine: Machine,
}

impl Pending {
    /// Resumes the parse with the next chunk of input.
    pub fn feed(mut self, chunk: Vec<u8>) -> Status {
        self.machine.chunks.push_back(chunk);
        self.machine.run()
    }
}

/// One pending operation of the parse machine. Operations execute from
/// the top of the stack; composite descriptors expand into several
/// operations, atomic ones either consume buffered bytes or suspend.
enum Op {
    Read(Arc<Encoding>),
    Inject(Arc<InjectFn>),
    Pair,
    WrapSome,
    SeqPush,
    SeqLoop {
        array: bool,
        max_length: Option<usize>,
        elem: Arc<Encoding>,
    },
    PopLimit,
    Groups { signed: bool, groups: Vec<u8> },
    CheckSizeEnd { start: u64, limit: usize },
    Skip(usize),
}

struct Machine {
    ops: Vec<Op>,
    values: Vec<Value>,
    chunks: VecDeque<Vec<u8>>,
    /// Bytes of the front chunk already consumed.
    front: usize,
    /// Total bytes consumed since the parse started.
    pos: u64,
    /// Absolute end positions of the enclosing contexts, innermost last.
    limits: Vec<u64>,
    checking: bool,
}

macro_rules! need {
    ($machine:expr, $n:expr, $retry:expr) => {
        match $machine.need($n)? {
            Some(bytes) => bytes,
            None => return Ok(Some($retry)),
        }
    }
}

impl Machine {
    fn run(mut self) -> Status {
        loop {
            let op = match self.ops.pop() {
                Some(op) => op,
                None => break,
            };
            match self.exec(op) {
                Ok(None) => (),
                Ok(Some(op)) => {
                    self.ops.push(op);
                    return Status::Await(Pending { machine: self });
                },
                Err(e) => return Status::Error(e),
            }
        }

        let value = if self.checking {
            Value::Unit
        } else {
            match self.values.pop() {
                Some(v) => v,
                None => Value::Unit,
            }
        };
        let consumed = self.pos;
        Status::Success {
            value: value,
            consumed: consumed,
            remaining: self.into_remaining(),
        }
    }

    fn buffered(&self) -> usize {
        let total: usize = self.chunks.iter().map(|c| c.len()).sum();
        total - self.front
    }

    /// Consumes `n` buffered bytes; the caller must have checked they are
    /// there.
    fn take(&mut self, n: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            let exhausted;
            {
                let chunk = &self.chunks[0];
                let step = min(chunk.len() - self.front, n - out.len());
                out.extend_from_slice(
                    &chunk[self.front..self.front + step]);
                self.front += step;
                exhausted = self.front == chunk.len();
            }
            if exhausted {
                self.chunks.pop_front();
                self.front = 0;
            }
        }
        self.pos += n as u64;
        out
    }

    /// Claims `n` bytes: an error if the context cannot hold them, a
    /// suspension if they are not buffered yet.
    fn need(&mut self, n: usize) -> Result<Option<Vec<u8>>, ReadError> {
        if let Some(&end) = self.limits.last() {
            if self.pos + n as u64 > end {
                return Err(ReadError::NotEnoughData);
            }
        }
        if self.buffered() < n {
            return Ok(None);
        }
        Ok(Some(self.take(n)))
    }

    /// Bytes left in the innermost context; variable descriptors are only
    /// reachable inside one.
    fn context_len(&self) -> usize {
        match self.limits.last() {
            Some(&end) => (end - self.pos) as usize,
            None => panic!(
                "variable descriptor outside any delimited context"),
        }
    }

    fn push_value(&mut self, v: Value) {
        self.values.push(v);
    }

    fn pop_value(&mut self) -> Value {
        match self.values.pop() {
            Some(v) => v,
            None => unreachable!(),
        }
    }

    /// Opens a context ending `len` bytes from here; it must fit inside
    /// the current one.
    fn push_limit(&mut self, len: u64) -> Result<(), ReadError> {
        if let Some(&end) = self.limits.last() {
            if self.pos + len > end {
                return Err(ReadError::NotEnoughData);
            }
        }
        self.limits.push(self.pos + len);
        Ok(())
    }

    fn exec(&mut self, op: Op) -> Result<Option<Op>, ReadError> {
        match op {
            Op::Read(e) => self.exec_read(e),
            Op::Inject(inject) => {
                let v = self.pop_value();
                self.push_value((inject)(v));
                Ok(None)
            },
            Op::Pair => {
                let right = self.pop_value();
                let left = self.pop_value();
                self.push_value(Value::Tuple(vec![left, right]));
                Ok(None)
            },
            Op::WrapSome => {
                let v = self.pop_value();
                self.push_value(Value::some(v));
                Ok(None)
            },
            Op::SeqPush => {
                let v = self.pop_value();
                match self.values.last_mut() {
                    Some(&mut Value::Seq(ref mut items)) => items.push(v),
                    _ => unreachable!(),
                }
                Ok(None)
            },
            Op::SeqLoop { array, max_length, elem } => {
                if self.context_len() == 0 {
                    // The accumulated sequence is already on top.
                    return Ok(None);
                }
                if let Some(max) = max_length {
                    let len = match self.values.last() {
                        Some(&Value::Seq(ref items)) => items.len(),
                        _ => unreachable!(),
                    };
                    if len >= max {
                        return Err(if array {
                            ReadError::ArrayTooLong
                        } else {
                            ReadError::ListTooLong
                        });
                    }
                }
                self.ops.push(Op::SeqLoop {
                    array: array,
                    max_length: max_length,
                    elem: elem.clone(),
                });
                self.ops.push(Op::SeqPush);
                self.ops.push(Op::Read(elem));
                Ok(None)
            },
            Op::PopLimit => {
                let end = match self.limits.pop() {
                    Some(end) => end,
                    None => unreachable!(),
                };
                if self.pos != end {
                    return Err(ReadError::ExtraBytes);
                }
                Ok(None)
            },
            Op::Groups { signed, mut groups } => {
                loop {
                    let byte = match self.need(1)? {
                        Some(bytes) => bytes[0],
                        None => return Ok(Some(Op::Groups {
                            signed: signed,
                            groups: groups,
                        })),
                    };
                    groups.push(byte);
                    if byte & 0x80 == 0 {
                        break;
                    }
                }
                let v = if signed {
                    Value::Z(wire::z_from_groups(&groups)?)
                } else {
                    Value::N(wire::n_from_groups(&groups)?)
                };
                self.push_value(v);
                Ok(None)
            },
            Op::CheckSizeEnd { start, limit } => {
                if self.pos - start > limit as u64 {
                    return Err(ReadError::SizeLimitExceeded);
                }
                Ok(None)
            },
            Op::Skip(n) => match self.need(n)? {
                Some(_) => Ok(None),
                None => Ok(Some(Op::Skip(n))),
            },
        }
    }

    fn exec_read(&mut self, e: Arc<Encoding>)
                 -> Result<Option<Op>, ReadError> {
        match *e {
            Encoding::Null | Encoding::Empty | Encoding::Constant(_) => {
                self.push_value(Value::Unit);
                Ok(None)
            },
            Encoding::Ignore => {
                let n = self.context_len();
                need!(self, n, Op::Read(e.clone()));
                self.push_value(Value::Unit);
                Ok(None)
            },
            Encoding::Bool => {
                let bytes = need!(self, size::BOOL, Op::Read(e.clone()));
                self.push_value(Value::Bool(bytes[0] != 0));
                Ok(None)
            },
            Encoding::Int8 => {
                let bytes = need!(self, size::INT8, Op::Read(e.clone()));
                self.push_value(Value::Int(wire::get_i8(&bytes, 0) as i64));
                Ok(None)
            },
            Encoding::Uint8 => {
                let bytes = need!(self, size::INT8, Op::Read(e.clone()));
                self.push_value(Value::Int(bytes[0] as i64));
                Ok(None)
            },
            Encoding::Int16 => {
                let bytes = need!(self, size::INT16, Op::Read(e.clone()));
                self.push_value(Value::Int(wire::get_i16(&bytes, 0) as i64));
                Ok(None)
            },
            Encoding::Uint16 => {
                let bytes = need!(self, size::INT16, Op::Read(e.clone()));
                self.push_value(Value::Int(wire::get_u16(&bytes, 0) as i64));
                Ok(None)
            },
            Encoding::Int31 => {
                let bytes = need!(self, size::INT32, Op::Read(e.clone()));
                let v = wire::get_i32(&bytes, 0) as i64;
                if v < size::MIN_INT31 || v > size::MAX_INT31 {
                    return Err(ReadError::InvalidInt(
                        size::MIN_INT31, v, size::MAX_INT31));
                }
                self.push_value(Value::Int(v));
                Ok(None)
            },
            Encoding::Int32 => {
                let bytes = need!(self, size::INT32, Op::Read(e.clone()));
                self.push_value(Value::Int(wire::get_i32(&bytes, 0) as i64));
                Ok(None)
            },
            Encoding::Int64 => {
                let bytes = need!(self, size::INT64, Op::Read(e.clone()));
                self.push_value(Value::Int(wire::get_i64(&bytes, 0)));
                Ok(None)
            },
            Encoding::RangedInt { minimum, maximum } => {
                let width = size::range_width(minimum, maximum);
                let bytes = need!(self, width.bytes(), Op::Read(e.clone()));
                let raw = match width {
                    IntWidth::Int8 => wire::get_i8(&bytes, 0) as i64,
                    IntWidth::Uint8 => bytes[0] as i64,
                    IntWidth::Int16 => wire::get_i16(&bytes, 0) as i64,
                    IntWidth::Uint16 => wire::get_u16(&bytes, 0) as i64,
                    IntWidth::Int31 => wire::get_i32(&bytes, 0) as i64,
                };
                let v = if minimum > 0 { raw + minimum } else { raw };
                if v < minimum || v > maximum {
                    return Err(ReadError::InvalidInt(minimum, v, maximum));
                }
                self.push_value(Value::Int(v));
                Ok(None)
            },
            Encoding::Float => {
                let bytes = need!(self, size::FLOAT, Op::Read(e.clone()));
                self.push_value(Value::Float(wire::get_f64(&bytes, 0)));
                Ok(None)
            },
            Encoding::RangedFloat { minimum, maximum } => {
                let bytes = need!(self, size::FLOAT, Op::Read(e.clone()));
                let v = wire::get_f64(&bytes, 0);
                if v < minimum || v > maximum {
                    return Err(ReadError::InvalidFloat(minimum, v, maximum));
                }
                self.push_value(Value::Float(v));
                Ok(None)
            },
            Encoding::Z => {
                self.ops.push(Op::Groups {
                    signed: true,
                    groups: Vec::new(),
                });
                Ok(None)
            },
            Encoding::N => {
                self.ops.push(Op::Groups {
                    signed: false,
                    groups: Vec::new(),
                });
                Ok(None)
            },
            Encoding::String(kind) => {
                let n = match kind {
                    BytesKind::Fixed(n) => n,
                    BytesKind::Variable => self.context_len(),
                };
                let bytes = need!(self, n, Op::Read(e.clone()));
                match String::from_utf8(bytes) {
                    Ok(s) => {
                        self.push_value(Value::String(s));
                        Ok(None)
                    },
                    Err(_) => Err(ReadError::InvalidUtf8),
                }
            },
            Encoding::Bytes(kind) => {
                let n = match kind {
                    BytesKind::Fixed(n) => n,
                    BytesKind::Variable => self.context_len(),
                };
                let bytes = need!(self, n, Op::Read(e.clone()));
                self.push_value(Value::Bytes(bytes));
                Ok(None)
            },
            Encoding::StringEnum(ref cases) => {
                let width = size::enum_width(cases.len());
                let bytes = need!(self, width.bytes(), Op::Read(e.clone()));
                let index = match width {
                    SizeWidth::Uint8 => bytes[0] as i64,
                    SizeWidth::Uint16 => wire::get_u16(&bytes, 0) as i64,
                    SizeWidth::Uint30 => wire::get_i32(&bytes, 0) as i64,
                };
                if index < 0 {
                    return Err(ReadError::InvalidSize(index));
                }
                if index as usize >= cases.len() {
                    return Err(ReadError::UnexpectedTag(index as u32));
                }
                self.push_value(cases[index as usize].1.clone());
                Ok(None)
            },
            Encoding::Array { max_length, ref elem } => {
                self.push_value(Value::Seq(Vec::new()));
                self.ops.push(Op::SeqLoop {
                    array: true,
                    max_length: max_length,
                    elem: elem.clone(),
                });
                Ok(None)
            },
            Encoding::List { max_length, ref elem } => {
                self.push_value(Value::Seq(Vec::new()));
                self.ops.push(Op::SeqLoop {
                    array: false,
                    max_length: max_length,
                    elem: elem.clone(),
                });
                Ok(None)
            },
            Encoding::Obj(ref field) => match *field {
                Field::Req { ref encoding, .. }
                | Field::Dft { ref encoding, .. } => {
                    self.ops.push(Op::Read(encoding.clone()));
                    Ok(None)
                },
                Field::Opt { kind: Kind::Variable, ref encoding, .. } => {
                    if self.context_len() == 0 {
                        self.push_value(Value::none());
                    } else {
                        self.ops.push(Op::WrapSome);
                        self.ops.push(Op::Read(encoding.clone()));
                    }
                    Ok(None)
                },
                Field::Opt { ref encoding, .. } => {
                    let bytes = need!(self, 1, Op::Read(e.clone()));
                    if bytes[0] == 0 {
                        self.push_value(Value::none());
                    } else {
                        self.ops.push(Op::WrapSome);
                        self.ops.push(Op::Read(encoding.clone()));
                    }
                    Ok(None)
                },
            },
            Encoding::Objs { kind, ref left, ref right }
            | Encoding::Tups { kind, ref left, ref right } => {
                match kind {
                    Kind::Fixed(n) => {
                        self.push_limit(n as u64)?;
                        self.ops.push(Op::Pair);
                        self.ops.push(Op::PopLimit);
                        self.ops.push(Op::Read(right.clone()));
                        self.ops.push(Op::Read(left.clone()));
                    },
                    Kind::Dynamic => {
                        self.ops.push(Op::Pair);
                        self.ops.push(Op::Read(right.clone()));
                        self.ops.push(Op::Read(left.clone()));
                    },
                    Kind::Variable =>
                        match (classify(left), classify(right)) {
                            (Kind::Variable, Kind::Fixed(n)) => {
                                // The left half gets everything except
                                // the known tail.
                                let head = self.context_len()
                                    .checked_sub(n)
                                    .ok_or(ReadError::NotEnoughData)?;
                                self.limits.push(self.pos + head as u64);
                                self.ops.push(Op::Pair);
                                self.ops.push(Op::Read(right.clone()));
                                self.ops.push(Op::PopLimit);
                                self.ops.push(Op::Read(left.clone()));
                            },
                            (_, Kind::Variable) => {
                                self.ops.push(Op::Pair);
                                self.ops.push(Op::Read(right.clone()));
                                self.ops.push(Op::Read(left.clone()));
                            },
                            _ => unreachable!(),
                        },
                }
                Ok(None)
            },
            Encoding::Tup(ref inner) => {
                self.ops.push(Op::Read(inner.clone()));
                Ok(None)
            },
            Encoding::Union { tag_size, ref cases, .. } => {
                let bytes = need!(self, tag_size.bytes(),
                                  Op::Read(e.clone()));
                let tag = match tag_size {
                    TagSize::Uint8 => bytes[0] as u16,
                    TagSize::Uint16 => wire::get_u16(&bytes, 0),
                };
                let case = match cases.iter().find(|case| match case.tag {
                    CaseTag::Tag(t) => t == tag,
                    CaseTag::TextOnly => false,
                }) {
                    Some(case) => case,
                    None =>
                        return Err(ReadError::UnexpectedTag(tag as u32)),
                };
                if !self.checking {
                    self.ops.push(Op::Inject(case.inject.clone()));
                }
                self.ops.push(Op::Read(case.encoding.clone()));
                Ok(None)
            },
            Encoding::Mu { ref body, .. } => {
                self.ops.push(Op::Read(Arc::new((body)(&e))));
                Ok(None)
            },
            Encoding::Conv { ref inject, ref inner, .. } => {
                if !self.checking {
                    self.ops.push(Op::Inject(inject.clone()));
                }
                self.ops.push(Op::Read(inner.clone()));
                Ok(None)
            },
            Encoding::Describe { ref inner, .. }
            | Encoding::Def { ref inner, .. } => {
                self.ops.push(Op::Read(inner.clone()));
                Ok(None)
            },
            Encoding::Splitted { ref binary, .. } => {
                self.ops.push(Op::Read(binary.clone()));
                Ok(None)
            },
            Encoding::DynamicSize { width, ref inner } => {
                let bytes = need!(self, width.bytes(), Op::Read(e.clone()));
                let declared = match width {
                    SizeWidth::Uint8 => bytes[0] as i64,
                    SizeWidth::Uint16 => wire::get_u16(&bytes, 0) as i64,
                    SizeWidth::Uint30 => wire::get_i32(&bytes, 0) as i64,
                };
                if declared < 0 {
                    return Err(ReadError::InvalidSize(declared));
                }
                self.push_limit(declared as u64)?;
                self.ops.push(Op::PopLimit);
                self.ops.push(Op::Read(inner.clone()));
                Ok(None)
            },
            Encoding::CheckSize { limit, ref inner } => {
                self.ops.push(Op::CheckSizeEnd {
                    start: self.pos,
                    limit: limit,
                });
                self.ops.push(Op::Read(inner.clone()));
                Ok(None)
            },
            Encoding::Padded { ref inner, padding } => {
                self.ops.push(Op::Skip(padding));
                self.ops.push(Op::Read(inner.clone()));
                Ok(None)
            },
            Encoding::Delayed(ref body) => {
                self.ops.push(Op::Read(Arc::new((body)())));
                Ok(None)
            },
        }
    }

    fn into_remaining(mut self) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        if let Some(first) = self.chunks.pop_front() {
            if self.front < first.len() {
                out.push(first[self.front..].to_vec());
            }
        }
        out.extend(self.chunks.into_iter());
        out
    }
}

fn stream(e: &Encoding, initial: Vec<Vec<u8>>, checking: bool) -> Status {
    if classify(e).is_variable() {
        panic!("streaming requires a fixed or dynamic descriptor; wrap \
                variable descriptors in dynamic_size");
    }

    let machine = Machine {
        ops: vec![Op::Read(Arc::new(e.clone()))],
        values: Vec::new(),
        chunks: initial.into_iter().collect(),
        front: 0,
        pos: 0,
        limits: Vec::new(),
        checking: checking,
    };
    machine.run()
}

/// Incrementally parses a value of `e` from `initial` and whatever
/// chunks are later fed to the returned [`Status::Await`] suspensions.
///
/// # Panics
///
/// Panics if `e` classifies variable: without a self-delimited end the
/// parse could never know when to stop.
pub fn read_stream(e: &Encoding, initial: Vec<Vec<u8>>) -> Status {
    stream(e, initial, false)
}

/// Like [`read_stream`], but only validates structure: all conversion
/// and case injections are skipped and a successful parse carries
/// `Value::Unit`.
///
/// # Panics
///
/// Panics if `e` classifies variable.
pub fn check_stream(e: &Encoding, initial: Vec<Vec<u8>>) -> Status {
    stream(e, initial, true)
}
