//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The descriptor algebra and the constructors that build it.
//!
//! A descriptor is assembled by composing the constructors in this module;
//! nothing else about it is ever mutated, and the same tree then drives
//! length computation, writing, one-shot reading and incremental reading.
//! Every constructor validates its arguments immediately, so a descriptor
//! that exists is well-formed: compositions that no parser could delimit
//! are impossible to build.
//!
//! Constructors panic on misuse. Building a descriptor is a static,
//! program-shaped activity akin to declaring a type, and an ill-formed
//! composition is a bug in the calling program, not a condition to handle
//! at run time.

use std::fmt;
use std::sync::Arc;

use kind::{self, classify, Kind};
use size::{SizeWidth, TagSize, MAX_INT31, MIN_INT31};
use value::Value;

/// Projection from a host value to the value an inner descriptor
/// serializes.
pub type ProjectFn = dyn Fn(&Value) -> Value + Send + Sync;
/// Injection from an inner descriptor's value back to the host value.
pub type InjectFn = dyn Fn(Value) -> Value + Send + Sync;
/// Selection of a union case: yields the case payload when the value
/// belongs to the case.
pub type CaseProjectFn = dyn Fn(&Value) -> Option<Value> + Send + Sync;
/// Body of a recursive descriptor; receives the descriptor itself.
pub type MuBodyFn = dyn Fn(&Encoding) -> Encoding + Send + Sync;
/// Deferred construction of a descriptor, evaluated on use.
pub type DelayedFn = dyn Fn() -> Encoding + Send + Sync;

/// Length discipline of a string or byte-sequence descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BytesKind {
    /// Exactly this many bytes, known from the descriptor alone.
    Fixed(usize),
    /// However many bytes the enclosing context still holds.
    Variable,
}

/// How a union case participates in the binary format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CaseTag {
    /// A numeric tag written before the case payload.
    Tag(u16),
    /// A case that only exists in the structured-text rendering; it is
    /// skipped when writing binary and never matched when reading it.
    TextOnly,
}

/// One alternative of a union descriptor.
#[derive(Clone)]
pub struct Case {
    pub(crate) name: Option<String>,
    pub(crate) tag: CaseTag,
    pub(crate) encoding: Arc<Encoding>,
    pub(crate) project: Arc<CaseProjectFn>,
    pub(crate) inject: Arc<InjectFn>,
}

impl fmt::Debug for Case {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Case")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("encoding", &self.encoding)
            .finish()
    }
}

/// One field of an object descriptor.
#[derive(Clone)]
pub enum Field {
    /// A field that is always present.
    Req {
        /// Name used by the structured-text rendering.
        name: String,
        /// Descriptor of the field value.
        encoding: Arc<Encoding>,
    },
    /// A field that may be absent.
    Opt {
        /// `Dynamic` fields carry a one-byte presence prefix; `Variable`
        /// fields are present exactly when the context still holds bytes.
        kind: Kind,
        /// Name used by the structured-text rendering.
        name: String,
        /// Descriptor of the field value when present.
        encoding: Arc<Encoding>,
    },
    /// A field with a default; the binary form always carries the value,
    /// the structured-text rendering may omit it.
    Dft {
        /// Name used by the structured-text rendering.
        name: String,
        /// Descriptor of the field value.
        encoding: Arc<Encoding>,
        /// Value the structured-text rendering assumes when the field is
        /// omitted.
        default: Value,
    },
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Field::Req { ref name, ref encoding } => f.debug_struct("Req")
                .field("name", name).field("encoding", encoding).finish(),
            Field::Opt { kind, ref name, ref encoding } =>
                f.debug_struct("Opt").field("kind", &kind)
                .field("name", name).field("encoding", encoding).finish(),
            Field::Dft { ref name, ref encoding, ref default } =>
                f.debug_struct("Dft").field("name", name)
                .field("encoding", encoding).field("default", default)
                .finish(),
        }
    }
}

/// A typed descriptor of both a binary wire format and a structured-text
/// rendering for one shape of [`Value`].
///
/// The binary format is tagless: no variant below writes any type
/// information of its own, so the reader must hold the same descriptor
/// the writer used. The only bytes beyond raw payloads are the tags of
/// `Union`, the presence prefix of optional fields, and the length
/// prefixes of `DynamicSize`.
#[derive(Clone)]
pub enum Encoding {
    /// The unit value; zero bytes.
    Null,
    /// The unit value; zero bytes. Distinguished from `Null` only in the
    /// structured-text rendering.
    Empty,
    /// The unit value; consumes and discards the remainder of the
    /// enclosing context.
    Ignore,
    /// The unit value plus a fixed label for the structured-text
    /// rendering; zero bytes.
    Constant(String),
    /// One byte: zero is false, anything else is true.
    Bool,
    /// One signed byte.
    Int8,
    /// One unsigned byte.
    Uint8,
    /// Two-byte big-endian signed integer.
    Int16,
    /// Two-byte big-endian unsigned integer.
    Uint16,
    /// A signed integer within the 31-bit range, written as four
    /// big-endian bytes.
    Int31,
    /// Four-byte big-endian signed integer.
    Int32,
    /// Eight-byte big-endian signed integer.
    Int64,
    /// An integer restricted to an inclusive range, written in the
    /// narrowest width spanning it (offset by the minimum when the whole
    /// range is positive).
    RangedInt {
        /// Smallest allowed value.
        minimum: i64,
        /// Largest allowed value.
        maximum: i64,
    },
    /// IEEE-754 binary64, eight big-endian bytes.
    Float,
    /// A float restricted to an inclusive range.
    RangedFloat {
        /// Smallest allowed value.
        minimum: f64,
        /// Largest allowed value.
        maximum: f64,
    },
    /// Arbitrary-precision signed integer in 7-bit continuation groups.
    Z,
    /// Arbitrary-precision non-negative integer in 7-bit continuation
    /// groups.
    N,
    /// A UTF-8 string, written as its raw bytes.
    String(BytesKind),
    /// A raw byte sequence.
    Bytes(BytesKind),
    /// A value drawn from a closed set, written as its index in the
    /// narrowest width addressing the set.
    StringEnum(Arc<Vec<(String, Value)>>),
    /// A homogeneous sequence rendered as an array; elements are written
    /// back to back with no count.
    Array {
        /// Largest accepted element count.
        max_length: Option<usize>,
        /// Descriptor of each element.
        elem: Arc<Encoding>,
    },
    /// A homogeneous sequence rendered as a list; elements are written
    /// back to back with no count.
    List {
        /// Largest accepted element count.
        max_length: Option<usize>,
        /// Descriptor of each element.
        elem: Arc<Encoding>,
    },
    /// A single named field.
    Obj(Field),
    /// Two object-shaped descriptors composed left then right.
    Objs {
        /// Combined kind, computed at construction.
        kind: Kind,
        /// Left half, written first.
        left: Arc<Encoding>,
        /// Right half, written second.
        right: Arc<Encoding>,
    },
    /// A single-component tuple.
    Tup(Arc<Encoding>),
    /// Two tuple-shaped descriptors composed left then right.
    Tups {
        /// Combined kind, computed at construction.
        kind: Kind,
        /// Left half, written first.
        left: Arc<Encoding>,
        /// Right half, written second.
        right: Arc<Encoding>,
    },
    /// A tagged sum: the matching case's tag, then its payload.
    Union {
        /// Merged kind of the tagged cases, computed at construction.
        kind: Kind,
        /// Width of the tag prefix.
        tag_size: TagSize,
        /// The alternatives, tried in order.
        cases: Arc<Vec<Case>>,
    },
    /// A recursive descriptor; the body function receives the descriptor
    /// itself.
    Mu {
        /// Kind settled by two-pass classification at construction.
        kind: Kind,
        /// Name used by the structured-text rendering.
        name: String,
        /// Builds the body on each use.
        body: Arc<MuBodyFn>,
    },
    /// An isomorphism between the host value shape and the inner
    /// descriptor's shape.
    Conv {
        /// Maps host values to inner values for measuring and writing.
        project: Arc<ProjectFn>,
        /// Maps inner values back to host values after reading.
        inject: Arc<InjectFn>,
        /// The descriptor doing the actual serialization.
        inner: Arc<Encoding>,
    },
    /// Documentation attached to a descriptor; no binary effect.
    Describe {
        /// Short title.
        title: Option<String>,
        /// Longer description.
        description: Option<String>,
        /// The described descriptor.
        inner: Arc<Encoding>,
    },
    /// A schema-level name for a descriptor; no binary effect.
    Def {
        /// The definition name.
        name: String,
        /// The named descriptor.
        inner: Arc<Encoding>,
    },
    /// Distinct descriptors for the binary and structured-text forms.
    Splitted {
        /// Descriptor used for bytes.
        binary: Arc<Encoding>,
        /// Descriptor used for the structured-text rendering.
        text: Arc<Encoding>,
        /// Whether both halves are object-shaped.
        obj_shaped: bool,
        /// Whether both halves are tuple-shaped.
        tup_shaped: bool,
    },
    /// The inner descriptor prefixed with its own byte length.
    DynamicSize {
        /// Width of the length prefix.
        width: SizeWidth,
        /// The delimited descriptor.
        inner: Arc<Encoding>,
    },
    /// Refuses values whose serialized form exceeds a byte limit.
    CheckSize {
        /// Largest allowed serialized length.
        limit: usize,
        /// The guarded descriptor.
        inner: Arc<Encoding>,
    },
    /// The inner descriptor followed by zero padding.
    Padded {
        /// The padded descriptor; must be fixed-length.
        inner: Arc<Encoding>,
        /// Number of zero bytes appended.
        padding: usize,
    },
    /// A descriptor built on first use.
    Delayed(Arc<DelayedFn>),
}

impl fmt::Debug for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Encoding::Null => f.write_str("Null"),
            Encoding::Empty => f.write_str("Empty"),
            Encoding::Ignore => f.write_str("Ignore"),
            Encoding::Constant(ref s) =>
                f.debug_tuple("Constant").field(s).finish(),
            Encoding::Bool => f.write_str("Bool"),
            Encoding::Int8 => f.write_str("Int8"),
            Encoding::Uint8 => f.write_str("Uint8"),
            Encoding::Int16 => f.write_str("Int16"),
            Encoding::Uint16 => f.write_str("Uint16"),
            Encoding::Int31 => f.write_str("Int31"),
            Encoding::Int32 => f.write_str("Int32"),
            Encoding::Int64 => f.write_str("Int64"),
            Encoding::RangedInt { minimum, maximum } =>
                write!(f, "RangedInt({}, {})", minimum, maximum),
            Encoding::Float => f.write_str("Float"),
            Encoding::RangedFloat { minimum, maximum } =>
                write!(f, "RangedFloat({}, {})", minimum, maximum),
            Encoding::Z => f.write_str("Z"),
            Encoding::N => f.write_str("N"),
            Encoding::String(kind) =>
                f.debug_tuple("String").field(&kind).finish(),
            Encoding::Bytes(kind) =>
                f.debug_tuple("Bytes").field(&kind).finish(),
            Encoding::StringEnum(ref cases) => {
                let labels: Vec<&str> =
                    cases.iter().map(|&(ref l, _)| &l[..]).collect();
                f.debug_tuple("StringEnum").field(&labels).finish()
            },
            Encoding::Array { ref elem, .. } =>
                f.debug_tuple("Array").field(elem).finish(),
            Encoding::List { ref elem, .. } =>
                f.debug_tuple("List").field(elem).finish(),
            Encoding::Obj(ref field) =>
                f.debug_tuple("Obj").field(field).finish(),
            Encoding::Objs { ref left, ref right, .. } =>
                f.debug_tuple("Objs").field(left).field(right).finish(),
            Encoding::Tup(ref inner) =>
                f.debug_tuple("Tup").field(inner).finish(),
            Encoding::Tups { ref left, ref right, .. } =>
                f.debug_tuple("Tups").field(left).field(right).finish(),
            Encoding::Union { ref cases, .. } =>
                f.debug_tuple("Union").field(cases).finish(),
            Encoding::Mu { ref name, .. } =>
                write!(f, "Mu({:?})", name),
            Encoding::Conv { ref inner, .. } =>
                f.debug_tuple("Conv").field(inner).finish(),
            Encoding::Describe { ref inner, .. } =>
                f.debug_tuple("Describe").field(inner).finish(),
            Encoding::Def { ref name, ref inner } =>
                f.debug_tuple("Def").field(name).field(inner).finish(),
            Encoding::Splitted { ref binary, .. } =>
                f.debug_tuple("Splitted").field(binary).finish(),
            Encoding::DynamicSize { width, ref inner } =>
                f.debug_tuple("DynamicSize").field(&width).field(inner)
                .finish(),
            Encoding::CheckSize { limit, ref inner } =>
                f.debug_tuple("CheckSize").field(&limit).field(inner)
                .finish(),
            Encoding::Padded { ref inner, padding } =>
                f.debug_tuple("Padded").field(inner).field(&padding)
                .finish(),
            Encoding::Delayed(_) => f.write_str("Delayed(<fun>)"),
        }
    }
}

/// The unit descriptor; writes nothing.
pub fn null() -> Encoding {
    Encoding::Null
}

/// The unit descriptor rendered as an empty object; writes nothing.
pub fn empty() -> Encoding {
    Encoding::Empty
}

/// The unit descriptor that consumes and discards the remainder of the
/// enclosing context on read.
pub fn ignore() -> Encoding {
    Encoding::Ignore
}

/// The unit descriptor rendered as the given label; writes nothing.
pub fn constant(label: &str) -> Encoding {
    Encoding::Constant(label.to_owned())
}

/// A one-byte boolean.
pub fn boolean() -> Encoding {
    Encoding::Bool
}

/// A signed byte.
pub fn int8() -> Encoding {
    Encoding::Int8
}

/// An unsigned byte.
pub fn uint8() -> Encoding {
    Encoding::Uint8
}

/// A two-byte big-endian signed integer.
pub fn int16() -> Encoding {
    Encoding::Int16
}

/// A two-byte big-endian unsigned integer.
pub fn uint16() -> Encoding {
    Encoding::Uint16
}

/// A signed integer within the 31-bit range, written as four big-endian
/// bytes.
pub fn int31() -> Encoding {
    Encoding::Int31
}

/// A four-byte big-endian signed integer.
pub fn int32() -> Encoding {
    Encoding::Int32
}

/// An eight-byte big-endian signed integer.
pub fn int64() -> Encoding {
    Encoding::Int64
}

/// An integer restricted to `a..=b` (in either order), written in the
/// narrowest width spanning the range.
///
/// # Panics
///
/// Panics if either bound falls outside the 31-bit range.
pub fn ranged_int(a: i64, b: i64) -> Encoding {
    let (minimum, maximum) = if a <= b { (a, b) } else { (b, a) };
    if minimum < MIN_INT31 || maximum > MAX_INT31 {
        panic!("ranged_int bounds [{}, {}] exceed the 31-bit range",
               minimum, maximum);
    }
    Encoding::RangedInt { minimum: minimum, maximum: maximum }
}

/// An IEEE-754 binary64 float.
pub fn float() -> Encoding {
    Encoding::Float
}

/// A float restricted to `a..=b` (in either order).
pub fn ranged_float(a: f64, b: f64) -> Encoding {
    let (minimum, maximum) = if a <= b { (a, b) } else { (b, a) };
    Encoding::RangedFloat { minimum: minimum, maximum: maximum }
}

/// An arbitrary-precision signed integer.
pub fn z() -> Encoding {
    Encoding::Z
}

/// An arbitrary-precision non-negative integer.
pub fn n() -> Encoding {
    Encoding::N
}

/// A string of exactly `length` bytes.
pub fn fixed_string(length: usize) -> Encoding {
    Encoding::String(BytesKind::Fixed(length))
}

/// A string spanning the remainder of the enclosing context.
pub fn variable_string() -> Encoding {
    Encoding::String(BytesKind::Variable)
}

/// A string prefixed with its own length; usable anywhere.
pub fn string() -> Encoding {
    dynamic_size(variable_string())
}

/// A byte sequence of exactly `length` bytes.
pub fn fixed_bytes(length: usize) -> Encoding {
    Encoding::Bytes(BytesKind::Fixed(length))
}

/// A byte sequence spanning the remainder of the enclosing context.
pub fn variable_bytes() -> Encoding {
    Encoding::Bytes(BytesKind::Variable)
}

/// A byte sequence prefixed with its own length; usable anywhere.
pub fn bytes() -> Encoding {
    dynamic_size(variable_bytes())
}

/// A value from a closed set, written as its index.
///
/// # Panics
///
/// Panics on fewer than two cases.
pub fn string_enum<S : Into<String>>(cases: Vec<(S, Value)>) -> Encoding {
    if cases.len() < 2 {
        panic!("string_enum requires at least two cases");
    }
    Encoding::StringEnum(Arc::new(
        cases.into_iter().map(|(label, v)| (label.into(), v)).collect()))
}

fn check_element(what: &str, elem: &Encoding) {
    match classify(elem) {
        Kind::Variable => panic!(
            "{} elements may not be variable; wrap them in dynamic_size",
            what),
        Kind::Fixed(0) => panic!(
            "{} elements may not serialize to zero bytes", what),
        _ => (),
    }
}

/// A sequence rendered as an array.
///
/// # Panics
///
/// Panics if the element descriptor is variable or zero-length.
pub fn array(elem: Encoding) -> Encoding {
    check_element("array", &elem);
    Encoding::Array { max_length: None, elem: Arc::new(elem) }
}

/// An [`array`] refusing more than `max_length` elements.
pub fn bounded_array(max_length: usize, elem: Encoding) -> Encoding {
    check_element("array", &elem);
    Encoding::Array { max_length: Some(max_length), elem: Arc::new(elem) }
}

/// A sequence rendered as a list.
///
/// # Panics
///
/// Panics if the element descriptor is variable or zero-length.
pub fn list(elem: Encoding) -> Encoding {
    check_element("list", &elem);
    Encoding::List { max_length: None, elem: Arc::new(elem) }
}

/// A [`list`] refusing more than `max_length` elements.
pub fn bounded_list(max_length: usize, elem: Encoding) -> Encoding {
    check_element("list", &elem);
    Encoding::List { max_length: Some(max_length), elem: Arc::new(elem) }
}

/// A field that is always present.
pub fn req(name: &str, encoding: Encoding) -> Field {
    Field::Req { name: name.to_owned(), encoding: Arc::new(encoding) }
}

/// A field that may be absent.
///
/// Unless the field descriptor is variable, presence costs one prefix
/// byte; a variable optional field is present exactly when the context
/// still holds bytes.
pub fn opt(name: &str, encoding: Encoding) -> Field {
    let kind = match classify(&encoding) {
        Kind::Variable => Kind::Variable,
        _ => Kind::Dynamic,
    };
    Field::Opt {
        kind: kind,
        name: name.to_owned(),
        encoding: Arc::new(encoding),
    }
}

/// A field carrying `default` when the structured-text rendering omits
/// it. The binary form always carries the value.
pub fn dft(name: &str, encoding: Encoding, default: Value) -> Field {
    Field::Dft {
        name: name.to_owned(),
        encoding: Arc::new(encoding),
        default: default,
    }
}

/// Whether a descriptor is object-shaped, i.e. acceptable to
/// [`merge_objs`].
pub fn is_obj(e: &Encoding) -> bool {
    match *e {
        Encoding::Obj(_) | Encoding::Objs { .. }
        | Encoding::Empty | Encoding::Ignore => true,
        Encoding::Conv { ref inner, .. }
        | Encoding::Describe { ref inner, .. }
        | Encoding::Def { ref inner, .. }
        | Encoding::DynamicSize { ref inner, .. } => is_obj(inner),
        Encoding::Mu { ref body, .. } => is_obj(&(body)(e)),
        Encoding::Splitted { obj_shaped, .. } => obj_shaped,
        Encoding::Union { ref cases, .. } =>
            cases.iter().all(|case| is_obj(&case.encoding)),
        _ => false,
    }
}

/// Whether a descriptor is tuple-shaped, i.e. acceptable to
/// [`merge_tups`].
pub fn is_tup(e: &Encoding) -> bool {
    match *e {
        Encoding::Tup(_) | Encoding::Tups { .. } => true,
        Encoding::Conv { ref inner, .. }
        | Encoding::Describe { ref inner, .. }
        | Encoding::Def { ref inner, .. }
        | Encoding::DynamicSize { ref inner, .. } => is_tup(inner),
        Encoding::Mu { ref body, .. } => is_tup(&(body)(e)),
        Encoding::Splitted { tup_shaped, .. } => tup_shaped,
        Encoding::Union { ref cases, .. } =>
            cases.iter().all(|case| is_tup(&case.encoding)),
        _ => false,
    }
}

/// A single-field object.
pub fn obj1(field: Field) -> Encoding {
    Encoding::Obj(field)
}

/// A single-component tuple.
pub fn tup1(component: Encoding) -> Encoding {
    Encoding::Tup(Arc::new(component))
}

/// Composes two object-shaped descriptors; the host value pairs their
/// values.
///
/// # Panics
///
/// Panics if either side is not object-shaped, or if the two kinds cannot
/// be composed (two variable halves, or a variable half followed by a
/// dynamic one).
pub fn merge_objs(left: Encoding, right: Encoding) -> Encoding {
    if !is_obj(&left) || !is_obj(&right) {
        panic!("merge_objs requires object-shaped descriptors");
    }
    let kind = kind::combine("merge_objs", classify(&left),
                             classify(&right));
    Encoding::Objs {
        kind: kind,
        left: Arc::new(left),
        right: Arc::new(right),
    }
}

/// Composes two tuple-shaped descriptors; the host value pairs their
/// values.
///
/// # Panics
///
/// Panics if either side is not tuple-shaped, or if the two kinds cannot
/// be composed.
pub fn merge_tups(left: Encoding, right: Encoding) -> Encoding {
    if !is_tup(&left) || !is_tup(&right) {
        panic!("merge_tups requires tuple-shaped descriptors");
    }
    let kind = kind::combine("merge_tups", classify(&left),
                             classify(&right));
    Encoding::Tups {
        kind: kind,
        left: Arc::new(left),
        right: Arc::new(right),
    }
}

/// Rebuilds the left-nested pair tree a fold of `merge_objs` or
/// `merge_tups` serializes from the flat component list.
fn nest(items: &[Value]) -> Value {
    let mut iter = items.iter().cloned();
    let mut acc = match iter.next() {
        Some(v) => v,
        None => return Value::Tuple(vec![]),
    };
    for v in iter {
        acc = Value::Tuple(vec![acc, v]);
    }
    acc
}

/// Flattens a left-nested pair tree of `count` components back into the
/// component list.
fn unnest(v: Value, count: usize) -> Vec<Value> {
    if count <= 1 {
        return vec![v];
    }
    let mut pair = match v {
        Value::Tuple(items) => items,
        other => panic!(
            "value does not match encoding: expected a pair, got {:?}",
            other),
    };
    if pair.len() != 2 {
        panic!("value does not match encoding: expected a pair of values, \
                got a tuple of {}", pair.len());
    }
    let right = match pair.pop() {
        Some(v) => v,
        None => unreachable!(),
    };
    let left = match pair.pop() {
        Some(v) => v,
        None => unreachable!(),
    };
    let mut items = unnest(left, count - 1);
    items.push(right);
    items
}

fn fold_parts(parts: Vec<Encoding>, objs: bool) -> Encoding {
    let count = parts.len();
    let mut acc: Option<Encoding> = None;
    for part in parts {
        acc = Some(match acc {
            None => part,
            Some(left) => if objs {
                merge_objs(left, part)
            } else {
                merge_tups(left, part)
            },
        });
    }
    let folded = match acc {
        Some(e) => e,
        None => unreachable!(),
    };

    // Two components already pair up flat; deeper folds nest to the left,
    // so expose the flat tuple through a conversion.
    if count <= 2 {
        folded
    } else {
        conv(move |v: &Value| nest(v.to_tuple()),
             move |v: Value| Value::Tuple(unnest(v, count)),
             folded)
    }
}

macro_rules! define_objs {
    ($(#[$doc:meta])* $name:ident, $($field:ident),*) => {
        $(#[$doc])*
        ///
        /// The host value is a flat tuple of the field values.
        ///
        /// # Panics
        ///
        /// Panics if the field kinds cannot be composed.
        pub fn $name($($field: Field),*) -> Encoding {
            fold_parts(vec![$(obj1($field)),*], true)
        }
    }
}

macro_rules! define_tups {
    ($(#[$doc:meta])* $name:ident, $($component:ident),*) => {
        $(#[$doc])*
        ///
        /// The host value is a flat tuple of the component values.
        ///
        /// # Panics
        ///
        /// Panics if the component kinds cannot be composed.
        pub fn $name($($component: Encoding),*) -> Encoding {
            fold_parts(vec![$(tup1($component)),*], false)
        }
    }
}

define_objs! {
    /// An object of two fields.
    obj2, f1, f2
}
define_objs! {
    /// An object of three fields.
    obj3, f1, f2, f3
}
define_objs! {
    /// An object of four fields.
    obj4, f1, f2, f3, f4
}
define_objs! {
    /// An object of five fields.
    obj5, f1, f2, f3, f4, f5
}
define_objs! {
    /// An object of six fields.
    obj6, f1, f2, f3, f4, f5, f6
}
define_objs! {
    /// An object of seven fields.
    obj7, f1, f2, f3, f4, f5, f6, f7
}
define_objs! {
    /// An object of eight fields.
    obj8, f1, f2, f3, f4, f5, f6, f7, f8
}
define_objs! {
    /// An object of nine fields.
    obj9, f1, f2, f3, f4, f5, f6, f7, f8, f9
}
define_objs! {
    /// An object of ten fields.
    obj10, f1, f2, f3, f4, f5, f6, f7, f8, f9, f10
}

define_tups! {
    /// A tuple of two components.
    tup2, c1, c2
}
define_tups! {
    /// A tuple of three components.
    tup3, c1, c2, c3
}
define_tups! {
    /// A tuple of four components.
    tup4, c1, c2, c3, c4
}
define_tups! {
    /// A tuple of five components.
    tup5, c1, c2, c3, c4, c5
}
define_tups! {
    /// A tuple of six components.
    tup6, c1, c2, c3, c4, c5, c6
}
define_tups! {
    /// A tuple of seven components.
    tup7, c1, c2, c3, c4, c5, c6, c7
}
define_tups! {
    /// A tuple of eight components.
    tup8, c1, c2, c3, c4, c5, c6, c7, c8
}
define_tups! {
    /// A tuple of nine components.
    tup9, c1, c2, c3, c4, c5, c6, c7, c8, c9
}
define_tups! {
    /// A tuple of ten components.
    tup10, c1, c2, c3, c4, c5, c6, c7, c8, c9, c10
}

/// One alternative of a [`union`].
///
/// `project` recognises host values belonging to this case and yields the
/// payload the case descriptor serializes; `inject` rebuilds the host
/// value from a decoded payload.
pub fn case<P, I>(tag: CaseTag, name: Option<&str>, encoding: Encoding,
                  project: P, inject: I) -> Case
where P : Fn(&Value) -> Option<Value> + Send + Sync + 'static,
      I : Fn(Value) -> Value + Send + Sync + 'static {
    Case {
        name: name.map(|n| n.to_owned()),
        tag: tag,
        encoding: Arc::new(encoding),
        project: Arc::new(project),
        inject: Arc::new(inject),
    }
}

/// A tagged sum of the given cases, tried in order.
///
/// # Panics
///
/// Panics on an empty case list, a tag too large for `tag_size`, or two
/// cases carrying the same tag.
pub fn union(tag_size: TagSize, cases: Vec<Case>) -> Encoding {
    if cases.is_empty() {
        panic!("union requires at least one case");
    }

    let mut seen = Vec::new();
    let mut kinds = Vec::new();
    for case in &cases {
        match case.tag {
            CaseTag::Tag(tag) => {
                if tag > tag_size.max_tag() {
                    panic!("tag {} does not fit a {:?} tag prefix",
                           tag, tag_size);
                }
                if seen.contains(&tag) {
                    panic!("duplicated tag {}", tag);
                }
                seen.push(tag);
                kinds.push(classify(&case.encoding));
            },
            CaseTag::TextOnly => (),
        }
    }

    let kind = kind::merge_cases(tag_size, &kinds);
    Encoding::Union {
        kind: kind,
        tag_size: tag_size,
        cases: Arc::new(cases),
    }
}

/// A recursive descriptor: `body` receives the descriptor itself and
/// returns the unrolled form.
///
/// Classification runs twice if needed: the descriptor is first assumed
/// dynamic, and if the body then classifies variable the assumption is
/// switched and the body re-validated.
pub fn mu<F>(name: &str, body: F) -> Encoding
where F : Fn(&Encoding) -> Encoding + Send + Sync + 'static {
    let body: Arc<MuBodyFn> = Arc::new(body);

    let probe = Encoding::Mu {
        kind: Kind::Dynamic,
        name: name.to_owned(),
        body: body.clone(),
    };
    let kind = match classify(&(body)(&probe)) {
        Kind::Fixed(_) | Kind::Dynamic => Kind::Dynamic,
        Kind::Variable => {
            let probe = Encoding::Mu {
                kind: Kind::Variable,
                name: name.to_owned(),
                body: body.clone(),
            };
            let _ = (body)(&probe);
            Kind::Variable
        },
    };

    Encoding::Mu { kind: kind, name: name.to_owned(), body: body }
}

/// Maps the host value shape onto an inner descriptor.
pub fn conv<P, I>(project: P, inject: I, inner: Encoding) -> Encoding
where P : Fn(&Value) -> Value + Send + Sync + 'static,
      I : Fn(Value) -> Value + Send + Sync + 'static {
    Encoding::Conv {
        project: Arc::new(project),
        inject: Arc::new(inject),
        inner: Arc::new(inner),
    }
}

/// Attaches a title and description; no binary effect.
pub fn describe(title: Option<&str>, description: Option<&str>,
                inner: Encoding) -> Encoding {
    Encoding::Describe {
        title: title.map(|s| s.to_owned()),
        description: description.map(|s| s.to_owned()),
        inner: Arc::new(inner),
    }
}

/// Attaches a schema-level definition name; no binary effect.
pub fn def(name: &str, inner: Encoding) -> Encoding {
    Encoding::Def { name: name.to_owned(), inner: Arc::new(inner) }
}

/// Uses different descriptors for the binary and structured-text forms.
pub fn splitted(binary: Encoding, text: Encoding) -> Encoding {
    let obj_shaped = is_obj(&binary) && is_obj(&text);
    let tup_shaped = is_tup(&binary) && is_tup(&text);
    Encoding::Splitted {
        binary: Arc::new(binary),
        text: Arc::new(text),
        obj_shaped: obj_shaped,
        tup_shaped: tup_shaped,
    }
}

/// Prefixes `inner` with its byte length in the default four-byte width.
pub fn dynamic_size(inner: Encoding) -> Encoding {
    dynamic_size_with(SizeWidth::Uint30, inner)
}

/// Prefixes `inner` with its byte length in the chosen width.
pub fn dynamic_size_with(width: SizeWidth, inner: Encoding) -> Encoding {
    Encoding::DynamicSize { width: width, inner: Arc::new(inner) }
}

/// Refuses to write or read values of `inner` longer than `limit` bytes.
///
/// # Panics
///
/// Panics if `inner` is fixed-length and already longer than `limit`.
pub fn check_size(limit: usize, inner: Encoding) -> Encoding {
    if let Kind::Fixed(n) = classify(&inner) {
        if n > limit {
            panic!("check_size limit {} below the fixed length {}",
                   limit, n);
        }
    }
    Encoding::CheckSize { limit: limit, inner: Arc::new(inner) }
}

/// Appends `padding` zero bytes after `inner`.
///
/// # Panics
///
/// Panics if `inner` is not fixed-length.
pub fn padded(inner: Encoding, padding: usize) -> Encoding {
    match classify(&inner) {
        Kind::Fixed(_) => (),
        _ => panic!("padded requires a fixed-length inner encoding"),
    }
    Encoding::Padded { inner: Arc::new(inner), padding: padding }
}

/// Builds the descriptor on each use.
pub fn delayed<F>(body: F) -> Encoding
where F : Fn() -> Encoding + Send + Sync + 'static {
    Encoding::Delayed(Arc::new(body))
}

#[cfg(test)]
mod test {
    use kind::{classify, Kind};
    use size::TagSize;
    use value::Value;

    use super::*;

    fn plain_case(tag: u16, e: Encoding) -> Case {
        case(CaseTag::Tag(tag), None, e, |v| Some(v.clone()), |v| v)
    }

    #[test]
    fn obj_and_tup_shapes() {
        assert!(is_obj(&empty()));
        assert!(is_obj(&obj1(req("a", uint8()))));
        assert!(is_obj(&obj2(req("a", uint8()), req("b", uint8()))));
        assert!(is_obj(&dynamic_size(obj1(req("a", variable_string())))));
        assert!(!is_obj(&uint8()));
        assert!(!is_obj(&tup2(uint8(), uint8())));

        assert!(is_tup(&tup1(uint8())));
        assert!(is_tup(&tup3(uint8(), uint8(), uint8())));
        assert!(!is_tup(&uint8()));
        assert!(!is_tup(&obj1(req("a", uint8()))));
    }

    #[test]
    fn union_of_objects_is_an_object() {
        let u = union(TagSize::Uint8, vec![
            plain_case(0, obj1(req("a", uint8()))),
            plain_case(1, empty()),
        ]);
        assert!(is_obj(&u));
        let _ = merge_objs(u, obj1(req("b", uint8())));
    }

    #[test]
    fn optional_field_kinds() {
        assert_eq!(Kind::Dynamic, classify(&obj1(opt("a", uint8()))));
        assert_eq!(Kind::Variable,
                   classify(&obj1(opt("a", variable_string()))));
    }

    #[test]
    fn mu_kinds_settle_in_two_passes() {
        let spine = mu("ints", |rec| union(TagSize::Uint8, vec![
            plain_case(0, null()),
            plain_case(1, tup2(uint8(), dynamic_size(rec.clone()))),
        ]));
        assert_eq!(Kind::Dynamic, classify(&spine));

        let open_tail = mu("tail", |rec| union(TagSize::Uint8, vec![
            plain_case(0, null()),
            plain_case(1, tup2(uint8(), dynamic_size(rec.clone()))),
            plain_case(2, variable_bytes()),
        ]));
        assert_eq!(Kind::Variable, classify(&open_tail));
    }

    #[test]
    fn ranged_int_swaps_reversed_bounds() {
        assert_eq!(classify(&ranged_int(10, -5)),
                   classify(&ranged_int(-5, 10)));
    }

    #[test]
    #[should_panic(expected = "exceed the 31-bit range")]
    fn ranged_int_rejects_wide_bounds() {
        ranged_int(0, 1 << 30);
    }

    #[test]
    #[should_panic(expected = "at least two cases")]
    fn string_enum_rejects_singletons() {
        string_enum(vec![("only", Value::Int(0))]);
    }

    #[test]
    #[should_panic(expected = "cannot compose two variable descriptors")]
    fn two_variable_fields_are_rejected() {
        obj2(req("a", variable_string()), req("b", variable_string()));
    }

    #[test]
    #[should_panic(expected = "a variable left half")]
    fn variable_then_dynamic_is_rejected() {
        tup2(variable_string(), z());
    }

    #[test]
    #[should_panic(expected = "requires object-shaped")]
    fn merge_objs_rejects_bare_values() {
        merge_objs(uint8(), obj1(req("a", uint8())));
    }

    #[test]
    #[should_panic(expected = "requires tuple-shaped")]
    fn merge_tups_rejects_objects() {
        merge_tups(tup1(uint8()), obj1(req("a", uint8())));
    }

    #[test]
    #[should_panic(expected = "duplicated tag 5")]
    fn unions_reject_duplicate_tags() {
        union(TagSize::Uint8, vec![
            plain_case(5, uint8()),
            plain_case(5, int16()),
        ]);
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn unions_reject_oversized_tags() {
        union(TagSize::Uint8, vec![plain_case(256, uint8())]);
    }

    #[test]
    #[should_panic(expected = "at least one case")]
    fn unions_reject_empty_case_lists() {
        union(TagSize::Uint8, vec![]);
    }

    #[test]
    #[should_panic(expected = "may not be variable")]
    fn lists_reject_variable_elements() {
        list(variable_string());
    }

    #[test]
    #[should_panic(expected = "zero bytes")]
    fn lists_reject_zero_length_elements() {
        list(null());
    }

    #[test]
    #[should_panic(expected = "requires a fixed-length inner")]
    fn padded_rejects_dynamic_payloads() {
        padded(z(), 2);
    }

    #[test]
    #[should_panic(expected = "below the fixed length")]
    fn check_size_rejects_impossible_limits() {
        check_size(2, int32());
    }
}
