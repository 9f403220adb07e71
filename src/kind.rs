//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Classification of descriptors by the self-delimitation of their binary
//! form.
//!
//! The classification is the single source of truth consulted by the
//! composite constructors, the length calculator, both readers, and the
//! streaming entry points. Illegal compositions are rejected while the
//! descriptor is being built, never during interpretation.

use encoding::{BytesKind, Encoding, Field};
use size::{self, TagSize};

/// How the binary form of a descriptor is delimited.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    /// The serialized length is the same for every value.
    Fixed(usize),
    /// The length varies with the value but the bytes delimit themselves.
    Dynamic,
    /// The length varies with the value and an enclosing context must
    /// bound it.
    Variable,
}

impl Kind {
    /// Whether this kind needs an outer bound to be decoded.
    pub fn is_variable(self) -> bool {
        match self {
            Kind::Variable => true,
            _ => false,
        }
    }
}

/// Combines the kinds of the two halves of an object or tuple
/// composition.
///
/// # Panics
///
/// Panics on the two compositions no parser could delimit: a variable
/// left half followed by a dynamic right half, and two variable halves.
pub(crate) fn combine(op: &str, left: Kind, right: Kind) -> Kind {
    match (left, right) {
        (Kind::Fixed(a), Kind::Fixed(b)) => Kind::Fixed(a + b),
        (Kind::Variable, Kind::Fixed(_)) => Kind::Variable,
        (Kind::Variable, Kind::Dynamic) => panic!(
            "{}: a variable left half may only be followed by a \
             fixed-length right half; wrap one side in dynamic_size", op),
        (Kind::Variable, Kind::Variable) => panic!(
            "{}: cannot compose two variable descriptors; wrap one side \
             in dynamic_size", op),
        (_, Kind::Variable) => Kind::Variable,
        _ => Kind::Dynamic,
    }
}

/// Merges the kinds of a union's tagged cases and accounts for the tag
/// prefix.
pub(crate) fn merge_cases(tag_size: TagSize, kinds: &[Kind]) -> Kind {
    let mut common_fixed = None;
    let mut all_agree = true;
    let mut any_variable = false;

    for &kind in kinds {
        match kind {
            Kind::Fixed(n) => {
                match common_fixed {
                    None => common_fixed = Some(n),
                    Some(m) if m == n => (),
                    Some(_) => all_agree = false,
                }
            },
            Kind::Dynamic => all_agree = false,
            Kind::Variable => any_variable = true,
        }
    }

    if any_variable {
        Kind::Variable
    } else if all_agree {
        match common_fixed {
            Some(n) => Kind::Fixed(n + tag_size.bytes()),
            None => Kind::Dynamic,
        }
    } else {
        Kind::Dynamic
    }
}

/// Computes the kind of any descriptor.
///
/// Composite descriptors carry the kind computed when they were built, so
/// this never revisits a whole subtree and always terminates, recursive
/// descriptors included.
pub fn classify(e: &Encoding) -> Kind {
    match *e {
        Encoding::Null | Encoding::Empty | Encoding::Constant(_) =>
            Kind::Fixed(0),
        Encoding::Ignore => Kind::Variable,
        Encoding::Bool => Kind::Fixed(size::BOOL),
        Encoding::Int8 | Encoding::Uint8 => Kind::Fixed(size::INT8),
        Encoding::Int16 | Encoding::Uint16 => Kind::Fixed(size::INT16),
        Encoding::Int31 | Encoding::Int32 => Kind::Fixed(size::INT32),
        Encoding::Int64 => Kind::Fixed(size::INT64),
        Encoding::RangedInt { minimum, maximum } =>
            Kind::Fixed(size::range_width(minimum, maximum).bytes()),
        Encoding::Float | Encoding::RangedFloat { .. } =>
            Kind::Fixed(size::FLOAT),
        Encoding::Z | Encoding::N => Kind::Dynamic,
        Encoding::String(kind) | Encoding::Bytes(kind) => match kind {
            BytesKind::Fixed(n) => Kind::Fixed(n),
            BytesKind::Variable => Kind::Variable,
        },
        Encoding::StringEnum(ref cases) =>
            Kind::Fixed(size::enum_width(cases.len()).bytes()),
        Encoding::Array { .. } | Encoding::List { .. } => Kind::Variable,
        Encoding::Obj(ref field) => match *field {
            Field::Req { ref encoding, .. } => classify(encoding),
            Field::Opt { kind, .. } => kind,
            Field::Dft { ref encoding, .. } => classify(encoding),
        },
        Encoding::Objs { kind, .. } => kind,
        Encoding::Tup(ref inner) => classify(inner),
        Encoding::Tups { kind, .. } => kind,
        Encoding::Union { kind, .. } => kind,
        Encoding::Mu { kind, .. } => kind,
        Encoding::Conv { ref inner, .. } => classify(inner),
        Encoding::Describe { ref inner, .. } => classify(inner),
        Encoding::Def { ref inner, .. } => classify(inner),
        Encoding::Splitted { ref binary, .. } => classify(binary),
        Encoding::DynamicSize { .. } => Kind::Dynamic,
        Encoding::CheckSize { ref inner, .. } => classify(inner),
        Encoding::Padded { ref inner, padding } => match classify(inner) {
            Kind::Fixed(n) => Kind::Fixed(n + padding),
            _ => unreachable!(),
        },
        Encoding::Delayed(ref body) => classify(&(body)()),
    }
}

/// Returns the exact serialized length of `e` if it is the same for every
/// value.
pub fn fixed_length(e: &Encoding) -> Option<usize> {
    match classify(e) {
        Kind::Fixed(n) => Some(n),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use encoding::*;
    use size::TagSize;

    use super::*;

    #[test]
    fn primitives_classify_fixed() {
        assert_eq!(Kind::Fixed(0), classify(&null()));
        assert_eq!(Kind::Fixed(0), classify(&empty()));
        assert_eq!(Kind::Fixed(1), classify(&boolean()));
        assert_eq!(Kind::Fixed(1), classify(&uint8()));
        assert_eq!(Kind::Fixed(2), classify(&int16()));
        assert_eq!(Kind::Fixed(4), classify(&int31()));
        assert_eq!(Kind::Fixed(8), classify(&int64()));
        assert_eq!(Kind::Fixed(8), classify(&float()));
        assert_eq!(Kind::Fixed(1), classify(&ranged_int(-5, 10)));
        assert_eq!(Kind::Fixed(2), classify(&ranged_int(100, 400)));
        assert_eq!(Some(2), fixed_length(&ranged_int(100, 400)));
    }

    #[test]
    fn variable_length_leaves() {
        assert_eq!(Kind::Dynamic, classify(&z()));
        assert_eq!(Kind::Dynamic, classify(&n()));
        assert_eq!(Kind::Variable, classify(&variable_string()));
        assert_eq!(Kind::Fixed(4), classify(&fixed_bytes(4)));
        assert_eq!(Kind::Variable, classify(&list(uint8())));
        assert_eq!(Kind::Dynamic, classify(&string()));
        assert_eq!(None, fixed_length(&string()));
    }

    #[test]
    fn pair_composition() {
        let fixed_pair = tup2(uint8(), int16());
        assert_eq!(Kind::Fixed(3), classify(&fixed_pair));

        let trailing_variable = tup2(uint8(), variable_string());
        assert_eq!(Kind::Variable, classify(&trailing_variable));

        let leading_variable = tup2(variable_string(), uint8());
        assert_eq!(Kind::Variable, classify(&leading_variable));

        let dynamic_pair = tup2(uint8(), z());
        assert_eq!(Kind::Dynamic, classify(&dynamic_pair));
    }

    #[test]
    fn union_merge() {
        fn unit_case(tag: u16, e: Encoding) -> Case {
            case(CaseTag::Tag(tag), None, e,
                 |v| Some(v.clone()), |v| v)
        }

        let same = union(TagSize::Uint8, vec![
            unit_case(0, int16()),
            unit_case(1, tup2(uint8(), uint8())),
        ]);
        assert_eq!(Kind::Fixed(3), classify(&same));

        let differing = union(TagSize::Uint8, vec![
            unit_case(0, int16()),
            unit_case(1, int64()),
        ]);
        assert_eq!(Kind::Dynamic, classify(&differing));

        let variable = union(TagSize::Uint16, vec![
            unit_case(0, int16()),
            unit_case(1, variable_string()),
        ]);
        assert_eq!(Kind::Variable, classify(&variable));
    }

    #[test]
    fn wrappers_take_the_inner_kind() {
        assert_eq!(Kind::Dynamic, classify(&dynamic_size(variable_string())));
        assert_eq!(Kind::Fixed(2), classify(&check_size(16, int16())));
        assert_eq!(Kind::Fixed(6), classify(&padded(int16(), 4)));
        assert_eq!(Kind::Fixed(1),
                   classify(&def("flag", describe(Some("a flag"), None,
                                                  boolean()))));
        assert_eq!(Kind::Fixed(4), classify(&delayed(|| int32())));
    }
}
