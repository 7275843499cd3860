//! `Reflect` for std, chrono and serde_json types, plus the marker types.
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::hash::BuildHasher;
use std::ops::{Range, RangeInclusive};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use indexmap::IndexMap;
use serde_json::Value;

use super::{Elements, Entries, Reflect, Shape};
use crate::definition::Definition;

/// Marker for "some object", with no known properties.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnyObject;

/// Marker for a sequence whose element type is unknown.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnyArray;

/// Immutable byte string (`format: byte`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

/// Mutable byte buffer (`format: binary`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ByteBuf(pub Vec<u8>);

impl Reflect for AnyObject {
    fn shape_of() -> Shape {
        Shape::AnyObject
    }
}

impl Reflect for AnyArray {
    fn shape_of() -> Shape {
        Shape::Sequence(Elements::Unknown)
    }
}

impl Reflect for Bytes {
    fn shape_of() -> Shape {
        Shape::Bytes
    }
}

impl Reflect for ByteBuf {
    fn shape_of() -> Shape {
        Shape::ByteBuffer
    }
}

// A schema stands for itself. The bare type says nothing more than "object".
impl Reflect for Definition {
    fn shape_of() -> Shape {
        Shape::AnyObject
    }

    fn shape(&self) -> Shape {
        Shape::Schema(self.clone())
    }
}

impl Reflect for () {
    fn shape_of() -> Shape {
        Shape::Null
    }
}

// ------------------------------- Scalars ---------------------------------- //

impl Reflect for bool {
    fn shape_of() -> Shape {
        Shape::Bool(None)
    }

    fn shape(&self) -> Shape {
        Shape::Bool(Some(*self))
    }
}

// Literals that do not fit an i64 keep the kind but lose the default.
macro_rules! integers {
    ($($t:ty),*) => {
        $(impl Reflect for $t {
            fn shape_of() -> Shape {
                Shape::Integer(None)
            }

            fn shape(&self) -> Shape {
                Shape::Integer(i64::try_from(*self).ok())
            }
        })*
    };
}

integers!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Reflect for f32 {
    fn shape_of() -> Shape {
        Shape::Float(None)
    }

    fn shape(&self) -> Shape {
        Shape::Float(Some(f64::from(*self)))
    }
}

impl Reflect for f64 {
    fn shape_of() -> Shape {
        Shape::Float(None)
    }

    fn shape(&self) -> Shape {
        Shape::Float(Some(*self))
    }
}

impl Reflect for String {
    fn shape_of() -> Shape {
        Shape::Text(None)
    }

    fn shape(&self) -> Shape {
        Shape::Text(Some(self.clone()))
    }
}

impl Reflect for &str {
    fn shape_of() -> Shape {
        Shape::Text(None)
    }

    fn shape(&self) -> Shape {
        Shape::Text(Some((*self).to_owned()))
    }
}

impl Reflect for char {
    fn shape_of() -> Shape {
        Shape::Text(None)
    }

    fn shape(&self) -> Shape {
        Shape::Text(Some(self.to_string()))
    }
}

impl Reflect for NaiveDate {
    fn shape_of() -> Shape {
        Shape::Date
    }
}

impl Reflect for NaiveTime {
    fn shape_of() -> Shape {
        Shape::Time
    }
}

impl Reflect for NaiveDateTime {
    fn shape_of() -> Shape {
        Shape::DateTime
    }
}

impl<Tz: TimeZone> Reflect for chrono::DateTime<Tz> {
    fn shape_of() -> Shape {
        Shape::DateTime
    }
}

// ------------------------------ Wrappers ---------------------------------- //

impl<T: Reflect> Reflect for Option<T> {
    fn shape_of() -> Shape {
        T::shape_of()
    }

    fn shape(&self) -> Shape {
        self.as_ref().map_or(Shape::Null, Reflect::shape)
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn shape_of() -> Shape {
        T::shape_of()
    }

    fn shape(&self) -> Shape {
        (**self).shape()
    }
}

// ----------------------------- Sequences ---------------------------------- //

fn elements<'a, T, I>(values: I) -> Shape
where
    T: Reflect + 'a,
    I: IntoIterator<Item = &'a T>,
{
    Shape::Sequence(Elements::Values(values.into_iter().map(Reflect::shape).collect()))
}

// An empty instance says nothing beyond its type.
impl<T: Reflect> Reflect for Vec<T> {
    fn shape_of() -> Shape {
        Shape::Sequence(Elements::Of(Box::new(T::shape_of())))
    }

    fn shape(&self) -> Shape {
        if self.is_empty() { Self::shape_of() } else { elements(self) }
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn shape_of() -> Shape {
        Shape::Sequence(Elements::Of(Box::new(T::shape_of())))
    }

    fn shape(&self) -> Shape {
        if N == 0 { Self::shape_of() } else { elements(self) }
    }
}

// ------------------------------- Ranges ----------------------------------- //

macro_rules! ranges {
    ($($t:ty),*) => {
        $(
            impl Reflect for Range<$t> {
                fn shape_of() -> Shape {
                    Shape::Range(None)
                }

                fn shape(&self) -> Shape {
                    if self.is_empty() {
                        return Shape::Range(None);
                    }
                    Shape::Range(Some((i64::from(self.start), i64::from(self.end) - 1)))
                }
            }

            impl Reflect for RangeInclusive<$t> {
                fn shape_of() -> Shape {
                    Shape::Range(None)
                }

                fn shape(&self) -> Shape {
                    if self.is_empty() {
                        return Shape::Range(None);
                    }
                    Shape::Range(Some((i64::from(*self.start()), i64::from(*self.end()))))
                }
            }
        )*
    };
}

ranges!(i32, i64);

// ------------------------------ Mappings ---------------------------------- //

fn entries<'a, K, V, I>(values: I) -> Shape
where
    K: Display + 'a,
    V: Reflect + 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
{
    Shape::Mapping(Entries::Values(
        values.into_iter().map(|(k, v)| (k.to_string(), v.shape())).collect(),
    ))
}

impl<K: Display, V: Reflect> Reflect for BTreeMap<K, V> {
    fn shape_of() -> Shape {
        Shape::Mapping(Entries::Of(Box::new(V::shape_of())))
    }

    fn shape(&self) -> Shape {
        if self.is_empty() { Self::shape_of() } else { entries(self) }
    }
}

// Sorted by key so the output does not depend on the hasher.
impl<K: Display, V: Reflect, S: BuildHasher> Reflect for HashMap<K, V, S> {
    fn shape_of() -> Shape {
        Shape::Mapping(Entries::Of(Box::new(V::shape_of())))
    }

    fn shape(&self) -> Shape {
        if self.is_empty() {
            return Self::shape_of();
        }
        let mut values = self.iter().map(|(k, v)| (k.to_string(), v)).collect::<Vec<_>>();
        values.sort_by(|a, b| a.0.cmp(&b.0));
        Shape::Mapping(Entries::Values(
            values.into_iter().map(|(k, v)| (k, v.shape())).collect(),
        ))
    }
}

impl<K: Display, V: Reflect, S: BuildHasher> Reflect for IndexMap<K, V, S> {
    fn shape_of() -> Shape {
        Shape::Mapping(Entries::Of(Box::new(V::shape_of())))
    }

    fn shape(&self) -> Shape {
        if self.is_empty() { Self::shape_of() } else { entries(self) }
    }
}

// ------------------------------ serde_json -------------------------------- //

impl Reflect for Value {
    fn shape_of() -> Shape {
        Shape::AnyObject
    }

    fn shape(&self) -> Shape {
        match self {
            Self::Null => Shape::Null,
            Self::Bool(flag) => Shape::Bool(Some(*flag)),
            Self::Number(number) => number
                .as_i64()
                .map_or_else(|| Shape::Float(number.as_f64()), |n| Shape::Integer(Some(n))),
            Self::String(text) => Shape::Text(Some(text.clone())),
            Self::Array(items) => {
                Shape::Sequence(Elements::Values(items.iter().map(Reflect::shape).collect()))
            }
            Self::Object(map) => map.shape(),
        }
    }
}

impl Reflect for serde_json::Map<String, Value> {
    fn shape_of() -> Shape {
        Shape::Mapping(Entries::Open)
    }

    fn shape(&self) -> Shape {
        Shape::Mapping(Entries::Values(
            self.iter().map(|(k, v)| (k.clone(), v.shape())).collect(),
        ))
    }
}
