//! Canonical value shapes.
//!
//! Every input to the synthesizer is first described as a [`Shape`], a closed
//! set of variants computed once per value or type. Rust types describe
//! themselves through [`Reflect`]: `shape_of` for the type itself (a type
//! token, no literal captured) and `shape` for one instance.
pub mod impls;
pub mod reflect;

use std::any::TypeId;

use indexmap::IndexMap;

use crate::definition::Definition;

pub use impls::{AnyArray, AnyObject, ByteBuf, Bytes};

// ————————————————————————————————————————————————————————————————————————————
// SHAPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone, Debug)]
pub enum Shape {
    /// Already a schema; passes through unchanged.
    Schema(Definition),
    Null,
    Bool(Option<bool>),
    Integer(Option<i64>),
    Float(Option<f64>),
    Text(Option<String>),
    /// Immutable byte sequence.
    Bytes,
    /// Mutable byte buffer.
    ByteBuffer,
    Date,
    Time,
    DateTime,
    /// The generic "any object" marker.
    AnyObject,
    Sequence(Elements),
    /// Inclusive `(min, max)` of a bounded, non-empty integer range.
    /// `None` for the range type itself and for empty ranges.
    Range(Option<(i64, i64)>),
    Mapping(Entries),
    Structured(Structured),
}

/// What is known about the elements of a sequence.
#[derive(Clone, Debug)]
pub enum Elements {
    /// Bare sequence type, element type unknown.
    Unknown,
    /// Sequence type with a declared element type.
    Of(Box<Shape>),
    /// A concrete sequence, one shape per element in order.
    Values(Vec<Shape>),
}

/// What is known about the entries of a mapping.
#[derive(Clone, Debug)]
pub enum Entries {
    /// Bare mapping type.
    Open,
    /// Mapping type with a declared value type.
    Of(Box<Shape>),
    /// A concrete mapping.
    Values(IndexMap<String, Shape>),
}

impl Shape {
    /// Type-token shape of `T`.
    pub fn of<T: Reflect>() -> Self {
        T::shape_of()
    }

    /// Instance shape of `value`.
    pub fn from_value<T: Reflect + ?Sized>(value: &T) -> Self {
        value.shape()
    }

    /// Mark a structured type token as an instance. Other shapes are
    /// returned unchanged.
    #[must_use]
    pub fn into_instance(self) -> Self {
        match self {
            Self::Structured(structured) => Self::Structured(structured.into_instance()),
            other => other,
        }
    }

    /// Name of the structured type this shape stands for.
    pub fn type_name(&self) -> Option<&'static str> {
        match self {
            Self::Structured(structured) => Some(structured.ty().name()),
            _ => None,
        }
    }

    /// True for type tokens of structured types, the only shapes eligible
    /// for reference substitution.
    pub fn is_type_token(&self) -> bool {
        matches!(self, Self::Structured(structured) if structured.is_token())
    }
}

impl From<Definition> for Shape {
    fn from(value: Definition) -> Self {
        Self::Schema(value)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// STRUCTURED TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Declared field of a structured type. The field type is resolved lazily so
/// that self-referential types can be described at all.
#[derive(Clone, Copy, Debug)]
pub struct FieldDecl {
    pub name: &'static str,
    pub shape: fn() -> Shape,
}

impl FieldDecl {
    pub const fn new(name: &'static str, shape: fn() -> Shape) -> Self {
        Self { name, shape }
    }
}

/// Identity and declared fields of a structured type.
#[derive(Clone, Copy, Debug)]
pub struct StructType {
    id: TypeId,
    name: &'static str,
    fields: &'static [FieldDecl],
}

impl StructType {
    pub fn of<T: 'static>(name: &'static str, fields: &'static [FieldDecl]) -> Self {
        Self { id: TypeId::of::<T>(), name, fields }
    }

    pub const fn id(&self) -> TypeId {
        self.id
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn fields(&self) -> &'static [FieldDecl] {
        self.fields
    }
}

/// A structured type, either as a type token or as an instance that may
/// carry extra attributes beyond the declared ones.
#[derive(Clone, Debug)]
pub struct Structured {
    ty: StructType,
    instance: bool,
    extras: IndexMap<String, Shape>,
}

impl Structured {
    pub fn token(ty: StructType) -> Self {
        Self { ty, instance: false, extras: IndexMap::new() }
    }

    pub fn instance(ty: StructType) -> Self {
        Self { ty, instance: true, extras: IndexMap::new() }
    }

    #[must_use]
    pub fn into_instance(mut self) -> Self {
        self.instance = true;
        self
    }

    /// Attach an instance-level attribute. Turns the shape into an instance,
    /// which the synthesizer then keeps out of its per-type memo.
    #[must_use]
    pub fn with_extra(mut self, name: impl Into<String>, shape: Shape) -> Self {
        self.instance = true;
        self.extras.insert(name.into(), shape);
        self
    }

    pub const fn ty(&self) -> &StructType {
        &self.ty
    }

    pub const fn is_token(&self) -> bool {
        !self.instance
    }

    pub const fn extras(&self) -> &IndexMap<String, Shape> {
        &self.extras
    }
}

// ————————————————————————————————————————————————————————————————————————————
// REFLECT
// ————————————————————————————————————————————————————————————————————————————

/// Types that can describe themselves to the synthesizer.
pub trait Reflect {
    /// Shape of the type itself.
    fn shape_of() -> Shape;

    /// Shape of this value. Scalars carry the literal; containers describe
    /// their contents.
    fn shape(&self) -> Shape {
        Self::shape_of()
    }
}

/// Implement [`Reflect`] for plain structs by listing their fields.
///
/// ```
/// use openapi_synth::{reflect_struct, schema::Synthesizer};
///
/// struct Pet { name: String, age: u8 }
/// reflect_struct! { Pet { name: String, age: u8 } }
///
/// let mut synth = Synthesizer::new();
/// let pet = synth.make_type::<Pet>();
/// assert_eq!(pet.origin(), Some("Pet"));
/// ```
#[macro_export]
macro_rules! reflect_struct {
    ($($ty:ident { $($field:ident : $fty:ty),* $(,)? })*) => {
        $(
            impl $crate::shape::Reflect for $ty {
                fn shape_of() -> $crate::shape::Shape {
                    static FIELDS: &[$crate::shape::FieldDecl] = &[
                        $($crate::shape::FieldDecl::new(
                            stringify!($field),
                            <$fty as $crate::shape::Reflect>::shape_of,
                        )),*
                    ];
                    $crate::shape::Shape::Structured($crate::shape::Structured::token(
                        $crate::shape::StructType::of::<$ty>(stringify!($ty), FIELDS),
                    ))
                }

                fn shape(&self) -> $crate::shape::Shape {
                    <Self as $crate::shape::Reflect>::shape_of().into_instance()
                }
            }
        )*
    };
}
