//! Hand-described entities shared by unit tests.

use crate::{
    error::MappingError,
    model::{EntityMetadataBuilder, MetadataRegistry},
    repository::{Argument, IntoArgument, ParamShape},
    traits::{Entity, FieldValue, FieldValueKind},
    value::{Record, Value},
};

///
/// Person
/// default constructor, renamed columns
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Person {
    pub id: u64,
    pub name: String,
    pub age: u32,
}

impl Person {
    pub fn new(id: u64, name: &str, age: u32) -> Self {
        Self {
            id,
            name: name.to_string(),
            age,
        }
    }
}

impl Entity for Person {
    fn metadata() -> EntityMetadataBuilder<Self> {
        EntityMetadataBuilder::<Self>::new("Person")
            .collection("person")
            .id("id", |p| &p.id, |p| &mut p.id)
            .column("_id")
            .field("name", |p| &p.name, |p| &mut p.name)
            .column("full_name")
            .field("age", |p| &p.age, |p| &mut p.age)
            .default_constructor(Self::default)
    }
}

///
/// Address
/// embedded value
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Address {
    pub city: String,
    pub zip: String,
}

impl Address {
    pub fn new(city: &str, zip: &str) -> Self {
        Self {
            city: city.to_string(),
            zip: zip.to_string(),
        }
    }
}

impl FieldValue for Address {
    fn kind() -> FieldValueKind {
        FieldValueKind::Embedded
    }

    fn to_value(&self) -> Value {
        Value::Record(
            Record::new()
                .with("city", self.city.as_str())
                .with("zip", self.zip.as_str()),
        )
    }

    fn from_value(value: &Value) -> Option<Self> {
        let record = value.as_record()?;

        Some(Self {
            city: String::from_value(record.value("city"))?,
            zip: String::from_value(record.value("zip"))?,
        })
    }
}

///
/// Book
/// parameterized constructor plus a setter-applied field
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Book {
    pub isbn: String,
    pub title: String,
    pub publisher: Option<Address>,
}

impl Book {
    pub fn new(isbn: &str, title: &str, publisher: Option<Address>) -> Self {
        Self {
            isbn: isbn.to_string(),
            title: title.to_string(),
            publisher,
        }
    }
}

impl Entity for Book {
    fn metadata() -> EntityMetadataBuilder<Self> {
        EntityMetadataBuilder::<Self>::new("Book")
            .id("isbn", |b| &b.isbn, |b| &mut b.isbn)
            .field("title", |b| &b.title, |b| &mut b.title)
            .field("publisher", |b| &b.publisher, |b| &mut b.publisher)
            .constructor(&["isbn", "title"], |args| {
                Ok(Self {
                    isbn: args.take()?,
                    title: args.take()?,
                    publisher: None,
                })
            })
    }
}

///
/// Animal
/// hierarchy root over Dog and Cat
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Animal {
    Dog(Dog),
    Cat(Cat),
}

impl Entity for Animal {
    fn metadata() -> EntityMetadataBuilder<Self> {
        EntityMetadataBuilder::<Self>::new("Animal")
            .collection("animals")
            .discriminator_column("kind")
            .subtype(Self::Dog, |a: &Self| match a {
                Self::Dog(dog) => Some(dog),
                Self::Cat(_) => None,
            })
            .subtype(Self::Cat, |a: &Self| match a {
                Self::Cat(cat) => Some(cat),
                Self::Dog(_) => None,
            })
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Dog {
    pub id: u64,
    pub name: String,
    pub good_boy: bool,
}

impl Dog {
    pub fn new(id: u64, name: &str, good_boy: bool) -> Self {
        Self {
            id,
            name: name.to_string(),
            good_boy,
        }
    }
}

impl Entity for Dog {
    fn metadata() -> EntityMetadataBuilder<Self> {
        EntityMetadataBuilder::<Self>::new("Dog")
            .discriminator("dog")
            .id("id", |d| &d.id, |d| &mut d.id)
            .field("name", |d| &d.name, |d| &mut d.name)
            .field("good_boy", |d| &d.good_boy, |d| &mut d.good_boy)
            .default_constructor(Self::default)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Cat {
    pub id: u64,
    pub name: String,
    pub lives: u8,
}

impl Cat {
    pub fn new(id: u64, name: &str, lives: u8) -> Self {
        Self {
            id,
            name: name.to_string(),
            lives,
        }
    }
}

impl Entity for Cat {
    fn metadata() -> EntityMetadataBuilder<Self> {
        EntityMetadataBuilder::<Self>::new("Cat")
            .id("id", |c| &c.id, |c| &mut c.id)
            .field("name", |c| &c.name, |c| &mut c.name)
            .field("lives", |c| &c.lives, |c| &mut c.lives)
            .constructor(&["id", "name"], |args| {
                Ok(Self {
                    id: args.take()?,
                    name: args.take()?,
                    lives: 0,
                })
            })
    }
}

///
/// Shape
/// root relying on the configured discriminator column
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Shape {
    Circle(Circle),
}

impl Entity for Shape {
    fn metadata() -> EntityMetadataBuilder<Self> {
        EntityMetadataBuilder::<Self>::new("Shape").subtype(Self::Circle, |s: &Self| match s {
            Self::Circle(circle) => Some(circle),
        })
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Circle {
    pub id: u64,
    pub radius: u32,
}

impl Entity for Circle {
    fn metadata() -> EntityMetadataBuilder<Self> {
        EntityMetadataBuilder::<Self>::new("Circle")
            .id("id", |c| &c.id, |c| &mut c.id)
            .field("radius", |c| &c.radius, |c| &mut c.radius)
            .default_constructor(Self::default)
    }
}

///
/// Broken
/// constructor bound to a field that is not mapped
///

#[derive(Debug, Default)]
pub struct Broken {
    pub name: String,
}

impl Entity for Broken {
    fn metadata() -> EntityMetadataBuilder<Self> {
        EntityMetadataBuilder::<Self>::new("Broken")
            .field("name", |b| &b.name, |b| &mut b.name)
            .constructor(&["nope"], |_| {
                Err(MappingError::UnmappedSubtype { entity: "Broken" })
            })
    }
}

// entities are passed whole to save and delete
macro_rules! entity_argument {
    ($($entity:ty),* $(,)?) => {
        $(
            impl IntoArgument for $entity {
                const SHAPE: ParamShape = ParamShape::Entity;

                fn into_argument(self) -> Argument {
                    Argument::entity(self)
                }
            }
        )*
    };
}

entity_argument!(Person, Book, Animal, Dog, Cat, Circle);

/// Registry over every fixture entity.
pub fn registry() -> MetadataRegistry {
    MetadataRegistry::builder()
        .register::<Person>()
        .register::<Book>()
        .register::<Animal>()
        .register::<Shape>()
        .build()
        .expect("fixture registry builds")
}
