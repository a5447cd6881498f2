use crate::{
    error::Error,
    page::{CursoredPage, Page},
    repository::ReturnShape,
    traits::Entity,
};
use futures::{Stream, StreamExt, stream::BoxStream};
use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

///
/// Outcome
///
/// Result of one repository invocation, already wrapped in the method's
/// declared return shape. `S` is the lazy stream type of the dispatcher
/// that produced it.
///

pub enum Outcome<E, S = EntityStream<E>> {
    Unit,
    One(E),
    Optional(Option<E>),
    List(Vec<E>),
    Page(Page<E>),
    CursoredPage(CursoredPage<E>),
    Stream(S),
    Exists(bool),
    Count(u64),
}

/// Outcome of the asynchronous dispatcher.
pub type AsyncOutcome<E> = Outcome<E, AsyncEntityStream<E>>;

impl<E, S> Outcome<E, S> {
    #[must_use]
    pub const fn shape(&self) -> ReturnShape {
        match self {
            Self::Unit => ReturnShape::Unit,
            Self::One(_) => ReturnShape::One,
            Self::Optional(_) => ReturnShape::Optional,
            Self::List(_) => ReturnShape::List,
            Self::Page(_) => ReturnShape::Page,
            Self::CursoredPage(_) => ReturnShape::CursoredPage,
            Self::Stream(_) => ReturnShape::Stream,
            Self::Exists(_) => ReturnShape::Exists,
            Self::Count(_) => ReturnShape::Count,
        }
    }

    fn mismatch(&self, expected: ReturnShape) -> Error {
        Error::OutcomeMismatch {
            expected,
            found: self.shape(),
        }
    }
}

impl<E: fmt::Debug, S> fmt::Debug for Outcome<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("Unit"),
            Self::One(e) => f.debug_tuple("One").field(e).finish(),
            Self::Optional(e) => f.debug_tuple("Optional").field(e).finish(),
            Self::List(e) => f.debug_tuple("List").field(e).finish(),
            Self::Page(p) => f.debug_tuple("Page").field(p).finish(),
            Self::CursoredPage(p) => f.debug_tuple("CursoredPage").field(p).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Exists(b) => f.debug_tuple("Exists").field(b).finish(),
            Self::Count(n) => f.debug_tuple("Count").field(n).finish(),
        }
    }
}

///
/// FromOutcome
///
/// Typed extraction of an [`Outcome`]. `SHAPE` is the return shape a typed
/// method declaration implies.
///

pub trait FromOutcome<E, S = EntityStream<E>>: Sized {
    const SHAPE: ReturnShape;

    fn from_outcome(outcome: Outcome<E, S>) -> Result<Self, Error>;
}

impl<E: Entity, S> FromOutcome<E, S> for E {
    const SHAPE: ReturnShape = ReturnShape::One;

    fn from_outcome(outcome: Outcome<E, S>) -> Result<Self, Error> {
        match outcome {
            Outcome::One(entity) => Ok(entity),
            other => Err(other.mismatch(ReturnShape::One)),
        }
    }
}

impl<E: Entity, S> FromOutcome<E, S> for Option<E> {
    const SHAPE: ReturnShape = ReturnShape::Optional;

    fn from_outcome(outcome: Outcome<E, S>) -> Result<Self, Error> {
        match outcome {
            Outcome::Optional(entity) => Ok(entity),
            other => Err(other.mismatch(ReturnShape::Optional)),
        }
    }
}

impl<E: Entity, S> FromOutcome<E, S> for Vec<E> {
    const SHAPE: ReturnShape = ReturnShape::List;

    fn from_outcome(outcome: Outcome<E, S>) -> Result<Self, Error> {
        match outcome {
            Outcome::List(entities) => Ok(entities),
            other => Err(other.mismatch(ReturnShape::List)),
        }
    }
}

impl<E: Entity, S> FromOutcome<E, S> for Page<E> {
    const SHAPE: ReturnShape = ReturnShape::Page;

    fn from_outcome(outcome: Outcome<E, S>) -> Result<Self, Error> {
        match outcome {
            Outcome::Page(page) => Ok(page),
            other => Err(other.mismatch(ReturnShape::Page)),
        }
    }
}

impl<E: Entity, S> FromOutcome<E, S> for CursoredPage<E> {
    const SHAPE: ReturnShape = ReturnShape::CursoredPage;

    fn from_outcome(outcome: Outcome<E, S>) -> Result<Self, Error> {
        match outcome {
            Outcome::CursoredPage(page) => Ok(page),
            other => Err(other.mismatch(ReturnShape::CursoredPage)),
        }
    }
}

impl<E: Entity> FromOutcome<E, Self> for EntityStream<E> {
    const SHAPE: ReturnShape = ReturnShape::Stream;

    fn from_outcome(outcome: Outcome<E, Self>) -> Result<Self, Error> {
        match outcome {
            Outcome::Stream(stream) => Ok(stream),
            other => Err(other.mismatch(ReturnShape::Stream)),
        }
    }
}

impl<E: Entity> FromOutcome<E, Self> for AsyncEntityStream<E> {
    const SHAPE: ReturnShape = ReturnShape::Stream;

    fn from_outcome(outcome: Outcome<E, Self>) -> Result<Self, Error> {
        match outcome {
            Outcome::Stream(stream) => Ok(stream),
            other => Err(other.mismatch(ReturnShape::Stream)),
        }
    }
}

impl<E: Entity, S> FromOutcome<E, S> for bool {
    const SHAPE: ReturnShape = ReturnShape::Exists;

    fn from_outcome(outcome: Outcome<E, S>) -> Result<Self, Error> {
        match outcome {
            Outcome::Exists(exists) => Ok(exists),
            other => Err(other.mismatch(ReturnShape::Exists)),
        }
    }
}

impl<E: Entity, S> FromOutcome<E, S> for u64 {
    const SHAPE: ReturnShape = ReturnShape::Count;

    fn from_outcome(outcome: Outcome<E, S>) -> Result<Self, Error> {
        match outcome {
            Outcome::Count(count) => Ok(count),
            other => Err(other.mismatch(ReturnShape::Count)),
        }
    }
}

impl<E: Entity, S> FromOutcome<E, S> for () {
    const SHAPE: ReturnShape = ReturnShape::Unit;

    fn from_outcome(outcome: Outcome<E, S>) -> Result<Self, Error> {
        match outcome {
            Outcome::Unit => Ok(()),
            other => Err(other.mismatch(ReturnShape::Unit)),
        }
    }
}

///
/// EntityStream
///
/// Lazily mapped entities from a blocking template. Nothing is read from
/// the store until the stream is iterated; dropping it stops reading.
///

pub struct EntityStream<E> {
    inner: Box<dyn Iterator<Item = Result<E, Error>> + Send>,
}

impl<E> EntityStream<E> {
    pub(crate) fn new(inner: impl Iterator<Item = Result<E, Error>> + Send + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl<E> Iterator for EntityStream<E> {
    type Item = Result<E, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl<E> fmt::Debug for EntityStream<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EntityStream")
    }
}

///
/// AsyncEntityStream
///

pub struct AsyncEntityStream<E> {
    inner: BoxStream<'static, Result<E, Error>>,
}

impl<E> AsyncEntityStream<E> {
    pub(crate) fn new(inner: impl Stream<Item = Result<E, Error>> + Send + 'static) -> Self {
        Self {
            inner: inner.boxed(),
        }
    }
}

impl<E> Stream for AsyncEntityStream<E> {
    type Item = Result<E, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.poll_next_unpin(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<E> fmt::Debug for AsyncEntityStream<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AsyncEntityStream")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::Person;

    #[test]
    fn debug_hides_the_stream() {
        let outcome: Outcome<Person> = Outcome::Stream(EntityStream::new(std::iter::empty()));

        assert_eq!(format!("{outcome:?}"), "Stream(..)");
        assert_eq!(format!("{:?}", Outcome::<Person>::Count(3)), "Count(3)");
    }

    #[test]
    fn extraction_reports_the_shape_it_found() {
        let err = <Vec<Person> as FromOutcome<Person>>::from_outcome(Outcome::Exists(true))
            .unwrap_err();

        assert!(matches!(
            err,
            Error::OutcomeMismatch {
                expected: ReturnShape::List,
                found: ReturnShape::Exists,
            }
        ));
    }
}
