///
/// repository
///
/// Declares a typed repository over one entity. Each `fn` becomes a method
/// descriptor whose parameter and return shapes come from the declared
/// types, and a typed method that forwards to the dispatcher.
///
/// ```ignore
/// docmap::repository! {
///     pub struct PersonRepository for Person {
///         fn save(person: Person) -> Person;
///         fn find_by_age_greater_than(age: u32) -> Vec<Person>;
///         #[query("where name like @pattern order by age")]
///         fn matching(pattern: &str) -> Vec<Person>;
///     }
/// }
/// ```
///
/// `pub async struct` generates the same over an `AsyncTemplate`.
///

#[macro_export]
macro_rules! repository {
    (
        $(#[$meta:meta])*
        $vis:vis async struct $name:ident for $entity:ty {
            $(
                $(#[query($query:literal)])?
                fn $method:ident ( $( $arg:ident : $arg_ty:ty ),* $(,)? ) -> $ret:ty ;
            )*
        }
    ) => {
        $(#[$meta])*
        $vis struct $name<T> {
            inner: $crate::repository::AsyncRepository<$entity, T>,
        }

        impl<T: $crate::template::AsyncTemplate> $name<T> {
            $crate::repository!(@descriptor $entity, $crate::repository::AsyncEntityStream<$entity>;
                $( [ $($query)? ] $method ( $($arg : $arg_ty),* ) -> $ret; )*
            );

            pub fn new(
                registry: ::std::sync::Arc<$crate::model::MetadataRegistry>,
                template: T,
            ) -> ::std::result::Result<Self, $crate::Error> {
                let inner = $crate::repository::AsyncRepository::synthesize(
                    registry,
                    template,
                    &Self::descriptor(),
                )?;

                Ok(Self { inner })
            }

            $(
                pub async fn $method(&self, $($arg: $arg_ty),*) -> ::std::result::Result<$ret, $crate::Error> {
                    self.inner
                        .call(
                            stringify!($method),
                            vec![$($crate::repository::IntoArgument::into_argument($arg)),*],
                        )
                        .await
                }
            )*
        }

        impl<T> ::std::ops::Deref for $name<T> {
            type Target = $crate::repository::AsyncRepository<$entity, T>;

            fn deref(&self) -> &Self::Target {
                &self.inner
            }
        }
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident for $entity:ty {
            $(
                $(#[query($query:literal)])?
                fn $method:ident ( $( $arg:ident : $arg_ty:ty ),* $(,)? ) -> $ret:ty ;
            )*
        }
    ) => {
        $(#[$meta])*
        $vis struct $name<T> {
            inner: $crate::repository::Repository<$entity, T>,
        }

        impl<T: $crate::template::Template> $name<T> {
            $crate::repository!(@descriptor $entity, $crate::repository::EntityStream<$entity>;
                $( [ $($query)? ] $method ( $($arg : $arg_ty),* ) -> $ret; )*
            );

            pub fn new(
                registry: ::std::sync::Arc<$crate::model::MetadataRegistry>,
                template: T,
            ) -> ::std::result::Result<Self, $crate::Error> {
                let inner = $crate::repository::Repository::synthesize(
                    registry,
                    template,
                    &Self::descriptor(),
                )?;

                Ok(Self { inner })
            }

            $(
                pub fn $method(&self, $($arg: $arg_ty),*) -> ::std::result::Result<$ret, $crate::Error> {
                    self.inner.call(
                        stringify!($method),
                        vec![$($crate::repository::IntoArgument::into_argument($arg)),*],
                    )
                }
            )*
        }

        impl<T> ::std::ops::Deref for $name<T> {
            type Target = $crate::repository::Repository<$entity, T>;

            fn deref(&self) -> &Self::Target {
                &self.inner
            }
        }
    };

    (@descriptor $entity:ty, $stream:ty;
        $( [ $($query:literal)? ] $method:ident ( $( $arg:ident : $arg_ty:ty ),* ) -> $ret:ty; )*
    ) => {
        /// Method declarations this repository is synthesized from.
        #[must_use]
        pub fn descriptor() -> $crate::repository::RepositoryDescriptor {
            $crate::repository::RepositoryDescriptor::new()
            $(
                .method({
                    let method = $crate::repository::MethodDescriptor::new(
                        stringify!($method),
                        <$ret as $crate::repository::FromOutcome<$entity, $stream>>::SHAPE,
                    )
                    $(
                        .param(
                            stringify!($arg),
                            <$arg_ty as $crate::repository::IntoArgument>::SHAPE,
                        )
                    )*;
                    $( let method = method.query($query); )?

                    method
                })
            )*
        }
    };
}
