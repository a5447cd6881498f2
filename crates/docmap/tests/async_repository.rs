use docmap::prelude::*;
use futures::{StreamExt, TryStreamExt, executor::block_on};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Entity)]
#[entity(collection = "animals", discriminator_column = "kind")]
enum Animal {
    Dog(Dog),
    Cat(Cat),
}

#[derive(Clone, Debug, Default, PartialEq, Entity)]
#[entity(discriminator = "dog", default)]
struct Dog {
    #[field(id)]
    id: u64,
    name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Entity)]
#[entity(discriminator = "cat", default)]
struct Cat {
    #[field(id)]
    id: u64,
    name: String,
    lives: u8,
}

repository! {
    async struct Animals for Animal {
        fn find_all() -> Vec<Animal>;
        fn count() -> u64;
    }
}

repository! {
    async struct Dogs for Dog {
        fn save(dog: Dog) -> ();
        fn find_by_id(id: u64) -> Option<Dog>;
        fn find_by_name(name: &str) -> Dog;
        fn find_all_order_by_name() -> AsyncEntityStream<Dog>;
        fn exists_by_name(name: &str) -> bool;
        fn count() -> u64;
    }
}

repository! {
    async struct Cats for Cat {
        fn save(cat: Cat) -> Cat;
        fn count() -> u64;
        fn delete_by_lives_less_than(lives: u8) -> u64;
    }
}

type Shared = Arc<MemoryTemplate>;

fn stores() -> (Animals<Shared>, Dogs<Shared>, Cats<Shared>) {
    let registry = Arc::new(
        MetadataRegistry::builder()
            .register::<Animal>()
            .build()
            .unwrap(),
    );
    let template = Arc::new(MemoryTemplate::new());

    (
        Animals::new(Arc::clone(&registry), Arc::clone(&template)).unwrap(),
        Dogs::new(Arc::clone(&registry), Arc::clone(&template)).unwrap(),
        Cats::new(registry, template).unwrap(),
    )
}

fn dog(id: u64, name: &str) -> Dog {
    Dog {
        id,
        name: name.to_string(),
    }
}

fn cat(id: u64, name: &str, lives: u8) -> Cat {
    Cat {
        id,
        name: name.to_string(),
        lives,
    }
}

#[test]
fn subtype_repositories_share_one_collection() {
    let (animals, dogs, cats) = stores();

    block_on(async {
        dogs.save(dog(1, "Rex")).await.unwrap();
        dogs.save(dog(2, "Ace")).await.unwrap();
        let saved = cats.save(cat(3, "Tom", 9)).await.unwrap();
        assert_eq!(saved, cat(3, "Tom", 9));

        assert_eq!(animals.count().await.unwrap(), 3);
        assert_eq!(dogs.count().await.unwrap(), 2);
        assert_eq!(cats.count().await.unwrap(), 1);

        assert_eq!(
            animals.find_all().await.unwrap(),
            vec![
                Animal::Dog(dog(1, "Rex")),
                Animal::Dog(dog(2, "Ace")),
                Animal::Cat(cat(3, "Tom", 9)),
            ]
        );
        assert_eq!(dogs.find_by_id(3).await.unwrap(), None);
    });
}

#[test]
fn single_results_and_existence() {
    let (_, dogs, _) = stores();

    block_on(async {
        dogs.save(dog(1, "Rex")).await.unwrap();
        dogs.save(dog(2, "Rex")).await.unwrap();
        dogs.save(dog(3, "Ace")).await.unwrap();

        assert_eq!(dogs.find_by_name("Ace").await.unwrap(), dog(3, "Ace"));
        assert!(matches!(
            dogs.find_by_name("Rex").await,
            Err(docmap::Error::NonUniqueResult { .. })
        ));
        assert!(matches!(
            dogs.find_by_name("Max").await,
            Err(docmap::Error::EmptyResult { .. })
        ));
        assert!(dogs.exists_by_name("Rex").await.unwrap());
        assert!(!dogs.exists_by_name("Max").await.unwrap());
    });
}

#[test]
fn streams_yield_sorted_entities() {
    let (_, dogs, _) = stores();

    let names: Vec<String> = block_on(async {
        for (id, name) in [(1, "Rex"), (2, "Ace"), (3, "Max")] {
            dogs.save(dog(id, name)).await.unwrap();
        }

        dogs.find_all_order_by_name()
            .await
            .unwrap()
            .map_ok(|dog| dog.name)
            .try_collect()
            .await
            .unwrap()
    });

    assert_eq!(names, vec!["Ace", "Max", "Rex"]);
}

#[test]
fn a_stream_can_be_dropped_after_the_first_entity() {
    let (_, dogs, _) = stores();

    let first = block_on(async {
        for (id, name) in [(1, "Rex"), (2, "Ace")] {
            dogs.save(dog(id, name)).await.unwrap();
        }

        let mut stream = dogs.find_all_order_by_name().await.unwrap();
        stream.next().await
    });

    assert_eq!(first.unwrap().unwrap(), dog(2, "Ace"));
}

#[test]
fn derived_delete_is_scoped_to_the_subtype() {
    let (animals, dogs, cats) = stores();

    block_on(async {
        dogs.save(dog(1, "Rex")).await.unwrap();
        cats.save(cat(2, "Tom", 1)).await.unwrap();
        cats.save(cat(3, "Kit", 9)).await.unwrap();

        assert_eq!(cats.delete_by_lives_less_than(5).await.unwrap(), 1);
        assert_eq!(cats.count().await.unwrap(), 1);
        assert_eq!(animals.count().await.unwrap(), 2);
    });
}
