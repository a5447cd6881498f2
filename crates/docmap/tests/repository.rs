use docmap::{
    core::error::{DefinitionReason, RepositoryDefinitionError},
    prelude::*,
};
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq, Entity)]
#[entity(collection = "people", default)]
struct Person {
    #[field(id)]
    id: u64,
    #[field(column = "full_name")]
    name: String,
    age: u32,
}

impl Person {
    fn new(id: u64, name: &str, age: u32) -> Self {
        Self {
            id,
            name: name.to_string(),
            age,
        }
    }
}

repository! {
    struct People for Person {
        fn save(person: Person) -> Person;
        fn find_by_id(id: u64) -> Option<Person>;
        fn exists_by_id(id: u64) -> bool;
        fn delete_by_id(id: u64) -> ();
        fn count() -> u64;
        fn find_all(page: PageRequest) -> Page<Person>;
        fn find_by_name_like(pattern: &str) -> Vec<Person>;
        fn find_by_age_between_order_by_name_desc(low: u32, high: u32) -> Vec<Person>;
        fn find_by_age_greater_than(age: u32, page: PageRequest) -> CursoredPage<Person>;
        fn find_by_name_in(names: Vec<String>) -> Vec<Person>;
        fn find_by_age_not(age: u32) -> Vec<Person>;
        fn count_by_age_less_than(age: u32) -> u64;
        fn delete_by_age(age: u32) -> u64;
        #[query("select * from Person where name like @pattern or age = @age order by id")]
        fn matching(pattern: &str, age: u32) -> Vec<Person>;
    }
}

fn people() -> People<MemoryTemplate> {
    let registry = MetadataRegistry::builder()
        .register::<Person>()
        .build()
        .unwrap();
    let people = People::new(Arc::new(registry), MemoryTemplate::new()).unwrap();

    for person in [
        Person::new(1, "Ana", 31),
        Person::new(2, "Bo", 45),
        Person::new(3, "Cy", 12),
        Person::new(4, "Abe", 31),
        Person::new(5, "Di", 60),
    ] {
        people.save(person).unwrap();
    }

    people
}

fn ids(people: &[Person]) -> Vec<u64> {
    people.iter().map(|p| p.id).collect()
}

#[test]
fn fixed_vocabulary() {
    let people = people();

    assert_eq!(people.count().unwrap(), 5);
    assert_eq!(people.find_by_id(2).unwrap(), Some(Person::new(2, "Bo", 45)));
    assert!(people.exists_by_id(3).unwrap());

    people.delete_by_id(3).unwrap();
    assert!(!people.exists_by_id(3).unwrap());
    assert_eq!(people.find_by_id(3).unwrap(), None);
    assert_eq!(people.count().unwrap(), 4);
}

#[test]
fn save_updates_an_existing_record() {
    let people = people();

    let saved = people.save(Person::new(2, "Bo", 46)).unwrap();

    assert_eq!(saved.age, 46);
    assert_eq!(people.count().unwrap(), 5);
    assert_eq!(people.find_by_id(2).unwrap().unwrap().age, 46);
}

#[test]
fn derived_queries_translate_field_names() {
    let people = people();

    assert_eq!(ids(&people.find_by_name_like("A%").unwrap()), vec![1, 4]);
    assert_eq!(
        ids(&people.find_by_age_between_order_by_name_desc(30, 50).unwrap()),
        vec![2, 1, 4]
    );
    assert_eq!(
        ids(&people
            .find_by_name_in(vec!["Di".to_string(), "Cy".to_string()])
            .unwrap()),
        vec![3, 5]
    );
    assert_eq!(ids(&people.find_by_age_not(31).unwrap()), vec![2, 3, 5]);
    assert_eq!(people.count_by_age_less_than(40).unwrap(), 3);
}

#[test]
fn derived_delete_reports_the_count() {
    let people = people();

    assert_eq!(people.delete_by_age(31).unwrap(), 2);
    assert_eq!(people.count().unwrap(), 3);
    assert_eq!(people.delete_by_age(31).unwrap(), 0);
}

#[test]
fn query_text_with_named_parameters() {
    let people = people();

    assert_eq!(ids(&people.matching("C%", 60).unwrap()), vec![3, 5]);
}

#[test]
fn offset_pages() {
    let people = people();
    let request = PageRequest::of_size(2).unwrap().sort_by(Sort::desc("age"));

    let first = people.find_all(request).unwrap();
    assert_eq!(ids(first.content()), vec![5, 2]);

    let second = people.find_all(first.next_page_request().unwrap()).unwrap();
    assert_eq!(ids(second.content()), vec![1, 4]);

    let third = people.find_all(second.next_page_request().unwrap()).unwrap();
    assert_eq!(ids(third.content()), vec![3]);
    assert_eq!(
        third.previous_page_request().unwrap(),
        second.page_request().clone()
    );
    assert!(matches!(
        third.total_elements(),
        Err(docmap::Error::UnsupportedCapability { .. })
    ));
}

#[test]
fn cursored_pages_cover_the_result_once() {
    let people = people();
    let sorts = || {
        PageRequest::of_size(2)
            .unwrap()
            .sort_by(Sort::asc("age"))
            .sort_by(Sort::asc("id"))
    };

    let mut seen = Vec::new();
    let mut page = people.find_by_age_greater_than(20, sorts()).unwrap();
    while page.has_content() {
        seen.extend(ids(page.content()));
        page = people
            .find_by_age_greater_than(20, page.next_page_request().unwrap())
            .unwrap();
    }

    assert_eq!(seen, vec![1, 4, 2, 5]);
}

#[derive(Clone, Debug, Default, PartialEq, Entity)]
#[entity(collection = "members", default)]
struct Member {
    #[field(id)]
    id: u64,
    nick: Option<String>,
}

repository! {
    struct Members for Member {
        fn save(member: Member) -> Member;
        fn find_all_order_by_nick(page: PageRequest) -> CursoredPage<Member>;
    }
}

fn members() -> Members<MemoryTemplate> {
    let registry = MetadataRegistry::builder()
        .register::<Member>()
        .build()
        .unwrap();
    let members = Members::new(Arc::new(registry), MemoryTemplate::new()).unwrap();

    for (id, nick) in [(1, None), (2, Some("a")), (3, Some("b")), (4, None)] {
        members
            .save(Member {
                id,
                nick: nick.map(str::to_string),
            })
            .unwrap();
    }

    members
}

fn walk(members: &Members<MemoryTemplate>, direction: Direction) -> (Vec<u64>, Vec<u64>) {
    let request = PageRequest::of_size(1)
        .unwrap()
        .sort_by(Sort::new("nick", direction))
        .sort_by(Sort::asc("id"));

    let mut seen = Vec::new();
    let mut page = members.find_all_order_by_nick(request).unwrap();
    let mut last = page.clone();
    while page.has_content() {
        seen.extend(page.content().iter().map(|m| m.id));
        last = page.clone();
        page = members
            .find_all_order_by_nick(page.next_page_request().unwrap())
            .unwrap();
    }

    let previous = members
        .find_all_order_by_nick(last.previous_page_request().unwrap())
        .unwrap();

    (seen, previous.content().iter().map(|m| m.id).collect())
}

#[test]
fn cursored_pages_step_over_null_sort_keys() {
    let members = members();

    assert_eq!(walk(&members, Direction::Asc), (vec![1, 4, 2, 3], vec![2]));
    assert_eq!(walk(&members, Direction::Desc), (vec![3, 2, 1, 4], vec![1]));
}

#[test]
fn synthesis_rejects_unknown_properties() {
    repository! {
        struct Broken for Person {
            fn find_by_height(height: u32) -> Vec<Person>;
        }
    }

    let registry = MetadataRegistry::builder()
        .register::<Person>()
        .build()
        .unwrap();
    let err = Broken::new(Arc::new(registry), MemoryTemplate::new())
        .err()
        .unwrap();

    assert!(matches!(
        err,
        docmap::Error::RepositoryDefinition(RepositoryDefinitionError {
            reason: DefinitionReason::UnknownField { .. },
            ..
        })
    ));
}

#[test]
fn synthesis_rejects_mismatched_arity() {
    repository! {
        struct Broken for Person {
            fn find_by_name_and_age(name: &str) -> Vec<Person>;
        }
    }

    let registry = MetadataRegistry::builder()
        .register::<Person>()
        .build()
        .unwrap();
    let err = Broken::new(Arc::new(registry), MemoryTemplate::new())
        .err()
        .unwrap();

    assert!(matches!(
        err,
        docmap::Error::RepositoryDefinition(RepositoryDefinitionError {
            reason: DefinitionReason::ParameterCount {
                expected: 2,
                found: 1
            },
            ..
        })
    ));
}
