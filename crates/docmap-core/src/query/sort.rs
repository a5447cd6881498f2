use serde::{Deserialize, Serialize};

///
/// Direction
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

///
/// Sort
///
/// One ordering key. In a list of sorts, earlier entries take precedence.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Sort {
    pub field: String,
    pub direction: Direction,
}

impl Sort {
    #[must_use]
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, Direction::Asc)
    }

    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, Direction::Desc)
    }

    #[must_use]
    pub fn reversed(&self) -> Self {
        Self::new(self.field.clone(), self.direction.reverse())
    }
}

///
/// Order
///
/// Sort list passed as a single repository argument.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Order(pub Vec<Sort>);

impl Order {
    #[must_use]
    pub fn by(sort: Sort) -> Self {
        Self(vec![sort])
    }

    #[must_use]
    pub fn then(mut self, sort: Sort) -> Self {
        self.0.push(sort);
        self
    }
}

impl From<Vec<Sort>> for Order {
    fn from(sorts: Vec<Sort>) -> Self {
        Self(sorts)
    }
}

/// Append `extra` to `sorts`. A sort on a field already present replaces
/// that entry's direction in place instead of adding a second key.
pub fn merge_sorts(sorts: &mut Vec<Sort>, extra: impl IntoIterator<Item = Sort>) {
    for sort in extra {
        match sorts.iter_mut().find(|s| s.field == sort.field) {
            Some(existing) => existing.direction = sort.direction,
            None => sorts.push(sort),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_replaces_existing_field_in_place() {
        let mut sorts = vec![Sort::asc("age"), Sort::asc("name")];

        merge_sorts(&mut sorts, [Sort::desc("name"), Sort::asc("city"), Sort::desc("age")]);

        assert_eq!(
            sorts,
            vec![Sort::desc("age"), Sort::desc("name"), Sort::asc("city")]
        );
    }

    #[test]
    fn reversed_flips_direction_only() {
        let sort = Sort::desc("age");

        assert_eq!(sort.reversed(), Sort::asc("age"));
        assert_eq!(Direction::default(), Direction::Asc);
    }
}
