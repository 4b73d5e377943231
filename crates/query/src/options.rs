//! Projection, sorting and pagination options of a find operation.

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// The `1` / `-1` convention used by document stores.
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Which fields a find returns. Empty means every field.
///
/// Inclusion and exclusion are mutually exclusive, except that `_id` may always be
/// excluded. `_id` is returned by inclusion projections unless excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Projection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: fields.into_iter().map(Into::into).collect(),
            exclude: Vec::new(),
        }
    }

    pub fn exclude<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: Vec::new(),
            exclude: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_all(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Whether a top-level field survives this projection.
    pub fn keeps(&self, field: &str) -> bool {
        if self.exclude.iter().any(|f| f == field) {
            return false;
        }
        self.include.is_empty() || field == "_id" || self.include.iter().any(|f| f == field)
    }
}

/// Everything of a find besides its criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindOptions {
    pub projection: Projection,
    pub skip: u64,
    /// `None` returns every matching document.
    pub limit: Option<u64>,
    pub sort: Vec<SortKey>,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            projection: Projection::all(),
            skip: 0,
            limit: None,
            sort: Vec::new(),
        }
    }
}

impl FindOptions {
    /// Appends `field` ascending as the last sort key unless it is already sorted on,
    /// so documents that tie on every requested key keep a fixed order across pages.
    pub fn with_tiebreak(mut self, field: &str) -> Self {
        if !self.sort.iter().any(|key| key.field == field) {
            self.sort.push(SortKey::asc(field));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiebreak_is_appended_once() {
        let options = FindOptions {
            sort: vec![SortKey::desc("price")],
            ..FindOptions::default()
        }
        .with_tiebreak("_id")
        .with_tiebreak("_id");

        assert_eq!(options.sort, vec![SortKey::desc("price"), SortKey::asc("_id")]);
    }

    #[test]
    fn explicit_id_sort_is_left_alone() {
        let options = FindOptions {
            sort: vec![SortKey::desc("_id")],
            ..FindOptions::default()
        }
        .with_tiebreak("_id");

        assert_eq!(options.sort, vec![SortKey::desc("_id")]);
    }

    #[test]
    fn inclusion_projection_keeps_id() {
        let projection = Projection::include(["firstName"]);
        assert!(projection.keeps("_id"));
        assert!(projection.keeps("firstName"));
        assert!(!projection.keeps("lastName"));
    }

    #[test]
    fn exclusion_projection_drops_listed_fields() {
        let projection = Projection::exclude(["_id", "img"]);
        assert!(!projection.keeps("_id"));
        assert!(!projection.keeps("img"));
        assert!(projection.keeps("title"));
    }
}
