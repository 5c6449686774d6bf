use std::collections::BTreeSet;

use super::basins::{BasinGroup, BasinId};
use super::model::{Series, SeriesKind};

// ---------------------------------------------------------------------------
// Filter predicate over series identity
// ---------------------------------------------------------------------------

/// Per-field selection over [`SeriesInfo`](super::model::SeriesInfo).
///
/// A field left as `None` places no constraint. A field set to an empty set
/// selects nothing. A series with no value for a constrained optional field
/// (e.g. no contributor name) fails that constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesFilter {
    pub users: Option<BTreeSet<String>>,
    pub user_groups: Option<BTreeSet<String>>,
    pub data_groups: Option<BTreeSet<String>>,
    pub basin_groups: Option<BTreeSet<BasinGroup>>,
    pub basin_ids: Option<BTreeSet<BasinId>>,
    pub kinds: Option<BTreeSet<SeriesKind>>,
    pub computed: Option<bool>,
    pub merged: Option<bool>,
    pub aggregated: Option<bool>,
}

fn insert<T: Ord>(set: &mut Option<BTreeSet<T>>, value: T) {
    set.get_or_insert_with(BTreeSet::new).insert(value);
}

fn passes<T: Ord>(selected: &Option<BTreeSet<T>>, value: Option<&T>) -> bool {
    match (selected, value) {
        (None, _) => true,
        (Some(set), Some(v)) => set.contains(v),
        (Some(_), None) => false,
    }
}

impl SeriesFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        insert(&mut self.users, user.into());
        self
    }

    pub fn user_group(mut self, group: impl Into<String>) -> Self {
        insert(&mut self.user_groups, group.into());
        self
    }

    pub fn data_group(mut self, group: impl Into<String>) -> Self {
        insert(&mut self.data_groups, group.into());
        self
    }

    pub fn basin_group(mut self, group: BasinGroup) -> Self {
        insert(&mut self.basin_groups, group);
        self
    }

    pub fn basin_id(mut self, id: impl Into<BasinId>) -> Self {
        insert(&mut self.basin_ids, id.into());
        self
    }

    /// Select any of `ids`. An empty iterator selects nothing.
    pub fn basin_ids<I, B>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<BasinId>,
    {
        let set = self.basin_ids.get_or_insert_with(BTreeSet::new);
        set.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn kind(mut self, kind: SeriesKind) -> Self {
        insert(&mut self.kinds, kind);
        self
    }

    pub fn aggregated(mut self, aggregated: bool) -> Self {
        self.aggregated = Some(aggregated);
        self
    }

    pub fn computed(mut self, computed: bool) -> Self {
        self.computed = Some(computed);
        self
    }

    pub fn merged(mut self, merged: bool) -> Self {
        self.merged = Some(merged);
        self
    }

    /// Whether `series` passes every active constraint.
    pub fn matches(&self, series: &Series) -> bool {
        let info = series.info();
        passes(&self.users, info.user.as_ref())
            && passes(&self.user_groups, info.user_group.as_ref())
            && passes(&self.data_groups, info.data_group.as_ref())
            && passes(&self.basin_groups, Some(&info.basin_group))
            && passes(&self.basin_ids, Some(&info.basin_id))
            && passes(&self.kinds, Some(&series.kind()))
            && self.computed.map_or(true, |c| c == info.computed)
            && self.merged.map_or(true, |m| m == info.merged)
            && self.aggregated.map_or(true, |a| a == info.aggregated)
    }
}
