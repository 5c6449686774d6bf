/// Data layer: series types, identity, basin taxonomy, filtering and the
/// collection that the aggregation runs over.
///
/// Architecture:
/// ```text
///   loader records (RawRecord)
///        │
///        ▼
///   ┌──────────────┐
///   │   records     │  validate arrays → Series
///   └──────────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │  Collection   │  Vec<Arc<Series>>; merge, sum, average, sum_basins
///   └──────────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │    filter     │  identity predicates → shared sub-collections
///   └──────────────┘
/// ```

pub mod basins;
pub mod collection;
pub mod filter;
pub mod model;
pub mod records;
