//! Analytic queries over entity projections.
//!
//! ```text
//! EntityProjection(playerStats)
//!        │
//!        ▼ [translator]
//! time dimensions ─ dimensions ─ metrics
//! filter ──[split]──▶ WHERE / HAVING ──▶ HAVING metrics backfilled
//! WHERE ──[template]──▶ required filters checked, variables bound
//!        │
//!        ▼ [validator]
//! Query ──[cache_key]──▶ deterministic key + digest
//! ```

pub mod cache_key;
pub mod metadata;
pub mod query;
pub mod split;
pub mod template;
pub mod translator;
pub mod validator;

pub use metadata::{ArgumentDef, Column, ColumnKind, RequiredFilter, Table, TimeGrain, ValueType};
pub use query::{ColumnProjection, Query, TimeDimensionProjection};
pub use split::{split_filter, FilterSplit};
pub use template::match_template;
pub use translator::QueryTranslator;
pub use validator::{DefaultQueryValidator, QueryValidator};
