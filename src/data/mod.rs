/// Data layer: core types, loading, filtering and statistics.
///
/// Architecture:
/// ```text
///  .xlsx / .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → ObservationTable (requires `Data`)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  date interval + stations → row indices
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌──────────┐  ┌─────────────┐
///   │ aggregate │  │ correlation │  yearly means / Spearman rho
///   └──────────┘  └─────────────┘
///        │              │
///        └──────┬───────┘
///               ▼
///         ┌──────────┐
///         │ pipeline  │  evaluate(table, selections) → Evaluation
///         └──────────┘
/// ```

pub mod aggregate;
pub mod correlation;
pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod pipeline;
