//! Schemaplan core library.
//!
//! Compares two versions of a data-model schema and produces a [`Plan`]: an
//! ordered, risk-annotated list of structural steps with compensating safety
//! steps injected next to anything that could destroy or corrupt live data.
//!
//! The pipeline is pure and synchronous:
//! `SchemaModel -> Snapshot -> diff -> classify -> inject mitigations -> Plan`.
//!
//! ```
//! use schemaplan::{Field, Model, PlanOptions, SchemaModel, make_snapshot, plan_migration};
//!
//! let from = make_snapshot(SchemaModel::new().with_model(
//!     Model::new("User").with_field(Field::new("id", "String")),
//! ))?;
//! let to = make_snapshot(SchemaModel::new().with_model(
//!     Model::new("User")
//!         .with_field(Field::new("id", "String"))
//!         .with_field(Field::new("age", "Int").nullable()),
//! ))?;
//!
//! let plan = plan_migration(&from, &to, &PlanOptions::default())?;
//! assert_eq!(plan.steps.len(), 1);
//! # Ok::<(), schemaplan::PlanError>(())
//! ```

pub mod baseline;
pub mod diff;
pub mod errors;
pub mod loader;
pub mod mitigation;
pub mod plan;
pub mod risk;
pub mod schema;
pub mod snapshot;
pub mod step;

pub use baseline::{
    Baseline, BaselineStore, DriftStatus, FileBaselineStore, MemoryBaselineStore, check_drift,
};
pub use diff::diff;
pub use errors::*;
pub use loader::{load_snapshot, parse_snapshot, write_snapshot};
pub use mitigation::{MitigationPlacement, inject_mitigations};
pub use plan::{Plan, PlanOptions, build_plan, enforce_strict, plan_migration};
pub use risk::{ClassifyContext, RiskHints, classify, classify_steps};
pub use schema::{EnumDef, Field, IndexDef, Model, SchemaModel};
pub use snapshot::{Snapshot, make_snapshot, schema_hash};
pub use step::{RiskLevel, Step, StepKind, StepPayload, Transition};
