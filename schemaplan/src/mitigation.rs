//! Mitigation injector: compensating steps next to risky ones.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::step::{RiskLevel, Step, StepKind, StepPayload};

pub const VIEW_SHIM_NOTES: &str = "expose legacy field via view during transition";
pub const DROP_BACKFILL_NOTES: &str = "copy legacy data to new destination before dropping";
pub const NOT_NULL_BACKFILL_NOTES: &str =
    "populate null values or establish a default before enforcing NOT NULL";

/// Where injected steps land relative to the step that triggered them.
///
/// `After` is the historical behavior and the default. `Before` is for
/// executors that apply steps strictly in sequence, where a shim or backfill
/// is only useful if it exists before the column is removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MitigationPlacement {
    #[default]
    After,
    Before,
}

impl fmt::Display for MitigationPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MitigationPlacement::After => write!(f, "after"),
            MitigationPlacement::Before => write!(f, "before"),
        }
    }
}

impl FromStr for MitigationPlacement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "after" => Ok(MitigationPlacement::After),
            "before" => Ok(MitigationPlacement::Before),
            other => Err(format!(
                "unknown mitigation placement '{other}' (expected 'after' or 'before')"
            )),
        }
    }
}

/// Walk classified steps and splice in view shims and backfills.
pub fn inject_mitigations(steps: Vec<Step>, placement: MitigationPlacement) -> Vec<Step> {
    let mut output = Vec::with_capacity(steps.len());
    let mut injected = 0usize;

    for step in steps {
        let mitigations = mitigations_for(&step);
        injected += mitigations.len();
        match placement {
            MitigationPlacement::After => {
                output.push(step);
                output.extend(mitigations);
            }
            MitigationPlacement::Before => {
                output.extend(mitigations);
                output.push(step);
            }
        }
    }

    log::debug!("mitigation: injected {injected} step(s), placement {placement}");
    output
}

/// Compensating steps for one classified step; empty when none apply.
pub fn mitigations_for(step: &Step) -> Vec<Step> {
    let risk = step.risk.unwrap_or(RiskLevel::None);

    match step.kind {
        StepKind::DropField if risk >= RiskLevel::High => {
            let (Some(target), Some(model), Some(field)) =
                (step.target.as_deref(), step.target_owner(), step.target_member())
            else {
                return Vec::new();
            };
            vec![
                Step::new(StepKind::CreateViewShim, model)
                    .with_risk(RiskLevel::Low)
                    .with_notes(VIEW_SHIM_NOTES)
                    .with_payload(StepPayload::ViewShim {
                        expose_field: field.to_string(),
                    }),
                Step::new(StepKind::Backfill, target)
                    .with_risk(RiskLevel::Medium)
                    .with_notes(DROP_BACKFILL_NOTES),
            ]
        }
        StepKind::SetNotNull if risk == RiskLevel::High => match step.target.as_deref() {
            Some(target) => vec![
                Step::new(StepKind::Backfill, target)
                    .with_risk(RiskLevel::Medium)
                    .with_notes(NOT_NULL_BACKFILL_NOTES),
            ],
            None => Vec::new(),
        },
        StepKind::DropField
        | StepKind::SetNotNull
        | StepKind::AddEnum
        | StepKind::AddEnumValue
        | StepKind::AddModel
        | StepKind::AddField
        | StepKind::AlterField
        | StepKind::SetNullable
        | StepKind::DropIndex
        | StepKind::AddIndex
        | StepKind::DropModel
        | StepKind::DropEnumValue
        | StepKind::DropEnum
        | StepKind::CreateViewShim
        | StepKind::Backfill => Vec::new(),
    }
}
