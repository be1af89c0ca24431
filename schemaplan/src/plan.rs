//! Plan aggregation and the end-to-end planning pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::diff::diff;
use crate::errors::{PlanError, PlanResult};
use crate::mitigation::{MitigationPlacement, inject_mitigations};
use crate::risk::{ClassifyContext, RiskHints, classify_steps};
use crate::snapshot::Snapshot;
use crate::step::{RiskLevel, Step};

/// Ordered, risk-annotated change list handed to an external executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub from_hash: String,
    pub to_hash: String,
    pub steps: Vec<Step>,
    /// Step count per risk level; every level is present, zeros included
    pub risk_summary: BTreeMap<RiskLevel, usize>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Highest risk carried by any step, `None` for an empty plan.
    pub fn max_risk(&self) -> Option<RiskLevel> {
        self.steps.iter().filter_map(|s| s.risk).max()
    }

    pub fn has_destructive(&self) -> bool {
        self.count(RiskLevel::Destructive) > 0
    }

    pub fn count(&self, risk: RiskLevel) -> usize {
        self.risk_summary.get(&risk).copied().unwrap_or(0)
    }

    /// Steps injected by the planner rather than derived from the diff.
    pub fn mitigation_count(&self) -> usize {
        self.steps.iter().filter(|s| s.kind.is_mitigation()).count()
    }

    /// Targets of every destructive step, in plan order.
    pub fn destructive_targets(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter(|s| s.risk == Some(RiskLevel::Destructive))
            .map(|s| s.target.clone().unwrap_or_else(|| s.kind.to_string()))
            .collect()
    }
}

/// Knobs for [`plan_migration`].
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    pub hints: RiskHints,
    pub placement: MitigationPlacement,
}

/// Assemble the final plan. Every step must already carry a risk level.
pub fn build_plan(from: &Snapshot, to: &Snapshot, steps: Vec<Step>) -> PlanResult<Plan> {
    let mut risk_summary: BTreeMap<RiskLevel, usize> =
        RiskLevel::ALL.iter().map(|r| (*r, 0)).collect();

    for step in &steps {
        let risk = step.risk.ok_or_else(|| PlanError::Unclassified {
            kind: step.kind,
            target: step.target.clone(),
        })?;
        *risk_summary.entry(risk).or_insert(0) += 1;
    }

    Ok(Plan {
        from_hash: from.schema_hash.clone(),
        to_hash: to.schema_hash.clone(),
        steps,
        risk_summary,
    })
}

/// Run the whole pipeline: diff, classify, inject mitigations, aggregate.
pub fn plan_migration(from: &Snapshot, to: &Snapshot, options: &PlanOptions) -> PlanResult<Plan> {
    let raw = diff(from, to)?;
    let ctx = ClassifyContext::new(from, to, &options.hints);
    let classified = classify_steps(raw, &ctx);
    let mitigated = inject_mitigations(classified, options.placement);
    let plan = build_plan(from, to, mitigated)?;

    log::debug!(
        "plan: {} step(s) incl. {} mitigation(s), max risk {}",
        plan.steps.len(),
        plan.mitigation_count(),
        plan.max_risk().map(|r| r.as_str()).unwrap_or("-")
    );
    Ok(plan)
}

/// Policy gate used by strict callers: refuse plans containing destructive steps.
pub fn enforce_strict(plan: &Plan) -> PlanResult<()> {
    if plan.has_destructive() {
        return Err(PlanError::DestructiveWithoutOverride {
            targets: plan.destructive_targets(),
        });
    }
    Ok(())
}
