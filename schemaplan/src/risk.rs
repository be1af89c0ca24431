//! Risk classifier: static table refined by snapshot context.
//!
//! The classifier has no live-data visibility. Anything that may discard data
//! is `Destructive` unless the operator supplied a "known empty" hint for it.

use std::collections::BTreeSet;

use crate::schema::Field;
use crate::snapshot::Snapshot;
use crate::step::{RiskLevel, Step, StepKind, StepPayload};

/// Operator-supplied facts about live data the planner cannot observe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RiskHints {
    /// Targets (`Model.field`, `Enum.VALUE`) known to hold no data
    pub known_empty: BTreeSet<String>,
}

impl RiskHints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn known_empty<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known_empty: targets.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_known_empty(&self, target: Option<&str>) -> bool {
        target.is_some_and(|t| self.known_empty.contains(t))
    }
}

/// Everything classification may consult besides the step itself.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyContext<'a> {
    pub from: &'a Snapshot,
    pub to: &'a Snapshot,
    pub hints: &'a RiskHints,
}

impl<'a> ClassifyContext<'a> {
    pub fn new(from: &'a Snapshot, to: &'a Snapshot, hints: &'a RiskHints) -> Self {
        Self { from, to, hints }
    }
}

/// Assign a risk level to one step. Pure; never looks at neighbouring steps.
pub fn classify(step: &Step, ctx: &ClassifyContext<'_>) -> RiskLevel {
    match step.kind {
        StepKind::AddModel | StepKind::AddEnum => RiskLevel::None,
        StepKind::AddEnumValue | StepKind::AddIndex => RiskLevel::Low,
        StepKind::AddField => classify_added_field(step, ctx),
        StepKind::AlterField => classify_altered_field(step, ctx),
        StepKind::SetNullable | StepKind::DropIndex => RiskLevel::Low,
        StepKind::SetNotNull => RiskLevel::High,
        StepKind::DropField | StepKind::DropEnumValue => {
            if ctx.hints.is_known_empty(step.target.as_deref()) {
                RiskLevel::High
            } else {
                RiskLevel::Destructive
            }
        }
        StepKind::DropModel | StepKind::DropEnum => RiskLevel::Destructive,
        StepKind::CreateViewShim => RiskLevel::Low,
        StepKind::Backfill => RiskLevel::Medium,
    }
}

/// Classify every step in place of its unset risk, preserving order.
pub fn classify_steps(steps: Vec<Step>, ctx: &ClassifyContext<'_>) -> Vec<Step> {
    steps
        .into_iter()
        .map(|step| {
            let risk = classify(&step, ctx);
            log::trace!("classify: {} {:?} -> {risk}", step.kind, step.target);
            if risk == RiskLevel::Destructive {
                log::warn!(
                    "destructive step: {} {}",
                    step.kind,
                    step.target.as_deref().unwrap_or_default()
                );
            }
            step.with_risk(risk)
        })
        .collect()
}

fn classify_added_field(step: &Step, ctx: &ClassifyContext<'_>) -> RiskLevel {
    let field = lookup_field(ctx.to, step).or(match &step.payload {
        Some(StepPayload::Field(field)) => Some(field),
        _ => None,
    });

    match field {
        Some(field) if field.is_optional() => RiskLevel::Low,
        // Required with no default: fails on non-empty tables without a backfill.
        _ => RiskLevel::Medium,
    }
}

fn classify_altered_field(step: &Step, ctx: &ClassifyContext<'_>) -> RiskLevel {
    let gains_unique = match (lookup_field(ctx.from, step), lookup_field(ctx.to, step)) {
        (Some(old), Some(new)) => !old.is_unique && new.is_unique,
        _ => matches!(
            &step.payload,
            Some(StepPayload::AlterField { is_unique: Some(t), .. }) if !t.from && t.to
        ),
    };

    if gains_unique {
        RiskLevel::High
    } else {
        RiskLevel::Low
    }
}

fn lookup_field<'s>(snapshot: &'s Snapshot, step: &Step) -> Option<&'s Field> {
    let model = snapshot.model(step.target_owner()?)?;
    model.field(step.target_member()?)
}
