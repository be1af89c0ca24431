use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use schemaplan::{MitigationPlacement, Plan, PlanOptions, RiskLevel, enforce_strict, plan_migration};

use crate::commands::load_ref;
use crate::context::ProjectContext;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;
use crate::theme::THEME;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Plan a Migration",
        commands: &[
            "schemaplan plan --from schema.v1.json --to schema.v2.json",
            "schemaplan --output table plan --from prod.snapshot.json --to schema.json",
        ],
    },
    ExampleGroup {
        title: "Gate Destructive Changes",
        commands: &[
            "schemaplan plan --from a.json --to b.json --strict        # exit 1 on DESTRUCTIVE",
            "schemaplan plan --from a.json --to b.json --known-empty User.legacy",
        ],
    },
    ExampleGroup {
        title: "Mitigation Placement",
        commands: &["schemaplan plan --from a.json --to b.json --mitigations before"],
    },
];

#[derive(Args)]
pub struct PlanArgs {
    /// Schema or snapshot file describing the current state
    #[arg(long, value_name = "SNAPSHOT_REF")]
    pub from: PathBuf,

    /// Schema or snapshot file describing the desired state
    #[arg(long, value_name = "SNAPSHOT_REF")]
    pub to: PathBuf,

    /// Exit with code 1 when any step is DESTRUCTIVE
    #[arg(long, conflicts_with = "allow_destructive")]
    pub strict: bool,

    /// Override a strict setting from the config file
    #[arg(long)]
    pub allow_destructive: bool,

    /// Target known to hold no data, e.g. User.legacy (repeatable)
    #[arg(long = "known-empty", value_name = "TARGET")]
    pub known_empty: Vec<String>,

    /// Place mitigation steps after (default) or before their trigger
    #[arg(long, value_name = "after|before")]
    pub mitigations: Option<MitigationPlacement>,
}

impl PlanArgs {
    fn options(&self, ctx: &ProjectContext) -> PlanOptions {
        let mut hints = ctx.config.planner.hints();
        hints.known_empty.extend(self.known_empty.iter().cloned());
        PlanOptions {
            hints,
            placement: self.mitigations.unwrap_or(ctx.config.planner.mitigation_placement),
        }
    }

    fn strict(&self, ctx: &ProjectContext) -> bool {
        self.strict || (ctx.config.planner.strict && !self.allow_destructive)
    }
}

pub fn handle_plan(args: PlanArgs, ctx: &ProjectContext, output: &OutputManager) -> Result<()> {
    let from = load_ref(&args.from)?;
    let to = load_ref(&args.to)?;
    output.verbose(&format!("from {} ({})", args.from.display(), from.schema_hash));
    output.verbose(&format!("to   {} ({})", args.to.display(), to.schema_hash));

    let options = args.options(ctx);
    let plan = plan_migration(&from, &to, &options)?;
    output.display(&plan)?;

    report_summary(&plan, output);

    if args.strict(ctx) {
        enforce_strict(&plan)?;
    } else if plan.has_destructive() {
        output.warning(&format!(
            "Plan contains destructive steps: {}",
            plan.destructive_targets().join(", ")
        ));
    }

    Ok(())
}

fn report_summary(plan: &Plan, output: &OutputManager) {
    if plan.is_empty() {
        output.success("Schemas are identical; nothing to migrate");
        return;
    }

    let max = plan.max_risk().unwrap_or(RiskLevel::None);
    let label = if output.options.no_color {
        max.to_string()
    } else {
        max.as_str().color(THEME.risk(max)).bold().to_string()
    };
    output.info(&format!(
        "{} step(s) incl. {} mitigation(s), highest risk {label}",
        plan.steps.len(),
        plan.mitigation_count()
    ));
    for risk in RiskLevel::ALL.iter().rev() {
        let count = plan.count(*risk);
        if count > 0 {
            output.bullet(&format!("{risk}: {count}"));
        }
    }
}
