use crate::commands::{baseline, hash, plan, snapshot};

#[derive(Clone, Copy)]
pub struct ExampleGroup {
    pub title: &'static str,
    pub commands: &'static [&'static str],
}

#[derive(Clone, Copy)]
pub struct CommandExample {
    pub name: &'static str,
    pub groups: &'static [ExampleGroup],
}

pub fn command_examples() -> &'static [CommandExample] {
    &[
        CommandExample {
            name: "plan",
            groups: plan::EXAMPLES,
        },
        CommandExample {
            name: "hash",
            groups: hash::EXAMPLES,
        },
        CommandExample {
            name: "snapshot",
            groups: snapshot::EXAMPLES,
        },
        CommandExample {
            name: "baseline",
            groups: baseline::EXAMPLES,
        },
    ]
}
