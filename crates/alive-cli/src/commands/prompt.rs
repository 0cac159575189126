use clap::Args;

use crate::common::print_json;

#[derive(Args)]
pub struct PromptArgs {
    /// Challenge day, 1 through 28
    #[arg(long)]
    pub day: u8,
}

pub fn run(args: PromptArgs) -> Result<(), Box<dyn std::error::Error>> {
    let task = alive_core::tasks::task_for_day(args.day)?;
    print_json(task)
}
