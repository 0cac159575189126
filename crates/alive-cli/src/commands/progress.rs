use clap::Args;

use crate::common::{open_service, print_json};

#[derive(Args)]
pub struct ProgressArgs {
    /// Participant address
    #[arg(long)]
    pub address: String,
}

pub fn run(args: ProgressArgs) -> Result<(), Box<dyn std::error::Error>> {
    let svc = open_service()?;
    let snapshot = svc.progress(&args.address)?;
    print_json(&snapshot)
}
