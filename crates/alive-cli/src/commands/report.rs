use clap::Args;

use alive_core::ReportRange;

use crate::common::{open_service, print_json};

#[derive(Args)]
pub struct ReportArgs {
    /// Participant address
    #[arg(long)]
    pub address: String,
    /// Report range: week or final
    #[arg(long, default_value = "week")]
    pub range: String,
}

pub async fn run(args: ReportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let range = ReportRange::parse(&args.range)?;
    let svc = open_service()?;
    let report = svc.report(&args.address, range).await?;
    print_json(&report)
}
