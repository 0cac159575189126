use clap::Args;

use alive_core::CheckinRequest;

use crate::common::{open_service, print_json};

#[derive(Args)]
pub struct CheckinArgs {
    /// Participant address (0x + 40 hex digits)
    #[arg(long)]
    pub address: String,
    /// Reflection text for today
    #[arg(long)]
    pub text: Option<String>,
    /// Image reference (recorded, not processed)
    #[arg(long)]
    pub image_url: Option<String>,
    /// IANA timezone, defaults to the configured one
    #[arg(long)]
    pub timezone: Option<String>,
    /// Explicit calendar day (YYYY-MM-DD) instead of the clock
    #[arg(long)]
    pub date_key: Option<String>,
}

pub async fn run(args: CheckinArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut svc = open_service()?;
    let response = svc
        .checkin(CheckinRequest {
            address: args.address,
            text: args.text,
            image_url: args.image_url,
            timezone: args.timezone,
            date_key: args.date_key,
        })
        .await?;
    print_json(&response)
}
