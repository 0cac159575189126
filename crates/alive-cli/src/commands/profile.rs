use clap::Args;

use crate::common::{open_service, print_json};

#[derive(Args)]
pub struct ProfileArgs {
    /// Participant address
    #[arg(long)]
    pub address: String,
    /// Display name
    #[arg(long)]
    pub display_name: Option<String>,
    /// Avatar URL
    #[arg(long)]
    pub avatar_url: Option<String>,
    /// IANA timezone (fixed once the challenge starts)
    #[arg(long, default_value = "UTC")]
    pub timezone: String,
}

pub fn run(args: ProfileArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut svc = open_service()?;
    let progress = svc.update_profile(
        &args.address,
        args.display_name,
        args.avatar_url,
        &args.timezone,
    )?;
    print_json(&progress)
}
