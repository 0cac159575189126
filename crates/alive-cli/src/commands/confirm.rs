use clap::Subcommand;

use alive_core::{DayMintRequest, FinalConfirmRequest, MilestoneConfirmRequest, TxConfirmRequest};

use crate::common::{open_service, print_json};

#[derive(Subcommand)]
pub enum ConfirmAction {
    /// Attach a proof-submission transaction to a log
    Tx {
        #[arg(long)]
        log_id: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        tx_hash: String,
        #[arg(long)]
        chain_id: i64,
        #[arg(long)]
        contract_address: String,
        #[arg(long)]
        block_number: Option<i64>,
    },
    /// Record a day-reward mint for a log
    Day {
        #[arg(long)]
        address: String,
        #[arg(long)]
        log_id: String,
        #[arg(long)]
        tx_hash: String,
    },
    /// Record a milestone mint (id 1, 2 or 3)
    Milestone {
        #[arg(long)]
        address: String,
        #[arg(long)]
        id: u8,
        #[arg(long)]
        tx_hash: String,
    },
    /// Record the final badge mint
    Final {
        #[arg(long)]
        address: String,
        #[arg(long)]
        tx_hash: String,
    },
}

pub fn run(action: ConfirmAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut svc = open_service()?;
    match action {
        ConfirmAction::Tx {
            log_id,
            address,
            tx_hash,
            chain_id,
            contract_address,
            block_number,
        } => {
            let snapshot = svc.confirm_tx(TxConfirmRequest {
                log_id,
                address,
                tx_hash,
                chain_id,
                contract_address,
                block_number,
            })?;
            print_json(&snapshot)
        }
        ConfirmAction::Day {
            address,
            log_id,
            tx_hash,
        } => {
            let snapshot = svc.confirm_day_mint(DayMintRequest {
                address,
                log_id,
                tx_hash,
            })?;
            print_json(&snapshot)
        }
        ConfirmAction::Milestone {
            address,
            id,
            tx_hash,
        } => {
            let milestones = svc.confirm_milestone(MilestoneConfirmRequest {
                address,
                milestone_id: id,
                tx_hash,
            })?;
            print_json(&milestones)
        }
        ConfirmAction::Final { address, tx_hash } => {
            let snapshot = svc.confirm_final(FinalConfirmRequest { address, tx_hash })?;
            print_json(&snapshot)
        }
    }
}
