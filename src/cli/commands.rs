use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "utxo-ledger")]
pub struct Opt {
    #[arg(
        long = "config",
        global = true,
        help = "TOML file with store locations, difficulty and subsidy"
    )]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "createblockchain", about = "Create a new blockchain")]
    Createblockchain {
        #[arg(help = "The address to send genesis block reward to")]
        address: String,
    },
    #[command(name = "createwallet", about = "Create a new wallet")]
    Createwallet,
    #[command(
        name = "getbalance",
        about = "Get the wallet balance of the target address"
    )]
    GetBalance {
        #[arg(help = "The wallet address")]
        address: String,
    },
    #[command(name = "listaddresses", about = "Print local wallet addresses")]
    ListAddresses,
    #[command(
        name = "send",
        about = "Send coins between addresses and mine the transfer into a block"
    )]
    Send {
        #[arg(help = "Source wallet address")]
        from: String,
        #[arg(help = "Destination wallet address")]
        to: String,
        #[arg(help = "Amount to send")]
        amount: u64,
    },
    #[command(name = "printchain", about = "Print all blocks in the blockchain")]
    Printchain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_send() {
        let opt = Opt::try_parse_from(["utxo-ledger", "send", "from", "to", "4"]).unwrap();
        assert!(opt.config.is_none());
        match opt.command {
            Command::Send { from, to, amount } => {
                assert_eq!(from, "from");
                assert_eq!(to, "to");
                assert_eq!(amount, 4);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_config_flag_is_global() {
        let opt = Opt::try_parse_from(["utxo-ledger", "printchain", "--config", "ledger.toml"])
            .unwrap();
        assert_eq!(opt.config, Some(PathBuf::from("ledger.toml")));
        assert!(matches!(opt.command, Command::Printchain));
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        assert!(Opt::try_parse_from(["utxo-ledger", "send", "a", "b", "-3"]).is_err());
    }
}
