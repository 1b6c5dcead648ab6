// Entry point of the ledger CLI: parse arguments, build the config once,
// and hand it to the command handlers.
use clap::Parser;
use log::{error, LevelFilter};
use std::process;
use utxo_ledger::cli::handlers;
use utxo_ledger::{Command, Config, Opt, Result};

fn main() {
    // Info by default; RUST_LOG still overrides it
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run(opt: Opt) -> Result<()> {
    let config = Config::load(opt.config.as_deref())?;

    match opt.command {
        Command::Createblockchain { address } => {
            handlers::create_chain(&config, &address)?;
            println!("Done!");
        }
        Command::Createwallet => {
            let address = handlers::new_wallet(&config)?;
            println!("Your new address: {address}")
        }
        Command::GetBalance { address } => {
            let balance = handlers::get_balance(&config, &address)?;
            println!("Balance of {address}: {balance}");
        }
        Command::ListAddresses => {
            for address in handlers::list_addresses(&config)? {
                println!("{address}")
            }
        }
        Command::Send { from, to, amount } => {
            handlers::send(&config, &from, &to, amount)?;
            println!("Success!")
        }
        Command::Printchain => {
            handlers::print_chain(&config, &mut std::io::stdout().lock())?;
        }
    }
    Ok(())
}
