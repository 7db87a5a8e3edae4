use color_eyre::eyre::{
    Result,
    eyre,
};
use ggc_client::{
    Choice,
    ConfigStore,
    ContractConfig,
    Environment,
    GameSession,
    HttpChainClient,
    ObjectId,
    RoundPhase,
    TerminalSink,
    config,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: ggc-client [--devnet | --testnet | --local] [--rpc-url <url>]\n\
         [--address <0x..>] [--config <path>] <command>\n\
         \n\
         Commands:\n\
           balance                      Show wallet, house and pool balances\n\
           house <rock|paper|scissors>  Wager native coin on the house game\n\
           pool <rock|paper|scissors>   Wager GGC on the pool game\n\
           faucet                       Claim GGC from the faucet\n\
           deposit-house <raw-amount>   Top up the house (raw native units)\n\
           deposit-pool                 Top up the pool\n\
           payout <recipient>           Operator payout from the pool\n\
         \n\
         Flags:\n\
           --devnet            Connect to devnet (default RPC {})\n\
           --testnet           Connect to testnet (default RPC {})\n\
           --local             Connect to a local node (default RPC {})\n\
           --rpc-url <url>     Override the RPC URL for the selected network\n\
           --address <0x..>    Account the signing gateway holds keys for\n\
           --config <path>     Load contract config from an explicit file",
        config::DEFAULT_DEVNET_RPC_URL,
        config::DEFAULT_TESTNET_RPC_URL,
        config::DEFAULT_LOCAL_RPC_URL,
    );
    std::process::exit(0);
}

enum CliCommand {
    Balance,
    House(Choice),
    Pool(Choice),
    Faucet,
    DepositHouse(u64),
    DepositPool,
    Payout(ObjectId),
}

struct CliArgs {
    env: Environment,
    rpc_url: Option<String>,
    address: Option<ObjectId>,
    config_path: Option<PathBuf>,
    command: CliCommand,
}

fn parse_cli_args() -> Result<CliArgs> {
    let mut args = std::env::args().skip(1);
    let mut env: Option<Environment> = None;
    let mut rpc_url: Option<String> = None;
    let mut address: Option<ObjectId> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut words: Vec<String> = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--devnet" | "--testnet" | "--local" => {
                if env.is_some() {
                    return Err(eyre!(
                        "Multiple network flags provided; choose one of --devnet/--testnet/--local"
                    ));
                }
                env = Some(match arg.as_str() {
                    "--devnet" => Environment::Dev,
                    "--testnet" => Environment::Test,
                    _ => Environment::Local,
                });
            }
            "--rpc-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--rpc-url requires a URL argument"))?;
                if rpc_url.is_some() {
                    return Err(eyre!("--rpc-url may only be specified once"));
                }
                rpc_url = Some(url);
            }
            "--address" => {
                let raw = args
                    .next()
                    .ok_or_else(|| eyre!("--address requires an account argument"))?;
                if address.is_some() {
                    return Err(eyre!("--address may only be specified once"));
                }
                address = Some(
                    raw.parse()
                        .map_err(|e| eyre!("invalid --address value: {e}"))?,
                );
            }
            "--config" => {
                let raw = args
                    .next()
                    .ok_or_else(|| eyre!("--config requires a path argument"))?;
                if config_path.is_some() {
                    return Err(eyre!("--config may only be specified once"));
                }
                let expanded = shellexpand::tilde(&raw);
                config_path = Some(PathBuf::from(expanded.into_owned()));
            }
            "--help" | "-h" => print_usage_and_exit(),
            other if other.starts_with("--") => {
                return Err(eyre!("Unknown flag: {other}"));
            }
            _ => words.push(arg),
        }
    }

    let command = parse_command(&words)?;
    let env = env.ok_or_else(|| {
        eyre!("Select a network with --devnet, --testnet, or --local")
    })?;

    Ok(CliArgs {
        env,
        rpc_url,
        address,
        config_path,
        command,
    })
}

fn parse_command(words: &[String]) -> Result<CliCommand> {
    let mut words = words.iter();
    let Some(head) = words.next() else {
        return Err(eyre!("Missing command; run with --help for usage"));
    };
    let command = match head.as_str() {
        "balance" => CliCommand::Balance,
        "house" | "pool" => {
            let raw = words
                .next()
                .ok_or_else(|| eyre!("{head} requires a choice: rock, paper or scissors"))?;
            let choice: Choice = raw
                .parse()
                .map_err(|_| eyre!("unknown choice `{raw}`; expected rock, paper or scissors"))?;
            if head.as_str() == "house" {
                CliCommand::House(choice)
            } else {
                CliCommand::Pool(choice)
            }
        }
        "faucet" => CliCommand::Faucet,
        "deposit-house" => {
            let raw = words
                .next()
                .ok_or_else(|| eyre!("deposit-house requires a raw amount"))?;
            let amount = raw
                .parse()
                .map_err(|_| eyre!("invalid deposit amount `{raw}`"))?;
            CliCommand::DepositHouse(amount)
        }
        "deposit-pool" => CliCommand::DepositPool,
        "payout" => {
            let raw = words
                .next()
                .ok_or_else(|| eyre!("payout requires a recipient address"))?;
            let recipient = raw
                .parse()
                .map_err(|e| eyre!("invalid recipient address: {e}"))?;
            CliCommand::Payout(recipient)
        }
        other => return Err(eyre!("Unknown command: {other}")),
    };
    if let Some(extra) = words.next() {
        return Err(eyre!("Unexpected argument: {extra}"));
    }
    Ok(command)
}

fn load_contract_config(cli: &CliArgs) -> Result<ContractConfig> {
    let mut contract = match &cli.config_path {
        // An explicit file bypasses the store; leave the tree untouched.
        Some(path) => ContractConfig::load(path)?,
        None => {
            config::ensure_structure()?;
            ConfigStore::new(cli.env)?.load_or_default()?
        }
    };
    if let Some(url) = &cli.rpc_url {
        contract.rpc_url = url.clone();
    }
    Ok(contract)
}

fn print_summary<C, N>(session: &GameSession<C, N>) {
    let native = session.native_balance();
    let token = session.token_balance();
    println!(
        "wallet: {} native / {} GGC{}",
        native.display(),
        token.display(),
        if native.stale || token.stale {
            " (stale)"
        } else {
            ""
        }
    );
    println!(
        "house: {} raw | pool: {} raw",
        session.house_balance(),
        session.pool_balance()
    );
    let scores = session.scores();
    println!(
        "score: {} won / {} lost / {} drawn",
        scores.wins, scores.losses, scores.draws
    );
}

fn print_round_result<C, N>(session: &GameSession<C, N>) {
    if let RoundPhase::Resolved {
        choice,
        house_choice,
        outcome,
    } = session.phase()
    {
        match house_choice {
            Some(house) => println!("{choice} vs {house}: {outcome:?}"),
            None => println!("{choice}: {outcome:?}"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let cli = parse_cli_args()?;
    let contract = load_contract_config(&cli)?;

    tracing::info!(rpc_url = %contract.rpc_url, env = %cli.env, "connecting");
    let client = HttpChainClient::new(contract.rpc_url.clone())?;
    let mut session = GameSession::new(client, TerminalSink, contract);
    if let Some(address) = cli.address {
        session.connect(address);
    }
    session.refresh().await;

    match cli.command {
        CliCommand::Balance => {}
        CliCommand::House(choice) => {
            session.play_house_round(choice).await?;
            print_round_result(&session);
            session.confirm_round();
        }
        CliCommand::Pool(choice) => {
            session.play_pool_round(choice).await?;
            print_round_result(&session);
            session.confirm_round();
        }
        CliCommand::Faucet => session.claim_faucet().await?,
        CliCommand::DepositHouse(amount) => session.deposit_to_house(amount).await?,
        CliCommand::DepositPool => session.deposit_to_pool().await?,
        CliCommand::Payout(recipient) => session.request_payout(recipient).await?,
    }

    print_summary(&session);
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn parse_command__maps_words_to_commands() {
        let words = vec!["house".to_string(), "rock".to_string()];

        assert!(matches!(
            parse_command(&words),
            Ok(CliCommand::House(Choice::Rock))
        ));
    }

    #[test]
    fn parse_command__rejects_trailing_arguments() {
        let words = vec!["balance".to_string(), "extra".to_string()];

        assert!(parse_command(&words).is_err());
    }

    #[test]
    fn load_contract_config__explicit_file_bypasses_the_store() {
        let dir = std::env::temp_dir().join(format!("ggc-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("client.json");
        let mut on_disk = ContractConfig::for_env(Environment::Local);
        on_disk.rpc_url = "http://config-file:9000".to_string();
        std::fs::write(&path, serde_json::to_string(&on_disk).unwrap()).unwrap();
        let cli = CliArgs {
            env: Environment::Test,
            rpc_url: Some("http://flag-override:9000".to_string()),
            address: None,
            config_path: Some(path),
            command: CliCommand::Balance,
        };

        let contract = load_contract_config(&cli).unwrap();

        // the file was honored, the flag override applied on top
        assert_eq!(contract.rpc_url, "http://flag-override:9000");
        assert_eq!(contract.package_id, on_disk.package_id);
    }
}
