//! Skycoin command line client
//!
//! A thin shell over the library: wallet address generation and key import,
//! address verification, raw transaction creation and decoding, and node
//! status.
//!
//! ## Usage
//! ```bash
//! # Generate two addresses in $WALLET_DIR/$WALLET_NAME and print them as JSON
//! skycoin-cli generateAddresses -n 2 -j
//!
//! # Encrypted wallets need the password
//! skycoin-cli generateAddresses -n 1 -p pwd
//!
//! # Import a secret key into the wallet
//! skycoin-cli addPrivateKey <64 hex chars>
//!
//! # Sign a transaction sending 1.5 coins, printing its hex encoding
//! skycoin-cli createRawTransaction 2THDupTBEo7UqB6dsVizkYUvkKq82Qn4gjf 1.5
//!
//! # Check an address
//! skycoin-cli verifyAddress 2THDupTBEo7UqB6dsVizkYUvkKq82Qn4gjf
//!
//! # Decode a hex encoded transaction
//! skycoin-cli decodeRawTransaction dc00000000...
//!
//! # Node status, using SKYCOIN_NODE_HOST or RPC_ADDR
//! skycoin-cli status
//! ```
//!
//! Environment: `WALLET_DIR`, `WALLET_NAME`, `SKYCOIN_NODE_HOST` (or `RPC_ADDR`),
//! `SKYCOIN_REQUEST_TIMEOUT_SECS`.

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use lightweight_skycoin_libs::{
    client::{HttpNodeClient, NodeClient},
    config::ClientConfig,
    errors::{SkyWalletError, SkyWalletResult},
    data_structures::droplet,
    logging::{init_logging, LogLevel},
    wallet::{create_raw_tx, SendAmount},
    Address, Transaction, Wallet,
};

/// Exit status for a transaction that cannot be decoded
const EXIT_DECODE_FAILURE: i32 = 255;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Log level: debug, info, notice, warn, error, fatal, panic
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate new addresses in the configured wallet
    #[command(name = "generateAddresses")]
    GenerateAddresses {
        /// Number of addresses to generate
        #[arg(short = 'n', long = "num", default_value = "1")]
        num: u64,

        /// Print the addresses as JSON
        #[arg(short = 'j', long = "json")]
        json: bool,

        /// Wallet password, required for encrypted wallets
        #[arg(short = 'p', long = "password")]
        password: Option<String>,
    },

    /// Add a hex encoded secret key to the configured wallet
    #[command(name = "addPrivateKey")]
    AddPrivateKey {
        private_key: String,

        /// Wallet password, required for encrypted wallets
        #[arg(short = 'p', long = "password")]
        password: Option<String>,
    },

    /// Create and sign a transaction from the configured wallet
    #[command(name = "createRawTransaction")]
    CreateRawTransaction {
        /// Destination address
        to_address: String,

        /// Amount in coins, at most three decimal places
        amount: String,

        /// Spend only from this wallet address
        #[arg(short = 'a', long = "address")]
        from_address: Option<String>,

        /// Change address; defaults to the source address, or the wallet's first
        #[arg(short = 'c', long = "change-address")]
        change_address: Option<String>,

        /// Wallet password, required for encrypted wallets
        #[arg(short = 'p', long = "password")]
        password: Option<String>,

        /// Print the transaction as JSON
        #[arg(short = 'j', long = "json")]
        json: bool,
    },

    /// Verify a Skycoin address
    #[command(name = "verifyAddress")]
    VerifyAddress {
        address: String,
    },

    /// Decode a hex encoded raw transaction
    #[command(name = "decodeRawTransaction")]
    DecodeRawTransaction {
        raw_tx: String,
    },

    /// Show the node's blockchain status
    #[command(name = "status")]
    Status,
}

/// Error message plus the process exit status to report it with
struct CliFailure {
    message: String,
    code: i32,
}

impl From<SkyWalletError> for CliFailure {
    fn from(err: SkyWalletError) -> Self {
        CliFailure {
            message: err.to_string(),
            code: 1,
        }
    }
}

fn to_json_pretty<T: Serialize>(value: &T) -> SkyWalletResult<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| SkyWalletError::internal(e.to_string()))
}

fn generate_addresses(num: u64, json: bool, password: Option<String>) -> Result<String, CliFailure> {
    let config = ClientConfig::from_env()?;
    let path = config.wallet_path()?;
    let mut wallet = Wallet::load(&path)?;

    let addresses = match (wallet.is_encrypted(), password) {
        (true, Some(password)) => {
            wallet.generate_addresses_with_password(num, password.as_bytes())?
        }
        (true, None) => return Err(SkyWalletError::MissingPassword.into()),
        (false, Some(_)) => return Err(SkyWalletError::WalletNotEncrypted.into()),
        (false, None) => wallet.generate_addresses(num)?,
    };
    wallet.save_to(&path)?;
    debug!("Generated {} addresses in {}", addresses.len(), path.display());

    let rendered: Vec<String> = addresses.iter().map(Address::to_string).collect();
    if json {
        Ok(to_json_pretty(&json!({ "addresses": rendered }))?)
    } else {
        Ok(rendered.join(","))
    }
}

fn add_private_key(private_key: &str, password: Option<String>) -> Result<String, CliFailure> {
    let config = ClientConfig::from_env()?;
    let path = config.wallet_path()?;
    let mut wallet = Wallet::load(&path)?;

    let address = match (wallet.is_encrypted(), password) {
        (true, Some(password)) => {
            wallet.add_private_key_with_password(private_key, password.as_bytes())?
        }
        (true, None) => return Err(SkyWalletError::MissingPassword.into()),
        (false, Some(_)) => return Err(SkyWalletError::WalletNotEncrypted.into()),
        (false, None) => wallet.add_private_key(private_key)?,
    };
    wallet.save_to(&path)?;
    debug!("Added {} to {}", address, path.display());
    Ok("success".to_string())
}

fn parse_address(address: &str) -> SkyWalletResult<Address> {
    Ok(address.trim().parse::<Address>()?)
}

struct RawTransactionArgs {
    to_address: String,
    amount: String,
    from_address: Option<String>,
    change_address: Option<String>,
    password: Option<String>,
    json: bool,
}

async fn create_raw_transaction(args: RawTransactionArgs) -> Result<String, CliFailure> {
    let config = ClientConfig::from_env()?;
    let wallet = Wallet::load(config.wallet_path()?)?;
    let client = HttpNodeClient::from_config(&config)?;

    let to = SendAmount {
        address: parse_address(&args.to_address)?,
        coins: droplet::from_string(&args.amount)?,
    };
    let from: Vec<Address> = match &args.from_address {
        Some(addr) => vec![parse_address(addr)?],
        None => Vec::new(),
    };
    let change = match (&args.change_address, from.first(), wallet.addresses().first()) {
        (Some(addr), _, _) => parse_address(addr)?,
        (None, Some(addr), _) | (None, None, Some(addr)) => *addr,
        (None, None, None) => {
            return Err(SkyWalletError::invalid_argument("wallet has no addresses").into())
        }
    };
    if !wallet.is_encrypted() && args.password.is_some() {
        return Err(SkyWalletError::WalletNotEncrypted.into());
    }
    let password = args.password.unwrap_or_default();

    let txn = create_raw_tx(&client, &wallet, &from, &change, &[to], password.as_bytes()).await?;
    let raw = txn.encode_hex();
    if args.json {
        Ok(to_json_pretty(&json!({ "rawtx": raw }))?)
    } else {
        Ok(raw)
    }
}

fn verify_address(address: &str) -> Result<(), CliFailure> {
    address
        .parse::<Address>()
        .map(|_| ())
        .map_err(|e| SkyWalletError::from(e).into())
}

fn decode_raw_transaction(raw_tx: &str) -> Result<String, CliFailure> {
    let txn = Transaction::decode_raw(raw_tx).map_err(|e| CliFailure {
        message: format!("invalid raw transaction: {}", e),
        code: EXIT_DECODE_FAILURE,
    })?;
    Ok(to_json_pretty(&txn.to_readable())?)
}

async fn status() -> Result<String, CliFailure> {
    let config = ClientConfig::from_env()?;
    let client = HttpNodeClient::from_config(&config)?;
    let metadata = client.blockchain_metadata().await?;
    let version = client.version().await?;

    Ok(to_json_pretty(&json!({
        "running": true,
        "num_of_blocks": metadata.head.seq + 1,
        "hash_of_last_block": metadata.head.block_hash,
        "time_since_last_block": metadata.time_since_last_block,
        "unspents": metadata.unspents,
        "unconfirmed": metadata.unconfirmed,
        "version": version,
        "rpc_address": config.node_url,
    }))?)
}

async fn run(args: CliArgs) -> Result<Option<String>, CliFailure> {
    match args.command {
        Command::GenerateAddresses {
            num,
            json,
            password,
        } => generate_addresses(num, json, password).map(Some),
        Command::AddPrivateKey {
            private_key,
            password,
        } => add_private_key(&private_key, password).map(Some),
        Command::CreateRawTransaction {
            to_address,
            amount,
            from_address,
            change_address,
            password,
            json,
        } => create_raw_transaction(RawTransactionArgs {
            to_address,
            amount,
            from_address,
            change_address,
            password,
            json,
        })
        .await
        .map(Some),
        Command::VerifyAddress { address } => verify_address(&address).map(|_| None),
        Command::DecodeRawTransaction { raw_tx } => decode_raw_transaction(&raw_tx).map(Some),
        Command::Status => status().await.map(Some),
    }
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    let level = match args.log_level.parse::<LogLevel>() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    init_logging(level);

    match run(args).await {
        Ok(Some(output)) => println!("{}", output),
        Ok(None) => {}
        Err(failure) => {
            eprintln!("{}", failure.message);
            std::process::exit(failure.code);
        }
    }
}
