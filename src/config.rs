use crate::{
    error::{
        ClientError,
        Result,
    },
    tx::{
        CallTarget,
        ObjectId,
    },
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    fs,
    path::{
        Path,
        PathBuf,
    },
};

pub const CONFIG_ROOT: &str = ".ggc";
const CONFIG_FILE: &str = "client.json";

pub const DEFAULT_TESTNET_RPC_URL: &str = "https://fullnode.testnet.sui.io";
pub const DEFAULT_DEVNET_RPC_URL: &str = "https://fullnode.devnet.sui.io";
pub const DEFAULT_LOCAL_RPC_URL: &str = "http://localhost:9000/";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Environment {
    Dev,
    Test,
    Local,
}

impl Environment {
    pub fn dir_name(self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Test => "test",
            Environment::Local => "local",
        }
    }

    pub fn default_rpc_url(self) -> &'static str {
        match self {
            Environment::Dev => DEFAULT_DEVNET_RPC_URL,
            Environment::Test => DEFAULT_TESTNET_RPC_URL,
            Environment::Local => DEFAULT_LOCAL_RPC_URL,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Dev => "Devnet",
            Environment::Test => "Testnet",
            Environment::Local => "Local",
        };
        write!(f, "{name}")
    }
}

/// Every environment constant the client needs: the deployed package, the
/// two game modules, the shared objects they read and mutate, and the fixed
/// wagers. Loaded once at startup and immutable afterwards; nothing in here
/// is logic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractConfig {
    pub rpc_url: String,
    pub package_id: ObjectId,
    pub house_module: String,
    pub pool_module: String,
    pub house_object_id: ObjectId,
    pub pool_object_id: ObjectId,
    pub treasury_cap_id: ObjectId,
    pub faucet_object_id: ObjectId,
    /// System randomness object, fixed at 0x8.
    pub random_object_id: ObjectId,
    /// System clock object, fixed at 0x6.
    pub clock_object_id: ObjectId,
    pub token_coin_type: String,
    pub token_scale: u64,
    /// House-game wager in raw native units.
    pub house_wager: u64,
    /// Pool-game wager in raw token units.
    pub pool_wager: u64,
}

impl ContractConfig {
    /// Built-in defaults for the currently deployed testnet package; other
    /// environments start from the same shape and are expected to be
    /// overridden by a stored record.
    pub fn for_env(env: Environment) -> Self {
        let package_id: ObjectId =
            "0x8ca87bbc53db9ddd044c3e0b622bb1c86a04fd4d528ac278673996ad8dea904c"
                .parse()
                .expect("default package id is valid");
        Self {
            rpc_url: env.default_rpc_url().to_string(),
            package_id,
            house_module: "rps".to_string(),
            pool_module: "ggc".to_string(),
            house_object_id:
                "0xf16da9961209675d42cdba104d3a7f3ce0ff87f6615b71ecdec097e66b763fa1"
                    .parse()
                    .expect("default house id is valid"),
            pool_object_id:
                "0x3d6aa40b0f0e25aa4c4f13cf8cc0f2a7c53bd1aeea4fc6f03b4cf241908dcd27"
                    .parse()
                    .expect("default pool id is valid"),
            treasury_cap_id:
                "0xa1b970e9219dd4420ec9a33cbbadbff8a8f0f6f1c6b54f1fb55c1b7a82cd5e63"
                    .parse()
                    .expect("default treasury cap id is valid"),
            faucet_object_id:
                "0x5cf0a7b9e4dd3b76f9424b0cb2e16a8a2bcd49c20cfd32bc11a47f08d0c149ee"
                    .parse()
                    .expect("default faucet id is valid"),
            random_object_id: ObjectId::well_known(8),
            clock_object_id: ObjectId::well_known(6),
            token_coin_type: format!("{package_id}::ggc::GGC"),
            token_scale: 1_000_000_000,
            // 0.1 native coin.
            house_wager: 100_000_000,
            // 10 GGC.
            pool_wager: 10_000_000_000,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            ClientError::Config(format!("invalid config {}: {e}", path.display()))
        })
    }

    pub fn play_game_target(&self) -> CallTarget {
        CallTarget::new(self.package_id, &self.house_module, "play_game")
    }

    pub fn deposit_to_house_target(&self) -> CallTarget {
        CallTarget::new(self.package_id, &self.house_module, "deposit_to_house")
    }

    pub fn payout_target(&self) -> CallTarget {
        CallTarget::new(self.package_id, &self.pool_module, "payout")
    }

    pub fn claim_faucet_target(&self) -> CallTarget {
        CallTarget::new(self.package_id, &self.pool_module, "claim_faucet")
    }

    pub fn deposit_to_pool_target(&self) -> CallTarget {
        CallTarget::new(self.package_id, &self.pool_module, "deposit_to_pool")
    }

    pub fn play_target(&self) -> CallTarget {
        CallTarget::new(self.package_id, &self.pool_module, "play")
    }

    pub fn house_event_type(&self) -> String {
        format!("{}::{}::GameResult", self.package_id, self.house_module)
    }

    pub fn pool_event_type(&self) -> String {
        format!("{}::{}::GameResult", self.package_id, self.pool_module)
    }
}

/// Per-environment config records under `.ggc/<env>/client.json`, mirroring
/// how deployment records are kept next to the contracts they describe.
#[derive(Debug)]
pub struct ConfigStore {
    env: Environment,
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(env: Environment) -> Result<Self> {
        let path = ensure_store(env)?;
        Ok(Self { env, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored record if one exists, otherwise the built-in defaults for the
    /// environment.
    pub fn load_or_default(&self) -> Result<ContractConfig> {
        if self.path.exists() {
            ContractConfig::load(&self.path)
        } else {
            Ok(ContractConfig::for_env(self.env))
        }
    }

    pub fn save(&self, config: &ContractConfig) -> Result<()> {
        let raw = serde_json::to_string_pretty(config)
            .map_err(|e| ClientError::Config(format!("failed to encode config: {e}")))?;
        fs::write(&self.path, raw).map_err(|e| {
            ClientError::Config(format!("failed to write {}: {e}", self.path.display()))
        })
    }
}

pub fn ensure_structure() -> Result<()> {
    for env in [Environment::Dev, Environment::Test, Environment::Local] {
        ensure_store(env)?;
    }
    Ok(())
}

fn ensure_store(env: Environment) -> Result<PathBuf> {
    let dir = PathBuf::from(CONFIG_ROOT).join(env.dir_name());
    fs::create_dir_all(&dir).map_err(|e| {
        ClientError::Config(format!("failed to create {}: {e}", dir.display()))
    })?;
    Ok(dir.join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn config__defaults_parse_and_target_the_right_modules() {
        let config = ContractConfig::for_env(Environment::Test);

        assert_eq!(config.play_game_target().module, "rps");
        assert_eq!(config.play_game_target().function, "play_game");
        assert_eq!(config.claim_faucet_target().module, "ggc");
        assert!(config.pool_event_type().ends_with("::ggc::GameResult"));
        assert!(config.token_coin_type.ends_with("::ggc::GGC"));
    }

    #[test]
    fn config__round_trips_through_json() {
        let config = ContractConfig::for_env(Environment::Local);

        let raw = serde_json::to_string(&config).unwrap();
        let restored: ContractConfig = serde_json::from_str(&raw).unwrap();

        assert_eq!(restored, config);
    }

    #[test]
    fn config__system_objects_sit_at_reserved_addresses() {
        let config = ContractConfig::for_env(Environment::Dev);

        assert_eq!(config.clock_object_id, ObjectId::well_known(6));
        assert_eq!(config.random_object_id, ObjectId::well_known(8));
    }
}
