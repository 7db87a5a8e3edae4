use crate::error::{
    ClientError,
    Result,
};
use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};
use std::{
    fmt,
    str::FromStr,
};

/// 32-byte chain identifier. Addresses and object ids share one format;
/// short well-known ids ("0x6", "0x8") are left-padded to full width.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 32]);

/// Account addresses use the same 32-byte hex format as object ids.
pub type Address = ObjectId;

impl ObjectId {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Reserved system objects live at small fixed addresses (clock at 0x6,
    /// randomness at 0x8).
    pub const fn well_known(low: u8) -> Self {
        let mut bytes = [0u8; 32];
        bytes[31] = low;
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for ObjectId {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.is_empty() || digits.len() > 64 {
            return Err(ClientError::InvalidId(s.to_string()));
        }
        let padded = format!("{digits:0>64}");
        let raw =
            hex::decode(&padded).map_err(|_| ClientError::InvalidId(s.to_string()))?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&raw);
        Ok(Self(bytes))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({self})")
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// `package::module::function` entry-point identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallTarget {
    pub package: ObjectId,
    pub module: String,
    pub function: String,
}

impl CallTarget {
    pub fn new(
        package: ObjectId,
        module: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            package,
            module: module.into(),
            function: function.into(),
        }
    }
}

impl fmt::Display for CallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.package, self.module, self.function)
    }
}

impl FromStr for CallTarget {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split("::");
        let (Some(package), Some(module), Some(function), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ClientError::InvalidTarget(s.to_string()));
        };
        if module.is_empty() || function.is_empty() {
            return Err(ClientError::InvalidTarget(s.to_string()));
        }
        Ok(Self {
            package: package.parse()?,
            module: module.to_string(),
            function: function.to_string(),
        })
    }
}

/// A primitive argument value with its declared wire type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PureValue {
    Bool(bool),
    U8(u8),
    U64(u64),
    Address(ObjectId),
}

/// One ordered argument of a command: an on-chain object reference, a typed
/// pure value, the gas coin, or the result of an earlier command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Argument {
    Object { id: ObjectId },
    Pure { value: PureValue },
    GasCoin,
    Result { command: u16, index: u16 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    SplitCoins {
        coin: Argument,
        amounts: Vec<u64>,
    },
    MergeCoins {
        primary: Argument,
        sources: Vec<Argument>,
    },
    MoveCall {
        target: String,
        arguments: Vec<Argument>,
    },
}

/// Finished call descriptor, immutable once built. The signing gateway turns
/// this into transaction bytes; the builder never validates semantics, only
/// structure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDescriptor {
    pub commands: Vec<Command>,
}

#[derive(Debug, Default)]
pub struct TransactionBuilder {
    commands: Vec<Command>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gas() -> Argument {
        Argument::GasCoin
    }

    pub fn object(id: ObjectId) -> Argument {
        Argument::Object { id }
    }

    pub fn pure_bool(value: bool) -> Argument {
        Argument::Pure {
            value: PureValue::Bool(value),
        }
    }

    pub fn pure_u8(value: u8) -> Argument {
        Argument::Pure {
            value: PureValue::U8(value),
        }
    }

    pub fn pure_u64(value: u64) -> Argument {
        Argument::Pure {
            value: PureValue::U64(value),
        }
    }

    pub fn pure_address(value: ObjectId) -> Argument {
        Argument::Pure {
            value: PureValue::Address(value),
        }
    }

    /// Splits `amounts` off `coin` and returns the argument referencing the
    /// first split result.
    pub fn split_coins(&mut self, coin: Argument, amounts: Vec<u64>) -> Argument {
        let command = self.commands.len() as u16;
        self.commands.push(Command::SplitCoins { coin, amounts });
        Argument::Result { command, index: 0 }
    }

    pub fn merge_coins(&mut self, primary: Argument, sources: Vec<Argument>) {
        self.commands.push(Command::MergeCoins { primary, sources });
    }

    pub fn move_call(&mut self, target: &CallTarget, arguments: Vec<Argument>) {
        self.commands.push(Command::MoveCall {
            target: target.to_string(),
            arguments,
        });
    }

    pub fn finish(self) -> TransactionDescriptor {
        TransactionDescriptor {
            commands: self.commands,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn object_id__pads_short_well_known_ids() {
        let clock: ObjectId = "0x6".parse().unwrap();

        assert_eq!(clock, ObjectId::well_known(6));
        assert_eq!(
            clock.to_string(),
            "0x0000000000000000000000000000000000000000000000000000000000000006"
        );
    }

    #[test]
    fn object_id__rejects_non_hex_and_overlong_input() {
        assert!("0xzz".parse::<ObjectId>().is_err());
        assert!("".parse::<ObjectId>().is_err());
        let overlong = format!("0x{}", "a".repeat(65));
        assert!(overlong.parse::<ObjectId>().is_err());
    }

    #[test]
    fn call_target__round_trips_through_display() {
        let target: CallTarget = "0x2::rps::play_game".parse().unwrap();

        assert_eq!(target.module, "rps");
        assert_eq!(target.function, "play_game");
        assert_eq!(target.to_string().parse::<CallTarget>().unwrap(), target);
    }

    #[test]
    fn call_target__rejects_wrong_arity() {
        assert!("0x2::rps".parse::<CallTarget>().is_err());
        assert!("0x2::rps::play::extra".parse::<CallTarget>().is_err());
    }

    #[test]
    fn builder__split_returns_result_of_that_command() {
        let mut tx = TransactionBuilder::new();
        let primary = TransactionBuilder::object(ObjectId::well_known(1));
        tx.merge_coins(primary.clone(), vec![TransactionBuilder::object(
            ObjectId::well_known(2),
        )]);

        let bet = tx.split_coins(primary, vec![100]);

        assert_eq!(bet, Argument::Result { command: 1, index: 0 });
    }

    #[test]
    fn builder__preserves_command_order() {
        let target: CallTarget = "0x2::rps::play".parse().unwrap();
        let mut tx = TransactionBuilder::new();
        let coin = tx.split_coins(TransactionBuilder::gas(), vec![50]);
        tx.move_call(&target, vec![coin, TransactionBuilder::pure_u8(2)]);

        let descriptor = tx.finish();

        assert_eq!(descriptor.commands.len(), 2);
        assert!(matches!(descriptor.commands[0], Command::SplitCoins { .. }));
        assert!(matches!(descriptor.commands[1], Command::MoveCall { .. }));
    }

    #[test]
    fn descriptor__serializes_with_tagged_commands() {
        let mut tx = TransactionBuilder::new();
        let coin = tx.split_coins(TransactionBuilder::gas(), vec![100_000_000]);
        tx.move_call(&"0x2::rps::play_game".parse().unwrap(), vec![
            coin,
            TransactionBuilder::pure_bool(true),
        ]);

        let json = serde_json::to_value(tx.finish()).unwrap();

        assert_eq!(json["commands"][0]["command"], "split_coins");
        assert_eq!(json["commands"][0]["coin"]["kind"], "gas_coin");
        assert_eq!(json["commands"][1]["arguments"][0]["kind"], "result");
        assert_eq!(json["commands"][1]["arguments"][1]["value"]["type"], "bool");
    }
}
