use crate::{
    chain::{
        ChainClient,
        ObjectContent,
    },
    error::{
        ClientError,
        Result,
    },
    tx::ObjectId,
};
use serde_json::Value;

/// Native coin type and its fixed-point scale (1e9 raw units per coin).
pub const NATIVE_COIN_TYPE: &str = "0x2::sui::SUI";
pub const NATIVE_COIN_SCALE: u64 = 1_000_000_000;

/// A decimal-normalized balance paired with the address it was fetched for.
/// `stale` marks a value that survived a failed refresh.
#[derive(Clone, Debug, PartialEq)]
pub struct Balance {
    pub owner: Option<ObjectId>,
    pub raw: u128,
    pub scale: u64,
    pub stale: bool,
}

impl Balance {
    pub fn zero(scale: u64) -> Self {
        Self {
            owner: None,
            raw: 0,
            scale,
            stale: false,
        }
    }

    pub fn normalized(&self) -> f64 {
        self.raw as f64 / self.scale as f64
    }

    /// Display form, fixed to three decimal places.
    pub fn display(&self) -> String {
        format!("{:.3}", self.normalized())
    }

    pub fn covers(&self, wager_raw: u64) -> bool {
        self.raw >= u128::from(wager_raw)
    }
}

/// On-demand balance fetch for one coin type. Disconnected accounts read as
/// zero rather than erroring; a failed refresh keeps the previous value and
/// marks it stale.
#[derive(Clone, Debug)]
pub struct BalanceQuery {
    coin_type: String,
    scale: u64,
    latest: Balance,
}

impl BalanceQuery {
    pub fn new(coin_type: impl Into<String>, scale: u64) -> Self {
        Self {
            coin_type: coin_type.into(),
            scale,
            latest: Balance::zero(scale),
        }
    }

    pub fn native() -> Self {
        Self::new(NATIVE_COIN_TYPE, NATIVE_COIN_SCALE)
    }

    pub fn coin_type(&self) -> &str {
        &self.coin_type
    }

    pub fn latest(&self) -> &Balance {
        &self.latest
    }

    pub async fn refresh<C: ChainClient>(
        &mut self,
        client: &C,
        owner: Option<ObjectId>,
    ) -> Result<&Balance> {
        let Some(owner) = owner else {
            self.latest = Balance::zero(self.scale);
            return Ok(&self.latest);
        };
        match client.get_balance(owner, &self.coin_type).await {
            Ok(raw) => {
                self.latest = Balance {
                    owner: Some(owner),
                    raw,
                    scale: self.scale,
                    stale: false,
                };
                Ok(&self.latest)
            }
            Err(err) => {
                self.latest.stale = true;
                Err(err)
            }
        }
    }
}

/// Fetches one shared object and extracts a named numeric field. Content of
/// an unexpected shape is a typed decode error, never a defaulted zero; the
/// caller decides how visibly to degrade.
#[derive(Clone, Debug)]
pub struct ObjectStateQuery {
    object_id: ObjectId,
    field: String,
    latest: u64,
}

impl ObjectStateQuery {
    pub fn new(object_id: ObjectId, field: impl Into<String>) -> Self {
        Self {
            object_id,
            field: field.into(),
            latest: 0,
        }
    }

    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    /// Last successfully decoded value; zero until the first refresh lands.
    pub fn latest(&self) -> u64 {
        self.latest
    }

    pub async fn refresh<C: ChainClient>(&mut self, client: &C) -> Result<u64> {
        let content = client.get_object(self.object_id).await?;
        let value = decode_numeric_field(self.object_id, content.as_ref(), &self.field)?;
        self.latest = value;
        Ok(value)
    }
}

fn decode_numeric_field(
    id: ObjectId,
    content: Option<&ObjectContent>,
    field: &str,
) -> Result<u64> {
    let fields = match content {
        Some(ObjectContent::MoveObject { fields, .. }) => fields,
        Some(ObjectContent::Package) => {
            return Err(ClientError::ObjectDecode {
                id,
                reason: "expected a move object, found a package".to_string(),
            });
        }
        None => {
            return Err(ClientError::ObjectDecode {
                id,
                reason: "object does not exist".to_string(),
            });
        }
    };
    let value = fields.get(field).ok_or_else(|| ClientError::ObjectDecode {
        id,
        reason: format!("field `{field}` is absent"),
    })?;
    parse_numeric(value).ok_or_else(|| ClientError::ObjectDecode {
        id,
        reason: format!("field `{field}` is not numeric: {value}"),
    })
}

// Balances arrive either as a bare string/number or wrapped in a
// `{ "value": ... }` balance struct depending on the node version.
fn parse_numeric(value: &Value) -> Option<u64> {
    match value {
        Value::String(raw) => raw.parse().ok(),
        Value::Number(raw) => raw.as_u64(),
        Value::Object(map) => map.get("value").and_then(parse_numeric),
        _ => None,
    }
}
