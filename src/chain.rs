use crate::{
    error::{
        ClientError,
        Result,
    },
    tx::{
        ObjectId,
        TransactionDescriptor,
    },
};
use serde::Deserialize;
use serde_json::{
    Value,
    json,
};
use std::time::Duration;

pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// RPC surface this client consumes. The production implementation talks
/// JSON-RPC to a signing gateway; tests script a fake. The gateway holds the
/// keys, so descriptors go over unsigned and come back executed.
pub trait ChainClient {
    async fn get_balance(&self, owner: ObjectId, coin_type: &str) -> Result<u128>;

    async fn get_coins(&self, owner: ObjectId, coin_type: &str)
    -> Result<Vec<CoinRef>>;

    async fn get_object(&self, id: ObjectId) -> Result<Option<ObjectContent>>;

    async fn execute_transaction(
        &self,
        tx: &TransactionDescriptor,
    ) -> Result<ExecutionResult>;
}

/// One owned fungible-token coin object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoinRef {
    pub id: ObjectId,
    pub balance: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChainEvent {
    pub event_type: String,
    pub payload: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionResult {
    pub digest: String,
    pub events: Vec<ChainEvent>,
}

/// Decoded `showContent` representation of an on-chain object. The decode is
/// an explicit tagged step; content that fits neither variant is a transport
/// error, not a silent default.
#[derive(Clone, Debug, PartialEq)]
pub enum ObjectContent {
    MoveObject {
        object_type: String,
        fields: serde_json::Map<String, Value>,
    },
    Package,
}

#[derive(Clone)]
pub struct HttpChainClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpChainClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_RPC_TIMEOUT)
            .build()
            .map_err(|e| {
                ClientError::Network(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self { base_url, http })
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let res = self
            .http
            .post(&self.base_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Network(format!("{method} request failed: {e}")))?;
        let status = res.status();
        if !status.is_success() {
            return Err(ClientError::Network(format!(
                "{method} responded with {status}"
            )));
        }
        let envelope: RpcEnvelope = res.json().await.map_err(|e| {
            ClientError::Network(format!("invalid {method} response body: {e}"))
        })?;
        if let Some(err) = envelope.error {
            return Err(ClientError::Network(format!(
                "{method} failed with code {}: {}",
                err.code, err.message
            )));
        }
        envelope
            .result
            .ok_or_else(|| ClientError::Network(format!("{method} returned no result")))
    }
}

impl ChainClient for HttpChainClient {
    async fn get_balance(&self, owner: ObjectId, coin_type: &str) -> Result<u128> {
        let result = self
            .rpc(
                "suix_getBalance",
                json!([owner.to_string(), coin_type]),
            )
            .await?;
        let dto: BalanceDto = serde_json::from_value(result)
            .map_err(|e| ClientError::Network(format!("invalid balance payload: {e}")))?;
        dto.total_balance.parse().map_err(|_| {
            ClientError::Network(format!(
                "balance `{}` is not an unsigned integer",
                dto.total_balance
            ))
        })
    }

    async fn get_coins(
        &self,
        owner: ObjectId,
        coin_type: &str,
    ) -> Result<Vec<CoinRef>> {
        let result = self
            .rpc("suix_getCoins", json!([owner.to_string(), coin_type]))
            .await?;
        let dto: CoinPageDto = serde_json::from_value(result).map_err(|e| {
            ClientError::Network(format!("invalid coin page payload: {e}"))
        })?;
        dto.data.into_iter().map(CoinRef::try_from).collect()
    }

    async fn get_object(&self, id: ObjectId) -> Result<Option<ObjectContent>> {
        let result = self
            .rpc(
                "sui_getObject",
                json!([id.to_string(), { "showContent": true }]),
            )
            .await?;
        let dto: ObjectResponseDto = serde_json::from_value(result).map_err(|e| {
            ClientError::Network(format!("invalid object payload: {e}"))
        })?;
        // Absent objects come back as an error payload with a 2xx status.
        let Some(data) = dto.data else {
            return Ok(None);
        };
        Ok(data.content.map(Into::into))
    }

    async fn execute_transaction(
        &self,
        tx: &TransactionDescriptor,
    ) -> Result<ExecutionResult> {
        let result = self
            .rpc(
                "sui_executeTransactionBlock",
                json!([
                    tx,
                    { "showEvents": true, "showRawEffects": true },
                ]),
            )
            .await?;
        let dto: ExecutionDto = serde_json::from_value(result).map_err(|e| {
            ClientError::Network(format!("invalid execution payload: {e}"))
        })?;
        Ok(dto.into())
    }
}

#[derive(Deserialize)]
struct RpcEnvelope {
    result: Option<Value>,
    error: Option<RpcErrorDto>,
}

#[derive(Deserialize)]
struct RpcErrorDto {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceDto {
    total_balance: String,
}

#[derive(Deserialize)]
struct CoinPageDto {
    data: Vec<CoinDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoinDto {
    coin_object_id: ObjectId,
    balance: String,
}

impl TryFrom<CoinDto> for CoinRef {
    type Error = ClientError;

    fn try_from(dto: CoinDto) -> Result<Self> {
        let balance = dto.balance.parse().map_err(|_| {
            ClientError::Network(format!(
                "coin {} has non-numeric balance `{}`",
                dto.coin_object_id, dto.balance
            ))
        })?;
        Ok(CoinRef {
            id: dto.coin_object_id,
            balance,
        })
    }
}

#[derive(Deserialize)]
struct ObjectResponseDto {
    data: Option<ObjectDataDto>,
}

#[derive(Deserialize)]
struct ObjectDataDto {
    content: Option<ContentDto>,
}

#[derive(Deserialize)]
#[serde(tag = "dataType")]
enum ContentDto {
    #[serde(rename = "moveObject")]
    MoveObject {
        #[serde(rename = "type")]
        object_type: String,
        fields: serde_json::Map<String, Value>,
    },
    #[serde(rename = "package")]
    Package,
}

impl From<ContentDto> for ObjectContent {
    fn from(dto: ContentDto) -> Self {
        match dto {
            ContentDto::MoveObject {
                object_type,
                fields,
            } => ObjectContent::MoveObject {
                object_type,
                fields,
            },
            ContentDto::Package => ObjectContent::Package,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecutionDto {
    digest: String,
    #[serde(default)]
    events: Vec<EventDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDto {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    parsed_json: Value,
}

impl From<ExecutionDto> for ExecutionResult {
    fn from(dto: ExecutionDto) -> Self {
        ExecutionResult {
            digest: dto.digest,
            events: dto
                .events
                .into_iter()
                .map(|event| ChainEvent {
                    event_type: event.event_type,
                    payload: event.parsed_json,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn object_content__decodes_move_object_with_fields() {
        let raw = r#"{
            "data": {
                "content": {
                    "dataType": "moveObject",
                    "type": "0x2::rps::HouseData",
                    "fields": { "balance": "2000000000" }
                }
            }
        }"#;

        let dto: ObjectResponseDto = serde_json::from_str(raw).unwrap();
        let content: ObjectContent = dto.data.unwrap().content.unwrap().into();

        let ObjectContent::MoveObject {
            object_type,
            fields,
        } = content
        else {
            panic!("expected a move object");
        };
        assert_eq!(object_type, "0x2::rps::HouseData");
        assert_eq!(fields["balance"], "2000000000");
    }

    #[test]
    fn object_content__absent_object_decodes_to_none() {
        let raw = r#"{ "error": { "code": "notExists" } }"#;

        let dto: ObjectResponseDto = serde_json::from_str(raw).unwrap();

        assert!(dto.data.is_none());
    }

    #[test]
    fn object_content__rejects_unknown_data_type() {
        let raw = r#"{
            "data": { "content": { "dataType": "mystery", "fields": {} } }
        }"#;

        let dto: std::result::Result<ObjectResponseDto, _> = serde_json::from_str(raw);

        assert!(dto.is_err());
    }

    #[test]
    fn execution__collects_typed_events() {
        let raw = r#"{
            "digest": "9zXq",
            "events": [
                {
                    "type": "0xabc::rps::GameResult",
                    "parsedJson": { "outcome": 1 }
                }
            ]
        }"#;

        let dto: ExecutionDto = serde_json::from_str(raw).unwrap();
        let result: ExecutionResult = dto.into();

        assert_eq!(result.digest, "9zXq");
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].event_type, "0xabc::rps::GameResult");
        assert_eq!(result.events[0].payload["outcome"], 1);
    }

    #[test]
    fn execution__events_default_to_empty() {
        let raw = r#"{ "digest": "9zXq" }"#;

        let dto: ExecutionDto = serde_json::from_str(raw).unwrap();
        let result: ExecutionResult = dto.into();

        assert!(result.events.is_empty());
    }
}
