pub mod chain;

pub mod config;

pub mod error;

pub mod game;

pub mod queries;

pub mod tx;

pub use chain::{
    ChainClient,
    ChainEvent,
    CoinRef,
    ExecutionResult,
    HttpChainClient,
    ObjectContent,
};
pub use config::{
    ConfigStore,
    ContractConfig,
    Environment,
};
pub use error::{
    ClientError,
    Result,
};
pub use game::{
    Choice,
    GameResultEvent,
    GameSession,
    NotificationSink,
    RoundOutcome,
    RoundPhase,
    Scores,
    TerminalSink,
    winner_against,
};
pub use queries::{
    Balance,
    BalanceQuery,
    ObjectStateQuery,
};
pub use tx::{
    Address,
    Argument,
    CallTarget,
    Command,
    ObjectId,
    PureValue,
    TransactionBuilder,
    TransactionDescriptor,
};
