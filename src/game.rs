use crate::{
    chain::{
        ChainClient,
        ExecutionResult,
    },
    config::ContractConfig,
    error::{
        ClientError,
        Result,
    },
    queries::{
        Balance,
        BalanceQuery,
        ObjectStateQuery,
    },
    tx::{
        Address,
        TransactionBuilder,
        TransactionDescriptor,
    },
};
use serde_json::Value;
use std::{
    fmt,
    str::FromStr,
    time::Duration,
};
use tracing::{
    error,
    info,
    warn,
};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Choice {
    Rock,
    Paper,
    Scissors,
}

impl Choice {
    pub const ALL: [Choice; 3] = [Choice::Rock, Choice::Paper, Choice::Scissors];

    pub fn as_u8(self) -> u8 {
        match self {
            Choice::Rock => 0,
            Choice::Paper => 1,
            Choice::Scissors => 2,
        }
    }

    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Choice::Rock),
            1 => Some(Choice::Paper),
            2 => Some(Choice::Scissors),
            _ => None,
        }
    }

    /// The choice this one defeats.
    pub fn beats(self) -> Choice {
        match self {
            Choice::Rock => Choice::Scissors,
            Choice::Paper => Choice::Rock,
            Choice::Scissors => Choice::Paper,
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Choice::Rock => "rock",
            Choice::Paper => "paper",
            Choice::Scissors => "scissors",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Choice {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rock" => Ok(Choice::Rock),
            "paper" => Ok(Choice::Paper),
            "scissors" => Ok(Choice::Scissors),
            other => Err(ClientError::InvalidId(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundOutcome {
    Win,
    Lose,
    Draw,
}

/// Pure rock-paper-scissors relation from the player's point of view. The
/// contract decides real rounds; this exists to cross-check its events and
/// is total and antisymmetric over the 3x3 choice space.
pub fn winner_against(player: Choice, opponent: Choice) -> RoundOutcome {
    if player == opponent {
        RoundOutcome::Draw
    } else if player.beats() == opponent {
        RoundOutcome::Win
    } else {
        RoundOutcome::Lose
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Scores {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

impl Scores {
    pub fn record(&mut self, outcome: RoundOutcome) {
        match outcome {
            RoundOutcome::Win => self.wins += 1,
            RoundOutcome::Lose => self.losses += 1,
            RoundOutcome::Draw => self.draws += 1,
        }
    }
}

/// Lifecycle of a single round. `Resolved` keeps the result on screen until
/// the user confirms; only `Idle` accepts a new wager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    Submitting {
        choice: Choice,
    },
    Resolving {
        choice: Choice,
    },
    Resolved {
        choice: Choice,
        house_choice: Option<Choice>,
        outcome: RoundOutcome,
    },
}

/// Decoded `GameResult` event. Two payload generations are deployed: the
/// pool module emits `{ outcome, house_choice? }` (0 draw, 1 win, 2 lose),
/// the house module emits `{ player_won }`. Both decode here; anything else
/// is an `UnexpectedEventShape`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameResultEvent {
    pub outcome: RoundOutcome,
    pub house_choice: Option<Choice>,
}

impl GameResultEvent {
    pub fn decode(payload: &Value) -> Result<Self> {
        if let Some(raw) = payload.get("outcome") {
            let code = raw.as_u64().ok_or_else(|| {
                ClientError::UnexpectedEventShape(format!(
                    "`outcome` is not an unsigned integer: {raw}"
                ))
            })?;
            let outcome = match code {
                0 => RoundOutcome::Draw,
                1 => RoundOutcome::Win,
                2 => RoundOutcome::Lose,
                other => {
                    return Err(ClientError::UnexpectedEventShape(format!(
                        "unknown outcome code {other}"
                    )));
                }
            };
            let house_choice = match payload.get("house_choice") {
                None | Some(Value::Null) => None,
                Some(raw) => {
                    let choice = raw
                        .as_u64()
                        .and_then(|code| u8::try_from(code).ok())
                        .and_then(Choice::from_u8)
                        .ok_or_else(|| {
                            ClientError::UnexpectedEventShape(format!(
                                "`house_choice` is not a valid choice: {raw}"
                            ))
                        })?;
                    Some(choice)
                }
            };
            return Ok(Self {
                outcome,
                house_choice,
            });
        }
        if let Some(raw) = payload.get("player_won") {
            let won = raw.as_bool().ok_or_else(|| {
                ClientError::UnexpectedEventShape(format!(
                    "`player_won` is not a boolean: {raw}"
                ))
            })?;
            let outcome = if won {
                RoundOutcome::Win
            } else {
                RoundOutcome::Lose
            };
            return Ok(Self {
                outcome,
                house_choice: None,
            });
        }
        Err(ClientError::UnexpectedEventShape(
            "payload carries neither `outcome` nor `player_won`".to_string(),
        ))
    }
}

/// User-facing success/failure surface. The production sink prints to the
/// terminal; tests record.
pub trait NotificationSink {
    fn success(&mut self, message: &str);
    fn failure(&mut self, message: &str);
}

#[derive(Debug, Default)]
pub struct TerminalSink;

impl NotificationSink for TerminalSink {
    fn success(&mut self, message: &str) {
        info!("{message}");
        println!("* {message}");
    }

    fn failure(&mut self, message: &str) {
        error!("{message}");
        eprintln!("! {message}");
    }
}

/// Orchestrates user-visible rounds against the two deployed game modules
/// and keeps the derived balance views fresh. Holds the only mutable borrow
/// of the session, so two rounds can never be in flight at once; on top of
/// that, any phase other than `Idle` makes a new wager a no-op.
pub struct GameSession<C, N> {
    client: C,
    notifications: N,
    config: ContractConfig,
    account: Option<Address>,
    phase: RoundPhase,
    scores: Scores,
    native_balance: BalanceQuery,
    token_balance: BalanceQuery,
    house_state: ObjectStateQuery,
    pool_state: ObjectStateQuery,
    call_timeout: Duration,
}

impl<C, N> GameSession<C, N> {
    pub fn new(client: C, notifications: N, config: ContractConfig) -> Self {
        let token_balance =
            BalanceQuery::new(config.token_coin_type.clone(), config.token_scale);
        let house_state = ObjectStateQuery::new(config.house_object_id, "balance");
        let pool_state = ObjectStateQuery::new(config.pool_object_id, "balance");
        Self {
            client,
            notifications,
            config,
            account: None,
            phase: RoundPhase::Idle,
            scores: Scores::default(),
            native_balance: BalanceQuery::native(),
            token_balance,
            house_state,
            pool_state,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Overrides the default per-call timeout on remote operations.
    pub fn with_call_timeout(mut self, limit: Duration) -> Self {
        self.call_timeout = limit;
        self
    }

    pub fn connect(&mut self, account: Address) {
        self.account = Some(account);
    }

    pub fn disconnect(&mut self) {
        self.account = None;
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn scores(&self) -> Scores {
        self.scores
    }

    pub fn native_balance(&self) -> &Balance {
        self.native_balance.latest()
    }

    pub fn token_balance(&self) -> &Balance {
        self.token_balance.latest()
    }

    pub fn house_balance(&self) -> u64 {
        self.house_state.latest()
    }

    pub fn pool_balance(&self) -> u64 {
        self.pool_state.latest()
    }

    pub fn notifications(&self) -> &N {
        &self.notifications
    }

    pub fn config(&self) -> &ContractConfig {
        &self.config
    }

    /// Dismisses a resolved round and returns the session to idle. No-op in
    /// any other phase.
    pub fn confirm_round(&mut self) {
        if matches!(self.phase, RoundPhase::Resolved { .. }) {
            self.phase = RoundPhase::Idle;
        }
    }
}

impl<C: ChainClient, N: NotificationSink> GameSession<C, N> {
    /// Wager one round of the native-coin house game. A no-op unless the
    /// session is idle.
    pub async fn play_house_round(&mut self, choice: Choice) -> Result<()> {
        if !matches!(self.phase, RoundPhase::Idle) {
            warn!(%choice, "round already in progress; ignoring wager");
            return Ok(());
        }
        match self.run_house_round(choice).await {
            Ok(event) => {
                self.finish_round(choice, event);
                Ok(())
            }
            Err(err) => {
                self.phase = RoundPhase::Idle;
                self.notifications.failure(&err.to_string());
                Err(err)
            }
        }
    }

    /// Wager one round of the token pool game. A no-op unless the session
    /// is idle.
    pub async fn play_pool_round(&mut self, choice: Choice) -> Result<()> {
        if !matches!(self.phase, RoundPhase::Idle) {
            warn!(%choice, "round already in progress; ignoring wager");
            return Ok(());
        }
        match self.run_pool_round(choice).await {
            Ok(event) => {
                self.finish_round(choice, event);
                Ok(())
            }
            Err(err) => {
                self.phase = RoundPhase::Idle;
                self.notifications.failure(&err.to_string());
                Err(err)
            }
        }
    }

    async fn run_house_round(&mut self, choice: Choice) -> Result<GameResultEvent> {
        let account = self.account.ok_or(ClientError::NotConnected)?;
        self.phase = RoundPhase::Submitting { choice };

        let balance = with_timeout(
            self.call_timeout,
            self.native_balance.refresh(&self.client, Some(account)),
        )
        .await?;
        if !balance.covers(self.config.house_wager) {
            return Err(ClientError::InsufficientFunds {
                required: self.config.house_wager,
                available: balance.raw,
            });
        }

        let mut tx = TransactionBuilder::new();
        let wager =
            tx.split_coins(TransactionBuilder::gas(), vec![self.config.house_wager]);
        tx.move_call(&self.config.play_game_target(), vec![
            TransactionBuilder::object(self.config.house_object_id),
            wager,
            TransactionBuilder::pure_u8(choice.as_u8()),
            TransactionBuilder::object(self.config.random_object_id),
        ]);

        let result = with_timeout(
            self.call_timeout,
            self.client.execute_transaction(&tx.finish()),
        )
        .await?;
        self.phase = RoundPhase::Resolving { choice };

        let event =
            self.resolve_round(choice, &result, &self.config.house_event_type())?;
        self.refresh_house_views().await;
        Ok(event)
    }

    async fn run_pool_round(&mut self, choice: Choice) -> Result<GameResultEvent> {
        let account = self.account.ok_or(ClientError::NotConnected)?;
        self.phase = RoundPhase::Submitting { choice };

        let balance = with_timeout(
            self.call_timeout,
            self.token_balance.refresh(&self.client, Some(account)),
        )
        .await?;
        if !balance.covers(self.config.pool_wager) {
            return Err(ClientError::InsufficientFunds {
                required: self.config.pool_wager,
                available: balance.raw,
            });
        }

        let coins = with_timeout(
            self.call_timeout,
            self.client
                .get_coins(account, &self.config.token_coin_type),
        )
        .await?;
        let Some((primary, rest)) = coins.split_first() else {
            return Err(ClientError::InsufficientFunds {
                required: self.config.pool_wager,
                available: 0,
            });
        };

        let mut tx = TransactionBuilder::new();
        let primary_arg = TransactionBuilder::object(primary.id);
        if !rest.is_empty() {
            tx.merge_coins(
                primary_arg.clone(),
                rest.iter()
                    .map(|coin| TransactionBuilder::object(coin.id))
                    .collect(),
            );
        }
        let wager = tx.split_coins(primary_arg, vec![self.config.pool_wager]);
        tx.move_call(&self.config.play_target(), vec![
            TransactionBuilder::object(self.config.pool_object_id),
            wager,
            TransactionBuilder::pure_u8(choice.as_u8()),
            TransactionBuilder::object(self.config.random_object_id),
        ]);

        let result = with_timeout(
            self.call_timeout,
            self.client.execute_transaction(&tx.finish()),
        )
        .await?;
        self.phase = RoundPhase::Resolving { choice };

        let event = self.resolve_round(choice, &result, &self.config.pool_event_type())?;
        self.refresh_pool_views().await;
        Ok(event)
    }

    /// The contract's emitted event is authoritative for the outcome. When
    /// the payload also names the house choice, the reported outcome must
    /// agree with the pure relation, otherwise the payload is rejected.
    fn resolve_round(
        &self,
        choice: Choice,
        result: &ExecutionResult,
        event_type: &str,
    ) -> Result<GameResultEvent> {
        let event = result
            .events
            .iter()
            .find(|event| event.event_type == event_type)
            .ok_or_else(|| {
                ClientError::UnexpectedEventShape(format!(
                    "transaction {} emitted no {event_type} event",
                    result.digest
                ))
            })?;
        let decoded = GameResultEvent::decode(&event.payload)?;
        if let Some(house_choice) = decoded.house_choice {
            let expected = winner_against(choice, house_choice);
            if expected != decoded.outcome {
                return Err(ClientError::UnexpectedEventShape(format!(
                    "event reports {:?} but {choice} vs {house_choice} is {expected:?}",
                    decoded.outcome
                )));
            }
        }
        Ok(decoded)
    }

    fn finish_round(&mut self, choice: Choice, event: GameResultEvent) {
        self.scores.record(event.outcome);
        let message = match event.outcome {
            RoundOutcome::Win => "You win!",
            RoundOutcome::Lose => "You lose.",
            RoundOutcome::Draw => "Draw - wager returned.",
        };
        self.notifications.success(message);
        self.phase = RoundPhase::Resolved {
            choice,
            house_choice: event.house_choice,
            outcome: event.outcome,
        };
    }

    /// Mints faucet tokens to the connected account.
    pub async fn claim_faucet(&mut self) -> Result<()> {
        self.ensure_connected()?;
        let mut tx = TransactionBuilder::new();
        tx.move_call(&self.config.claim_faucet_target(), vec![
            TransactionBuilder::object(self.config.faucet_object_id),
            TransactionBuilder::object(self.config.treasury_cap_id),
            TransactionBuilder::object(self.config.clock_object_id),
        ]);
        self.submit(tx.finish(), "Faucet claim submitted").await?;
        self.refresh_pool_views().await;
        Ok(())
    }

    /// Tops up the house with native coin split off the gas coin.
    pub async fn deposit_to_house(&mut self, amount_raw: u64) -> Result<()> {
        self.ensure_connected()?;
        let mut tx = TransactionBuilder::new();
        let deposit = tx.split_coins(TransactionBuilder::gas(), vec![amount_raw]);
        tx.move_call(&self.config.deposit_to_house_target(), vec![
            TransactionBuilder::object(self.config.house_object_id),
            deposit,
        ]);
        self.submit(tx.finish(), "House deposit submitted").await?;
        self.refresh_house_views().await;
        Ok(())
    }

    pub async fn deposit_to_pool(&mut self) -> Result<()> {
        self.ensure_connected()?;
        let mut tx = TransactionBuilder::new();
        tx.move_call(&self.config.deposit_to_pool_target(), vec![
            TransactionBuilder::object(self.config.pool_object_id),
            TransactionBuilder::object(self.config.treasury_cap_id),
        ]);
        self.submit(tx.finish(), "Pool deposit submitted").await?;
        self.refresh_pool_views().await;
        Ok(())
    }

    /// Asks the pool to pay out to `recipient`. Operator tooling; the round
    /// pipeline never calls this, winners are paid by the contract itself.
    pub async fn request_payout(&mut self, recipient: Address) -> Result<()> {
        self.ensure_connected()?;
        let mut tx = TransactionBuilder::new();
        tx.move_call(&self.config.payout_target(), vec![
            TransactionBuilder::object(self.config.pool_object_id),
            TransactionBuilder::object(self.config.treasury_cap_id),
            TransactionBuilder::pure_address(recipient),
        ]);
        self.submit(tx.finish(), "Payout requested").await?;
        self.refresh_pool_views().await;
        Ok(())
    }

    /// Refreshes every derived view. Failures keep the previous values and
    /// are surfaced without interrupting the caller.
    pub async fn refresh(&mut self) {
        self.refresh_house_views().await;
        self.refresh_pool_views().await;
    }

    fn ensure_connected(&mut self) -> Result<()> {
        if self.account.is_none() {
            let err = ClientError::NotConnected;
            self.notifications.failure(&err.to_string());
            return Err(err);
        }
        Ok(())
    }

    async fn submit(
        &mut self,
        descriptor: TransactionDescriptor,
        success_message: &str,
    ) -> Result<ExecutionResult> {
        match with_timeout(
            self.call_timeout,
            self.client.execute_transaction(&descriptor),
        )
        .await
        {
            Ok(result) => {
                self.notifications.success(success_message);
                Ok(result)
            }
            Err(err) => {
                self.notifications.failure(&err.to_string());
                Err(err)
            }
        }
    }

    async fn refresh_house_views(&mut self) {
        if let Err(err) = with_timeout(
            self.call_timeout,
            self.native_balance.refresh(&self.client, self.account),
        )
        .await
        {
            warn!(%err, "native balance refresh failed; value is stale");
        }
        self.refresh_object_view(ObjectView::House).await;
    }

    async fn refresh_pool_views(&mut self) {
        if let Err(err) = with_timeout(
            self.call_timeout,
            self.token_balance.refresh(&self.client, self.account),
        )
        .await
        {
            warn!(%err, "token balance refresh failed; value is stale");
        }
        self.refresh_object_view(ObjectView::Pool).await;
    }

    async fn refresh_object_view(&mut self, view: ObjectView) {
        let (query, name) = match view {
            ObjectView::House => (&mut self.house_state, "house"),
            ObjectView::Pool => (&mut self.pool_state, "pool"),
        };
        match with_timeout(self.call_timeout, query.refresh(&self.client)).await {
            Ok(_) => {}
            Err(err @ ClientError::ObjectDecode { .. }) => {
                warn!(%err, "{name} state has an unexpected shape");
                self.notifications.failure(&err.to_string());
            }
            Err(err) => {
                warn!(%err, "{name} state refresh failed; keeping last known value");
            }
        }
    }
}

#[derive(Clone, Copy)]
enum ObjectView {
    House,
    Pool,
}

async fn with_timeout<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Network(format!(
            "remote call timed out after {}s",
            limit.as_secs()
        ))),
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn winner_against__equal_choices_draw() {
        for choice in Choice::ALL {
            assert_eq!(winner_against(choice, choice), RoundOutcome::Draw);
        }
    }

    #[test]
    fn winner_against__follows_the_cycle() {
        assert_eq!(
            winner_against(Choice::Rock, Choice::Scissors),
            RoundOutcome::Win
        );
        assert_eq!(
            winner_against(Choice::Scissors, Choice::Paper),
            RoundOutcome::Win
        );
        assert_eq!(
            winner_against(Choice::Paper, Choice::Rock),
            RoundOutcome::Win
        );
        assert_eq!(
            winner_against(Choice::Scissors, Choice::Rock),
            RoundOutcome::Lose
        );
    }

    proptest! {
        #[test]
        fn winner_against__is_total_and_antisymmetric(a in 0u8..3, b in 0u8..3) {
            let a = Choice::from_u8(a).unwrap();
            let b = Choice::from_u8(b).unwrap();

            let forward = winner_against(a, b);
            let backward = winner_against(b, a);

            match forward {
                RoundOutcome::Win => prop_assert_eq!(backward, RoundOutcome::Lose),
                RoundOutcome::Lose => prop_assert_eq!(backward, RoundOutcome::Win),
                RoundOutcome::Draw => {
                    prop_assert_eq!(backward, RoundOutcome::Draw);
                    prop_assert_eq!(a, b);
                }
            }
        }
    }

    #[test]
    fn choice__u8_encoding_round_trips() {
        for choice in Choice::ALL {
            assert_eq!(Choice::from_u8(choice.as_u8()), Some(choice));
        }
        assert_eq!(Choice::from_u8(3), None);
    }

    #[test]
    fn choice__parses_lowercase_names() {
        assert_eq!("rock".parse::<Choice>().unwrap(), Choice::Rock);
        assert_eq!("scissors".parse::<Choice>().unwrap(), Choice::Scissors);
        assert!("lizard".parse::<Choice>().is_err());
    }

    #[test]
    fn scores__tally_by_outcome() {
        let mut scores = Scores::default();
        scores.record(RoundOutcome::Win);
        scores.record(RoundOutcome::Win);
        scores.record(RoundOutcome::Draw);
        scores.record(RoundOutcome::Lose);

        assert_eq!(scores, Scores {
            wins: 2,
            losses: 1,
            draws: 1
        });
    }

    #[test]
    fn game_result__decodes_numeric_outcome_with_house_choice() {
        let payload = json!({ "outcome": 1, "house_choice": 2 });

        let event = GameResultEvent::decode(&payload).unwrap();

        assert_eq!(event.outcome, RoundOutcome::Win);
        assert_eq!(event.house_choice, Some(Choice::Scissors));
    }

    #[test]
    fn game_result__decodes_player_won_generation() {
        let won = GameResultEvent::decode(&json!({ "player_won": true })).unwrap();
        let lost = GameResultEvent::decode(&json!({ "player_won": false })).unwrap();

        assert_eq!(won.outcome, RoundOutcome::Win);
        assert_eq!(won.house_choice, None);
        assert_eq!(lost.outcome, RoundOutcome::Lose);
    }

    #[test]
    fn game_result__rejects_unknown_outcome_codes() {
        let err = GameResultEvent::decode(&json!({ "outcome": 7 }));

        assert!(matches!(err, Err(ClientError::UnexpectedEventShape(_))));
    }

    #[test]
    fn game_result__rejects_payloads_with_neither_field() {
        let err = GameResultEvent::decode(&json!({ "winner": "0xabc" }));

        assert!(matches!(err, Err(ClientError::UnexpectedEventShape(_))));
    }

    #[test]
    fn game_result__rejects_mistyped_fields() {
        assert!(GameResultEvent::decode(&json!({ "outcome": "one" })).is_err());
        assert!(GameResultEvent::decode(&json!({ "player_won": 1 })).is_err());
        assert!(
            GameResultEvent::decode(&json!({ "outcome": 0, "house_choice": 9 })).is_err()
        );
    }
}
