//! Phase transitions and the actions each phase accepts.
//!
//! Every `From` impl applies the entry effects of the phase it produces.

use super::entities::{BettingAction, DecisionKind, PlayerId};
use super::state_machine::{Game, GameError, PhaseActions, TableStateManagement};
use super::states::{
    Ante, BoardReveal, CardDraw, ChooseTango, ChooseTrash, End, FinalBetting, HandInProgress,
    Pause, PostTurnBetting, PreKickBetting, Showdown, TurnDraw, Waiting,
};

impl From<Game<Waiting>> for Game<Ante> {
    fn from(mut value: Game<Waiting>) -> Self {
        value.data.begin_hand();
        value.into_state(Ante::default())
    }
}

impl From<Game<Ante>> for Game<CardDraw> {
    fn from(mut value: Game<Ante>) -> Self {
        if let Err(err) = value.data.deal_hole_cards() {
            value.data.abort(&err);
        }
        value.into_state(CardDraw::default())
    }
}

impl From<Game<CardDraw>> for Game<ChooseTrash> {
    fn from(value: Game<CardDraw>) -> Self {
        value.into_state(ChooseTrash::default())
    }
}

impl From<Game<ChooseTrash>> for Game<ChooseTango> {
    fn from(mut value: Game<ChooseTrash>) -> Self {
        value.data.apply_kills();
        value.into_state(ChooseTango::default())
    }
}

impl From<Game<ChooseTango>> for Game<PreKickBetting> {
    fn from(mut value: Game<ChooseTango>) -> Self {
        value.data.apply_kicks();
        value.data.start_betting_round();
        value.into_state(PreKickBetting::default())
    }
}

impl From<Game<PreKickBetting>> for Game<TurnDraw> {
    fn from(mut value: Game<PreKickBetting>) -> Self {
        if let Err(err) = value.data.deal_turn_cards() {
            value.data.abort(&err);
        }
        value.into_state(TurnDraw::default())
    }
}

impl From<Game<TurnDraw>> for Game<PostTurnBetting> {
    fn from(mut value: Game<TurnDraw>) -> Self {
        value.data.start_betting_round();
        value.into_state(PostTurnBetting::default())
    }
}

impl From<Game<PostTurnBetting>> for Game<BoardReveal> {
    fn from(mut value: Game<PostTurnBetting>) -> Self {
        if let Err(err) = value.data.reveal_board() {
            value.data.abort(&err);
        }
        value.into_state(BoardReveal::default())
    }
}

impl From<Game<BoardReveal>> for Game<FinalBetting> {
    fn from(mut value: Game<BoardReveal>) -> Self {
        value.data.start_betting_round();
        value.into_state(FinalBetting::default())
    }
}

impl From<Game<FinalBetting>> for Game<Showdown> {
    fn from(value: Game<FinalBetting>) -> Self {
        value.into_showdown()
    }
}

impl From<Game<Showdown>> for Game<End> {
    fn from(mut value: Game<Showdown>) -> Self {
        value.data.finish_hand();
        value.into_state(End::default())
    }
}

impl From<Game<End>> for Game<CardDraw> {
    fn from(mut value: Game<End>) -> Self {
        value.data.rebuild_deck();
        value.data.begin_hand();
        if let Err(err) = value.data.deal_hole_cards() {
            value.data.abort(&err);
        }
        value.into_state(CardDraw::default())
    }
}

impl From<Game<End>> for Game<Waiting> {
    fn from(mut value: Game<End>) -> Self {
        value.data.rebuild_deck();
        value.data.clear_hand();
        value.into_state(Waiting::default())
    }
}

impl<T: HandInProgress> Game<T> {
    /// Skip straight to pot resolution.
    pub(crate) fn into_showdown(mut self) -> Game<Showdown> {
        self.data.current_bet = 0;
        self.data.resolve_showdown();
        self.into_state(Showdown::default())
    }

    /// Give back every contribution and close the hand.
    pub(crate) fn abort_hand(mut self) -> Game<End> {
        self.data.refund_hand();
        self.data.finish_hand();
        self.into_state(End::default())
    }
}

impl PhaseActions for Game<Waiting> {
    fn is_ready_for_next_phase(&self) -> bool {
        self.data.has_enough_players()
    }
}

impl PhaseActions for Game<Ante> {
    fn take_betting_action(
        &mut self,
        player_id: PlayerId,
        action: BettingAction,
    ) -> Result<(), GameError> {
        self.data.take_ante(player_id, action)
    }

    fn is_ready_for_next_phase(&self) -> bool {
        self.data.all_antes_posted()
    }

    fn apply_timeout_defaults(&mut self) {
        self.data.fold_missing_antes();
    }
}

impl PhaseActions for Game<Showdown> {
    fn is_ready_for_next_phase(&self) -> bool {
        true
    }
}

macro_rules! impl_pause_actions {
    ($($state:ty),+ $(,)?) => {
        $(
            impl PhaseActions for Game<$state> {
                fn is_ready_for_next_phase(&self) -> bool {
                    self.state.is_expired()
                }

                fn apply_timeout_defaults(&mut self) {
                    self.state.expire();
                }
            }
        )+
    };
}

macro_rules! impl_classification_actions {
    ($($state:ty => $kind:expr),+ $(,)?) => {
        $(
            impl PhaseActions for Game<$state> {
                fn take_classification_action(
                    &mut self,
                    player_id: PlayerId,
                    kind: DecisionKind,
                    card_idx: usize,
                ) -> Result<(), GameError> {
                    let phase = self.phase();
                    self.data.record_decision(player_id, kind, card_idx, $kind, phase)
                }

                fn is_ready_for_next_phase(&self) -> bool {
                    self.data.all_decided($kind)
                }

                fn apply_timeout_defaults(&mut self) {
                    self.data.fill_missing_decisions($kind);
                }
            }
        )+
    };
}

macro_rules! impl_betting_actions {
    ($($state:ty),+ $(,)?) => {
        $(
            impl PhaseActions for Game<$state> {
                fn take_betting_action(
                    &mut self,
                    player_id: PlayerId,
                    action: BettingAction,
                ) -> Result<(), GameError> {
                    self.data.take_bet(player_id, action)
                }

                fn is_ready_for_next_phase(&self) -> bool {
                    self.data.is_round_complete()
                }

                fn apply_timeout_defaults(&mut self) {
                    let Some((player_id, action)) = self.data.default_betting_action() else {
                        return;
                    };
                    log::debug!(
                        "Table {}: player {player_id} timed out, defaulting to {action}",
                        self.data.table_id
                    );
                    if let Err(err) = self.data.take_bet(player_id, action) {
                        log::warn!(
                            "Table {}: default action for player {player_id} failed: {err}",
                            self.data.table_id
                        );
                    }
                }
            }
        )+
    };
}

impl_pause_actions!(CardDraw, TurnDraw, BoardReveal, End);

impl_classification_actions!(
    ChooseTrash => DecisionKind::Kill,
    ChooseTango => DecisionKind::Kick,
);

impl_betting_actions!(PreKickBetting, PostTurnBetting, FinalBetting);
