//! The per-table state enum and the session wrapper the table actor drives.

use enum_dispatch::enum_dispatch;
use std::collections::VecDeque;

use super::constants::MAX_CHAT_MESSAGE_LENGTH;
use super::entities::{
    BettingAction, Chips, DecisionKind, Deck, GameId, HandId, Phase, Player, PlayerId, SeatIndex,
    TableId, TableSnapshot, Username,
};
use super::state_machine::{
    Game, GameError, GameEvent, GameSettings, PhaseActions, TableData, TableStateManagement,
};
use super::states::{
    Ante, BoardReveal, CardDraw, ChooseTango, ChooseTrash, End, FinalBetting, PostTurnBetting,
    PreKickBetting, Showdown, TurnDraw, Waiting,
};

/// Identifies one countdown. Two timers with the same key guard the same
/// decision, so the actor only re-arms when the key changes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TimerKey {
    pub hand_number: u64,
    pub phase: Phase,
    /// Distinguishes turns within a betting phase.
    pub turn: u64,
}

/// A table in one of its phases.
#[enum_dispatch(TableStateManagement, PhaseActions)]
#[derive(Debug)]
pub enum TangoState {
    Waiting(Game<Waiting>),
    Ante(Game<Ante>),
    CardDraw(Game<CardDraw>),
    ChooseTrash(Game<ChooseTrash>),
    ChooseTango(Game<ChooseTango>),
    PreKickBetting(Game<PreKickBetting>),
    TurnDraw(Game<TurnDraw>),
    PostTurnBetting(Game<PostTurnBetting>),
    BoardReveal(Game<BoardReveal>),
    FinalBetting(Game<FinalBetting>),
    Showdown(Game<Showdown>),
    End(Game<End>),
}

impl Default for TangoState {
    fn default() -> Self {
        Self::new(TableData::new(0, 0, GameSettings::default()))
    }
}

/// Moves an in-hand phase forward. Aborted hands are refunded and a hand
/// with a single contender goes straight to the showdown.
macro_rules! advance_hand {
    ($game:ident, $variant:ident => $next:ident) => {
        if $game.data.aborted {
            Self::End($game.abort_hand())
        } else if $game.data.num_contenders() <= 1 {
            Self::Showdown($game.into_showdown())
        } else if $game.is_ready_for_next_phase() {
            Self::$next($game.into())
        } else {
            Self::$variant($game)
        }
    };
}

impl TangoState {
    #[must_use]
    pub fn new(data: TableData) -> Self {
        Self::Waiting(Game {
            data,
            state: Waiting::default(),
        })
    }

    fn step_once(self) -> Self {
        match self {
            Self::Waiting(game) => {
                if game.is_ready_for_next_phase() {
                    Self::Ante(game.into())
                } else {
                    Self::Waiting(game)
                }
            }
            Self::Ante(game) => advance_hand!(game, Ante => CardDraw),
            Self::CardDraw(game) => advance_hand!(game, CardDraw => ChooseTrash),
            Self::ChooseTrash(game) => advance_hand!(game, ChooseTrash => ChooseTango),
            Self::ChooseTango(game) => advance_hand!(game, ChooseTango => PreKickBetting),
            Self::PreKickBetting(game) => advance_hand!(game, PreKickBetting => TurnDraw),
            Self::TurnDraw(game) => advance_hand!(game, TurnDraw => PostTurnBetting),
            Self::PostTurnBetting(game) => advance_hand!(game, PostTurnBetting => BoardReveal),
            Self::BoardReveal(game) => advance_hand!(game, BoardReveal => FinalBetting),
            Self::FinalBetting(game) => advance_hand!(game, FinalBetting => Showdown),
            Self::Showdown(game) => Self::End(game.into()),
            Self::End(game) => {
                if !game.is_ready_for_next_phase() {
                    Self::End(game)
                } else if game.data.has_enough_players() {
                    Self::CardDraw(game.into())
                } else {
                    Self::Waiting(game.into())
                }
            }
        }
    }

    /// Advance through every phase whose work is already done.
    #[must_use]
    pub fn step(self) -> Self {
        let mut state = self;
        loop {
            let before = state.phase();
            state = state.step_once();
            let after = state.phase();
            if before == after {
                return state;
            }
            log::debug!("Table {}: {before} -> {after}", state.data().table_id);
            state.data_mut().push_event(GameEvent::PhaseChanged(after));
        }
    }
}

/// The mutable state of one table. Every entry point validates, mutates,
/// and then advances the phase as far as it can go.
#[derive(Debug, Default)]
pub struct TableSession {
    state: TangoState,
}

impl TableSession {
    #[must_use]
    pub fn new(table_id: TableId, game_id: GameId, settings: GameSettings) -> Self {
        let mut data = TableData::new(table_id, game_id, settings);
        data.rebuild_deck();
        Self {
            state: TangoState::new(data),
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    #[must_use]
    pub fn data(&self) -> &TableData {
        self.state.data()
    }

    pub fn seat_player(
        &mut self,
        player_id: PlayerId,
        name: &str,
        chips: Chips,
    ) -> Result<SeatIndex, GameError> {
        let phase = self.phase();
        let seat = self
            .state
            .data_mut()
            .seat_player(player_id, Username::new(name), chips, phase)?;
        self.transition();
        Ok(seat)
    }

    pub fn unseat_player(&mut self, player_id: PlayerId) -> Result<Player, GameError> {
        let phase = self.phase();
        let player = self.state.data_mut().remove_player(player_id, phase)?;
        self.transition();
        Ok(player)
    }

    pub fn apply_betting_action(
        &mut self,
        player_id: PlayerId,
        action: BettingAction,
    ) -> Result<(), GameError> {
        self.state.take_betting_action(player_id, action)?;
        self.transition();
        Ok(())
    }

    pub fn apply_classification_action(
        &mut self,
        player_id: PlayerId,
        kind: DecisionKind,
        card_idx: usize,
    ) -> Result<(), GameError> {
        self.state
            .take_classification_action(player_id, kind, card_idx)?;
        self.transition();
        Ok(())
    }

    /// Advance if the table is still in `expected`. Returns the phase the
    /// table ends up in.
    pub fn advance(&mut self, expected: Phase) -> Result<Phase, GameError> {
        if self.phase() != expected {
            return Err(GameError::StaleTimerNoop);
        }
        self.transition();
        Ok(self.phase())
    }

    /// Apply the default actions for a phase whose countdown ran out, then
    /// advance. A countdown for a phase the table already left is a no-op.
    pub fn on_timer_expired(&mut self, expected: Phase) -> Result<Phase, GameError> {
        if self.phase() != expected {
            log::trace!(
                "Table {}: stale timer for {expected}, now in {}",
                self.data().table_id,
                self.phase()
            );
            return Err(GameError::StaleTimerNoop);
        }
        self.state.apply_timeout_defaults();
        self.transition();
        Ok(self.phase())
    }

    /// Check that `player_id` may chat right now and clean up the message.
    pub fn validate_chat(&self, player_id: PlayerId, message: &str) -> Result<String, GameError> {
        self.data().player_idx(player_id)?;
        if !self.data().chat_enabled {
            return Err(GameError::ChatDisabled);
        }
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Err(GameError::EmptyChatMessage);
        }
        Ok(trimmed.chars().take(MAX_CHAT_MESSAGE_LENGTH).collect())
    }

    /// The countdown the table should be running, if any.
    #[must_use]
    pub fn timer_key(&self) -> Option<TimerKey> {
        let phase = self.phase();
        if matches!(phase, Phase::Waiting | Phase::Showdown) {
            return None;
        }
        let data = self.data();
        Some(TimerKey {
            hand_number: data.hand_number,
            phase,
            turn: if phase.is_betting() { data.action_seq } else { 0 },
        })
    }

    pub fn set_countdown(&mut self, secs: u32) {
        self.state.data_mut().countdown = secs;
    }

    pub fn set_hand_id(&mut self, hand_id: HandId) {
        self.state.data_mut().hand_id = Some(hand_id);
    }

    #[must_use]
    pub fn snapshot(&self, viewer: Option<PlayerId>) -> TableSnapshot {
        self.state.snapshot(viewer)
    }

    pub fn drain_events(&mut self) -> VecDeque<GameEvent> {
        self.state.drain_events()
    }

    /// Replace the deck used for the next deal.
    pub fn stack_deck(&mut self, deck: Deck) {
        self.state.data_mut().deck = deck;
    }

    fn transition(&mut self) {
        let state = std::mem::take(&mut self.state);
        self.state = state.step();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Card, HandCategory, SidePot, Suit};

    fn session(ante: Chips) -> TableSession {
        TableSession::new(1, 1, GameSettings::new(ante, 5))
    }

    fn everyone(session: &mut TableSession, ids: &[PlayerId], action: BettingAction) {
        for &id in ids {
            session.apply_betting_action(id, action).unwrap();
        }
    }

    fn choose(session: &mut TableSession, ids: &[PlayerId], kind: DecisionKind, idx: usize) {
        for &id in ids {
            session.apply_classification_action(id, kind, idx).unwrap();
        }
    }

    fn stacked_three_way() -> Deck {
        use Suit::*;
        Deck::stacked(&[
            // private cards, seat order
            Card(2, Club),
            Card(7, Diamond),
            Card(3, Spade),
            Card(2, Diamond),
            Card(8, Heart),
            Card(13, Spade),
            Card(2, Heart),
            Card(9, Club),
            Card(5, Diamond),
            // turn cards
            Card(4, Club),
            Card(13, Heart),
            Card(2, Spade),
            // dealer
            Card(13, Diamond),
            Card(11, Spade),
        ])
    }

    // === Seating Tests ===

    #[test]
    fn test_second_player_starts_hand() {
        let mut session = session(10);
        session.seat_player(1, "ann", 100).unwrap();
        assert_eq!(session.phase(), Phase::Waiting);
        session.seat_player(2, "bob", 100).unwrap();
        assert_eq!(session.phase(), Phase::Ante);
        assert_eq!(session.data().hand_number, 1);
        assert!(!session.data().chat_enabled);
    }

    #[test]
    fn test_seat_player_is_idempotent_and_bounded() {
        let mut session = TableSession::new(1, 1, GameSettings::new(10, 2));
        assert_eq!(session.seat_player(1, "ann", 100), Ok(0));
        assert_eq!(session.seat_player(1, "ann", 100), Ok(0));
        session.seat_player(2, "bob", 100).unwrap();
        assert_eq!(session.seat_player(3, "cat", 100), Err(GameError::TableFull));
    }

    #[test]
    fn test_mid_hand_joiner_sits_out() {
        let mut session = session(0);
        session.seat_player(1, "ann", 100).unwrap();
        session.seat_player(2, "bob", 100).unwrap();
        assert_eq!(session.phase(), Phase::CardDraw);
        session.seat_player(3, "cat", 100).unwrap();
        let cat = session.data().player(3).unwrap();
        assert!(cat.is_folded());
        assert!(cat.cards.is_empty());
    }

    // === Full Hand Tests ===

    #[test]
    fn test_three_way_hand_checked_down() {
        let mut session = session(10);
        session.stack_deck(stacked_three_way());
        for (id, name) in [(1, "ann"), (2, "bob"), (3, "cat")] {
            session.seat_player(id, name, 100).unwrap();
        }
        let ids = [1, 2, 3];
        everyone(&mut session, &ids, BettingAction::Bet(10));
        assert_eq!(session.phase(), Phase::CardDraw);
        assert_eq!(session.data().pot, 30);

        assert_eq!(session.on_timer_expired(Phase::CardDraw), Ok(Phase::ChooseTrash));
        choose(&mut session, &ids, DecisionKind::Kill, 0);
        assert_eq!(session.phase(), Phase::ChooseTango);
        choose(&mut session, &ids, DecisionKind::Kick, 0);
        assert_eq!(session.phase(), Phase::PreKickBetting);

        everyone(&mut session, &ids, BettingAction::Check);
        assert_eq!(session.phase(), Phase::TurnDraw);
        session.on_timer_expired(Phase::TurnDraw).unwrap();
        everyone(&mut session, &ids, BettingAction::Check);
        assert_eq!(session.phase(), Phase::BoardReveal);

        use Suit::*;
        assert_eq!(
            session.data().community_cards,
            vec![
                Card(7, Diamond),
                Card(8, Heart),
                Card(9, Club),
                Card(13, Diamond),
                Card(11, Spade),
            ]
        );
        session.on_timer_expired(Phase::BoardReveal).unwrap();
        everyone(&mut session, &ids, BettingAction::Check);
        assert_eq!(session.phase(), Phase::End);

        let data = session.data();
        assert_eq!(data.player(2).unwrap().chips, 120);
        assert_eq!(data.player(1).unwrap().chips, 90);
        assert_eq!(data.winners.len(), 1);
        assert_eq!(data.winners[0].player_id, 2);
        assert_eq!(
            data.winners[0].strength.and_then(|s| s.category()),
            Some(HandCategory::ThreeOfAKind)
        );
        assert!(data.chat_enabled);

        let events = session.drain_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::HandEnded { .. })));
        assert!(events.contains(&GameEvent::PhaseChanged(Phase::Showdown)));

        assert_eq!(session.on_timer_expired(Phase::End), Ok(Phase::CardDraw));
        assert_eq!(session.data().hand_number, 2);
        assert_eq!(session.data().deck.len(), 52 - 3 * ids.len());
    }

    #[test]
    fn test_all_in_creates_side_pot() {
        let mut session = session(10);
        session.seat_player(1, "ann", 60).unwrap();
        session.seat_player(2, "bob", 200).unwrap();
        session.seat_player(3, "cat", 200).unwrap();
        everyone(&mut session, &[1, 2, 3], BettingAction::Bet(10));
        session.on_timer_expired(Phase::CardDraw).unwrap();
        session.on_timer_expired(Phase::ChooseTrash).unwrap();
        session.on_timer_expired(Phase::ChooseTango).unwrap();
        assert_eq!(session.phase(), Phase::PreKickBetting);

        session.apply_betting_action(1, BettingAction::Bet(50)).unwrap();
        session.apply_betting_action(2, BettingAction::Bet(50)).unwrap();
        session.apply_betting_action(3, BettingAction::Fold).unwrap();
        assert_eq!(session.phase(), Phase::TurnDraw);

        // Only one player can still bet, so the remaining rounds close
        // as soon as they open.
        assert_eq!(session.on_timer_expired(Phase::TurnDraw), Ok(Phase::BoardReveal));
        assert_eq!(session.on_timer_expired(Phase::BoardReveal), Ok(Phase::End));

        let data = session.data();
        assert_eq!(
            data.side_pots,
            vec![SidePot {
                amount: 120,
                eligible: vec![1, 2]
            }]
        );
        let won: Chips = data.winners.iter().map(|w| w.amount).sum();
        assert_eq!(won, 130);
        let total: Chips = data.players.iter().map(|p| p.chips).sum();
        assert_eq!(total, 460);
        assert_eq!(data.player(3).unwrap().chips, 190);
    }

    #[test]
    fn test_everyone_folds_to_one_player() {
        let mut session = session(10);
        for id in 1..=3 {
            session.seat_player(id, "p", 100).unwrap();
        }
        everyone(&mut session, &[1, 2, 3], BettingAction::Bet(10));
        session.on_timer_expired(Phase::CardDraw).unwrap();
        session.on_timer_expired(Phase::ChooseTrash).unwrap();
        session.on_timer_expired(Phase::ChooseTango).unwrap();
        session.apply_betting_action(1, BettingAction::Bet(20)).unwrap();
        session.apply_betting_action(2, BettingAction::Fold).unwrap();
        session.apply_betting_action(3, BettingAction::Fold).unwrap();
        assert_eq!(session.phase(), Phase::End);
        assert_eq!(session.data().player(1).unwrap().chips, 120);
        assert_eq!(session.data().winners[0].strength, None);
    }

    #[test]
    fn test_next_hand_deals_without_ante() {
        let mut session = session(10);
        for id in 1..=3 {
            session.seat_player(id, "p", 100).unwrap();
        }
        everyone(&mut session, &[1, 2, 3], BettingAction::Bet(10));
        session.on_timer_expired(Phase::CardDraw).unwrap();
        session.on_timer_expired(Phase::ChooseTrash).unwrap();
        session.on_timer_expired(Phase::ChooseTango).unwrap();
        session.apply_betting_action(1, BettingAction::Fold).unwrap();
        session.apply_betting_action(2, BettingAction::Fold).unwrap();
        assert_eq!(session.phase(), Phase::End);
        let stacks: Vec<Chips> = session.data().players.iter().map(|p| p.chips).collect();
        assert_eq!(stacks, vec![90, 90, 120]);
        let _ = session.drain_events();

        assert_eq!(session.on_timer_expired(Phase::End), Ok(Phase::CardDraw));
        let data = session.data();
        assert_eq!(data.hand_number, 2);
        assert_eq!(data.pot, 0);
        assert!(data.winners.is_empty());
        assert!(!data.chat_enabled);
        for (player, chips) in data.players.iter().zip(stacks) {
            assert_eq!(player.chips, chips);
            assert_eq!(player.cards.len(), 3);
            assert_eq!(player.hand_contribution, 0);
        }

        let events = session.drain_events();
        assert!(events.contains(&GameEvent::HandStarted { hand_number: 2 }));
        assert!(!events.contains(&GameEvent::PhaseChanged(Phase::Ante)));
    }

    #[test]
    fn test_ante_timeout_can_end_hand() {
        let mut session = session(10);
        session.seat_player(1, "ann", 100).unwrap();
        session.seat_player(2, "bob", 100).unwrap();
        session.apply_betting_action(1, BettingAction::Bet(10)).unwrap();
        assert_eq!(session.on_timer_expired(Phase::Ante), Ok(Phase::End));
        assert_eq!(session.data().player(1).unwrap().chips, 100);
    }

    #[test]
    fn test_zero_ante_skips_ante_phase() {
        let mut session = session(0);
        session.seat_player(1, "ann", 100).unwrap();
        session.seat_player(2, "bob", 100).unwrap();
        assert_eq!(session.phase(), Phase::CardDraw);
        assert_eq!(session.data().player(1).unwrap().cards.len(), 3);
    }

    // === Timer Tests ===

    #[test]
    fn test_stale_timer_is_noop() {
        let mut session = session(10);
        session.seat_player(1, "ann", 100).unwrap();
        session.seat_player(2, "bob", 100).unwrap();
        assert_eq!(
            session.on_timer_expired(Phase::FinalBetting),
            Err(GameError::StaleTimerNoop)
        );
        assert_eq!(session.advance(Phase::End), Err(GameError::StaleTimerNoop));
        assert_eq!(session.phase(), Phase::Ante);
    }

    #[test]
    fn test_timer_key_changes_per_turn() {
        let mut session = session(0);
        session.seat_player(1, "ann", 100).unwrap();
        session.seat_player(2, "bob", 100).unwrap();
        session.on_timer_expired(Phase::CardDraw).unwrap();
        session.on_timer_expired(Phase::ChooseTrash).unwrap();
        session.on_timer_expired(Phase::ChooseTango).unwrap();
        let first = session.timer_key().unwrap();
        session.apply_betting_action(1, BettingAction::Check).unwrap();
        let second = session.timer_key().unwrap();
        assert_eq!(first.phase, Phase::PreKickBetting);
        assert_ne!(first, second);
    }

    #[test]
    fn test_betting_timeout_folds_player_facing_bet() {
        let mut session = session(0);
        for id in 1..=3 {
            session.seat_player(id, "p", 100).unwrap();
        }
        session.on_timer_expired(Phase::CardDraw).unwrap();
        session.on_timer_expired(Phase::ChooseTrash).unwrap();
        session.on_timer_expired(Phase::ChooseTango).unwrap();
        session.apply_betting_action(1, BettingAction::Bet(10)).unwrap();
        session.on_timer_expired(Phase::PreKickBetting).unwrap();
        assert!(session.data().player(2).unwrap().is_folded());
        assert_eq!(session.data().current_player_idx, 2);
    }

    #[test]
    fn test_classification_wrong_phase() {
        let mut session = session(10);
        session.seat_player(1, "ann", 100).unwrap();
        session.seat_player(2, "bob", 100).unwrap();
        assert_eq!(
            session.apply_classification_action(1, DecisionKind::Kill, 0),
            Err(GameError::WrongPhaseForAction { phase: Phase::Ante })
        );
    }

    // === Leaving Tests ===

    #[test]
    fn test_leave_on_turn_passes_turn() {
        let mut session = session(0);
        for id in 1..=3 {
            session.seat_player(id, "p", 100).unwrap();
        }
        session.on_timer_expired(Phase::CardDraw).unwrap();
        session.on_timer_expired(Phase::ChooseTrash).unwrap();
        session.on_timer_expired(Phase::ChooseTango).unwrap();
        session.apply_betting_action(1, BettingAction::Bet(10)).unwrap();
        let pot = session.data().pot;
        let left = session.unseat_player(2).unwrap();
        assert_eq!(left.chips, 100);
        assert_eq!(session.data().pot, pot);
        let current = &session.data().players[session.data().current_player_idx];
        assert_eq!(current.id, 3);
    }

    #[test]
    fn test_last_opponent_leaving_ends_hand() {
        let mut session = session(10);
        session.seat_player(1, "ann", 100).unwrap();
        session.seat_player(2, "bob", 100).unwrap();
        everyone(&mut session, &[1, 2], BettingAction::Bet(10));
        session.unseat_player(2).unwrap();
        assert_eq!(session.phase(), Phase::End);
        assert_eq!(session.data().player(1).unwrap().chips, 110);
        assert_eq!(
            session.unseat_player(2).unwrap_err(),
            GameError::PlayerNotAtTable
        );
    }

    // === Abort Tests ===

    #[test]
    fn test_deck_exhaustion_refunds_hand() {
        let mut session = session(10);
        let mut deck = Deck::new();
        deck.deal(48).unwrap();
        session.stack_deck(deck);
        session.seat_player(1, "ann", 100).unwrap();
        session.seat_player(2, "bob", 100).unwrap();
        everyone(&mut session, &[1, 2], BettingAction::Bet(10));
        assert_eq!(session.phase(), Phase::End);
        assert_eq!(session.data().player(1).unwrap().chips, 100);
        assert_eq!(session.data().player(2).unwrap().chips, 100);
        assert!(
            session
                .drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::HandAborted { .. }))
        );
    }

    // === Chat and Snapshot Tests ===

    #[test]
    fn test_chat_only_between_hands() {
        let mut session = session(10);
        session.seat_player(1, "ann", 100).unwrap();
        assert_eq!(session.validate_chat(1, "  hi  "), Ok("hi".to_string()));
        assert_eq!(session.validate_chat(1, "   "), Err(GameError::EmptyChatMessage));
        assert_eq!(session.validate_chat(9, "hi"), Err(GameError::PlayerNotAtTable));
        session.seat_player(2, "bob", 100).unwrap();
        assert_eq!(session.validate_chat(1, "hi"), Err(GameError::ChatDisabled));
    }

    #[test]
    fn test_chat_truncated() {
        let mut session = session(10);
        session.seat_player(1, "ann", 100).unwrap();
        let long = "é".repeat(MAX_CHAT_MESSAGE_LENGTH + 20);
        let message = session.validate_chat(1, &long).unwrap();
        assert_eq!(message.chars().count(), MAX_CHAT_MESSAGE_LENGTH);
    }

    #[test]
    fn test_snapshot_hides_other_players_cards() {
        let mut session = session(0);
        session.seat_player(1, "ann", 100).unwrap();
        session.seat_player(2, "bob", 100).unwrap();
        let snapshot = session.snapshot(Some(1));
        assert_eq!(snapshot.player(1).unwrap().cards.len(), 3);
        assert!(snapshot.player(2).unwrap().cards.is_empty());
        assert_eq!(snapshot.player(2).unwrap().card_count, 3);
        assert!(snapshot.player(2).unwrap().decisions.is_none());
        assert!(session.snapshot(None).players.iter().all(|p| p.cards.is_empty()));
    }
}
