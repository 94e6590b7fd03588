//! Betting round coordination: antes, turn order, bet validation and
//! round completion.

use super::entities::{BettingAction, Phase, PlayerId, PlayerStatus};
use super::state_machine::{GameError, GameEvent, TableData};

impl TableData {
    /// Open a betting round: contributions and acted flags are cleared and
    /// the first seat that can act takes the turn.
    pub(crate) fn start_betting_round(&mut self) {
        for player in &mut self.players {
            player.start_round();
        }
        self.current_bet = 0;
        self.current_player_idx = self.next_actor_from(0).unwrap_or(0);
        self.action_seq += 1;
    }

    /// A round is complete when every player who can still act has matched
    /// the current bet and acted, or is the only one left able to act.
    #[must_use]
    pub fn is_round_complete(&self) -> bool {
        let mut actors = self.players.iter().filter(|p| p.can_act());
        match (actors.next(), actors.next()) {
            (None, _) => true,
            (Some(only), None) => only.round_contribution == self.current_bet,
            (Some(_), Some(_)) => self
                .players
                .iter()
                .filter(|p| p.can_act())
                .all(|p| p.acted_this_round && p.round_contribution == self.current_bet),
        }
    }

    /// Antes are posted in any order. Each player owes exactly the table
    /// ante, or their whole stack if that is smaller.
    pub(crate) fn take_ante(
        &mut self,
        player_id: PlayerId,
        action: BettingAction,
    ) -> Result<(), GameError> {
        let idx = self.player_idx(player_id)?;
        let ante = self.settings.ante;
        let player = &mut self.players[idx];
        if player.acted_this_round || player.is_folded() {
            return Err(GameError::AlreadyActed);
        }
        let label = match action {
            BettingAction::Check => {
                return Err(GameError::WrongPhaseForAction { phase: Phase::Ante });
            }
            BettingAction::Fold => {
                player.fold();
                "fold".to_string()
            }
            BettingAction::Bet(amount) => {
                if amount != ante.min(player.chips) {
                    return Err(GameError::InvalidBetAmount { amount });
                }
                player.commit(amount);
                player.acted_this_round = true;
                self.pot += amount;
                format!("ante {amount}")
            }
        };
        self.record_action(idx, label);
        Ok(())
    }

    /// Players still owing an ante when the clock runs out sit the hand out.
    pub(crate) fn fold_missing_antes(&mut self) {
        let unposted: Vec<usize> = self
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_contender() && !p.acted_this_round)
            .map(|(idx, _)| idx)
            .collect();
        for idx in unposted {
            self.players[idx].fold();
            self.record_action(idx, "fold".to_string());
        }
    }

    #[must_use]
    pub fn all_antes_posted(&self) -> bool {
        self.settings.ante == 0
            || self
                .players
                .iter()
                .filter(|p| p.is_contender())
                .all(|p| p.acted_this_round)
    }

    /// Apply a check, bet or fold from the player holding the turn, then
    /// pass the turn to the next seat that can act.
    pub(crate) fn take_bet(
        &mut self,
        player_id: PlayerId,
        action: BettingAction,
    ) -> Result<(), GameError> {
        let idx = self.player_idx(player_id)?;
        if idx != self.current_player_idx || !self.players[idx].can_act() {
            return Err(GameError::NotPlayersTurn);
        }
        let current_bet = self.current_bet;
        let player = &mut self.players[idx];
        let (label, added) = match action {
            BettingAction::Check => {
                if player.owes(current_bet) > 0 {
                    return Err(GameError::InvalidBetAmount { amount: 0 });
                }
                player.status = PlayerStatus::Checked;
                ("check".to_string(), 0)
            }
            BettingAction::Bet(amount) => {
                let shoves = amount == player.chips;
                let matches = player.round_contribution + amount >= current_bet;
                if amount == 0 || amount > player.chips || !(matches || shoves) {
                    return Err(GameError::InvalidBetAmount { amount });
                }
                if player.commit(amount) {
                    (format!("all-in {amount}"), amount)
                } else {
                    (format!("bet {amount}"), amount)
                }
            }
            BettingAction::Fold => {
                player.fold();
                ("fold".to_string(), 0)
            }
        };
        player.acted_this_round = true;
        self.current_bet = self.current_bet.max(player.round_contribution);
        self.pot += added;
        self.record_action(idx, label);

        let n = self.players.len();
        if let Some(next) = self.next_actor_from((idx + 1) % n) {
            self.current_player_idx = next;
        }
        self.action_seq += 1;
        Ok(())
    }

    /// What a timed-out player does: check when nothing is owed, otherwise
    /// fold.
    #[must_use]
    pub fn default_betting_action(&self) -> Option<(PlayerId, BettingAction)> {
        let player = self.players.get(self.current_player_idx)?;
        if !player.can_act() {
            return None;
        }
        let action = if player.owes(self.current_bet) == 0 {
            BettingAction::Check
        } else {
            BettingAction::Fold
        };
        Some((player.id, action))
    }

    fn record_action(&mut self, idx: usize, label: String) {
        let player = &mut self.players[idx];
        player.last_action = Some(label.clone());
        let player_id = player.id;
        self.push_event(GameEvent::PlayerActed { player_id, label });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Username;
    use crate::game::state_machine::GameSettings;

    fn table(stacks: &[u32], ante: u32) -> TableData {
        let mut data = TableData::new(1, 1, GameSettings::new(ante, 5));
        for (i, &chips) in stacks.iter().enumerate() {
            let id = i as PlayerId + 1;
            data.seat_player(id, Username::new(&format!("p{id}")), chips, Phase::Waiting)
                .unwrap();
        }
        data
    }

    // === Ante Tests ===

    #[test]
    fn test_ante_requires_exact_amount() {
        let mut data = table(&[100, 100], 10);
        assert_eq!(
            data.take_ante(1, BettingAction::Bet(5)),
            Err(GameError::InvalidBetAmount { amount: 5 })
        );
        data.take_ante(1, BettingAction::Bet(10)).unwrap();
        assert_eq!(data.pot, 10);
        assert_eq!(data.players[0].chips, 90);
        assert_eq!(data.players[0].last_action.as_deref(), Some("ante 10"));
    }

    #[test]
    fn test_ante_short_stack_posts_everything() {
        let mut data = table(&[4, 100], 10);
        data.take_ante(1, BettingAction::Bet(4)).unwrap();
        assert_eq!(data.players[0].status, PlayerStatus::AllIn);
    }

    #[test]
    fn test_ante_twice_rejected() {
        let mut data = table(&[100, 100], 10);
        data.take_ante(2, BettingAction::Bet(10)).unwrap();
        assert_eq!(
            data.take_ante(2, BettingAction::Bet(10)),
            Err(GameError::AlreadyActed)
        );
        assert_eq!(
            data.take_ante(1, BettingAction::Check),
            Err(GameError::WrongPhaseForAction { phase: Phase::Ante })
        );
    }

    #[test]
    fn test_missing_antes_fold_on_timeout() {
        let mut data = table(&[100, 100, 100], 10);
        data.take_ante(1, BettingAction::Bet(10)).unwrap();
        assert!(!data.all_antes_posted());
        data.fold_missing_antes();
        assert!(data.all_antes_posted());
        assert_eq!(data.num_contenders(), 1);
    }

    // === Betting Round Tests ===

    #[test]
    fn test_check_around_completes_round() {
        let mut data = table(&[100, 100, 100], 0);
        data.start_betting_round();
        assert!(!data.is_round_complete());
        for id in 1..=3 {
            data.take_bet(id, BettingAction::Check).unwrap();
        }
        assert!(data.is_round_complete());
    }

    #[test]
    fn test_out_of_turn_rejected() {
        let mut data = table(&[100, 100], 0);
        data.start_betting_round();
        assert_eq!(
            data.take_bet(2, BettingAction::Check),
            Err(GameError::NotPlayersTurn)
        );
    }

    #[test]
    fn test_check_facing_bet_rejected() {
        let mut data = table(&[100, 100], 0);
        data.start_betting_round();
        data.take_bet(1, BettingAction::Bet(20)).unwrap();
        assert_eq!(
            data.take_bet(2, BettingAction::Check),
            Err(GameError::InvalidBetAmount { amount: 0 })
        );
        assert_eq!(
            data.take_bet(2, BettingAction::Bet(10)),
            Err(GameError::InvalidBetAmount { amount: 10 })
        );
        data.take_bet(2, BettingAction::Bet(20)).unwrap();
        assert!(data.is_round_complete());
        assert_eq!(data.pot, 40);
    }

    #[test]
    fn test_raise_reopens_action() {
        let mut data = table(&[100, 100, 100], 0);
        data.start_betting_round();
        data.take_bet(1, BettingAction::Bet(10)).unwrap();
        data.take_bet(2, BettingAction::Bet(30)).unwrap();
        data.take_bet(3, BettingAction::Bet(30)).unwrap();
        assert!(!data.is_round_complete());
        assert_eq!(data.current_player_idx, 0);
        data.take_bet(1, BettingAction::Bet(20)).unwrap();
        assert!(data.is_round_complete());
        assert_eq!(data.current_bet, 30);
    }

    #[test]
    fn test_all_in_for_less_is_legal() {
        let mut data = table(&[100, 15], 0);
        data.start_betting_round();
        data.take_bet(1, BettingAction::Bet(50)).unwrap();
        data.take_bet(2, BettingAction::Bet(15)).unwrap();
        assert_eq!(data.players[1].status, PlayerStatus::AllIn);
        assert_eq!(data.players[1].last_action.as_deref(), Some("all-in 15"));
        assert!(data.is_round_complete());
    }

    #[test]
    fn test_turn_skips_folded_and_wraps() {
        let mut data = table(&[100, 100, 100, 100], 0);
        data.start_betting_round();
        data.take_bet(1, BettingAction::Check).unwrap();
        data.take_bet(2, BettingAction::Fold).unwrap();
        data.take_bet(3, BettingAction::Check).unwrap();
        data.take_bet(4, BettingAction::Bet(10)).unwrap();
        // Seat 2 folded, so the turn wraps from seat 4 to seat 1 and then
        // jumps to seat 3.
        assert_eq!(data.current_player_idx, 0);
        data.take_bet(1, BettingAction::Bet(10)).unwrap();
        assert_eq!(data.current_player_idx, 2);
    }

    #[test]
    fn test_default_action_checks_or_folds() {
        let mut data = table(&[100, 100], 0);
        data.start_betting_round();
        assert_eq!(
            data.default_betting_action(),
            Some((1, BettingAction::Check))
        );
        data.take_bet(1, BettingAction::Bet(10)).unwrap();
        assert_eq!(data.default_betting_action(), Some((2, BettingAction::Fold)));
    }

    #[test]
    fn test_action_seq_advances_per_action() {
        let mut data = table(&[100, 100], 0);
        data.start_betting_round();
        let before = data.action_seq;
        data.take_bet(1, BettingAction::Check).unwrap();
        assert_eq!(data.action_seq, before + 1);
    }
}
