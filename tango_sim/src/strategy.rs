//! Decision making for automated players.

use rand::Rng;
use three_card_tango::entities::{
    BettingAction, Card, Chips, DecisionKind, Phase, PlayerId, PlayerStatus, PlayerView,
    TableSnapshot,
};

/// Something an automated player wants to submit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Classify { kind: DecisionKind, card_idx: usize },
    Bet(BettingAction),
}

/// A simple fixed-limit player: kills its lowest card, kicks the middle
/// one, checks when it can and calls bets up to a few antes.
#[derive(Debug, Clone)]
pub struct Strategy {
    /// Chance of opening the betting when nobody has bet yet
    pub bet_chance: f64,
    /// Largest call, in antes
    pub call_antes: Chips,
}

impl Default for Strategy {
    fn default() -> Self {
        Self {
            bet_chance: 0.25,
            call_antes: 2,
        }
    }
}

/// Index of the lowest card by value
fn lowest(cards: &[Card]) -> Option<usize> {
    cards
        .iter()
        .enumerate()
        .min_by_key(|(_, card)| card.0)
        .map(|(idx, _)| idx)
}

impl Strategy {
    /// Pick the move `me` should make given what the table shows them.
    /// `None` when it is not their move.
    pub fn decide<R: Rng + ?Sized>(
        &self,
        table: &TableSnapshot,
        me: PlayerId,
        rng: &mut R,
    ) -> Option<Move> {
        let player = table.player(me)?;
        if player.status == PlayerStatus::Folded {
            return None;
        }

        match table.phase {
            Phase::Ante if player.last_action.is_none() => {
                let ante = table.ante.min(player.chips);
                Some(Move::Bet(if ante == 0 {
                    BettingAction::Fold
                } else {
                    BettingAction::Bet(ante)
                }))
            }
            Phase::ChooseTrash => self.classify(player, DecisionKind::Kill),
            Phase::ChooseTango => self.classify(player, DecisionKind::Kick),
            phase if phase.is_betting() && table.current_player_id == Some(me) => {
                Some(Move::Bet(self.bet(table, player, rng)))
            }
            _ => None,
        }
    }

    fn classify(&self, player: &PlayerView, kind: DecisionKind) -> Option<Move> {
        let decisions = player.decisions?;
        if decisions.get(kind).is_some() {
            return None;
        }
        // After the kill the lowest remaining card is the middle one
        let card_idx = lowest(&player.cards)?;
        Some(Move::Classify { kind, card_idx })
    }

    fn bet<R: Rng + ?Sized>(
        &self,
        table: &TableSnapshot,
        player: &PlayerView,
        rng: &mut R,
    ) -> BettingAction {
        let owes = table.current_bet.saturating_sub(player.round_contribution);
        if owes == 0 {
            let opening = table.ante.max(1).min(player.chips);
            if opening > 0 && rng.random_bool(self.bet_chance) {
                return BettingAction::Bet(opening);
            }
            return BettingAction::Check;
        }

        let limit = table.ante.max(1).saturating_mul(self.call_antes);
        if owes <= limit {
            BettingAction::Bet(owes.min(player.chips))
        } else {
            BettingAction::Fold
        }
    }
}
