//! Pot resolution: showdown evaluation, side pots, and refunds for hands
//! that could not be completed.

use std::collections::HashMap;

use super::entities::{Chips, HandResult, HandStrength, PlayerId, Winner};
use super::functional::{self, compute_side_pots, split_pot};
use super::state_machine::{GameEvent, TableData};

impl TableData {
    /// Evaluate the contenders' hands and pay out every pot.
    pub(crate) fn resolve_showdown(&mut self) {
        let contenders: Vec<usize> = self
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_contender())
            .map(|(idx, _)| idx)
            .collect();

        let payouts = match contenders.as_slice() {
            [] => {
                let seated: Vec<PlayerId> = self.players.iter().map(|p| p.id).collect();
                if seated.is_empty() && self.pot > 0 {
                    log::warn!("Table {}: ${} left in an empty table's pot", self.table_id, self.pot);
                }
                split_pot(self.pot, &seated)
            }
            [only] => vec![(self.players[*only].id, self.pot)],
            _ => self.award_contested_pots(&contenders),
        };

        let mut won: HashMap<PlayerId, Chips> = HashMap::new();
        for (player_id, amount) in payouts {
            *won.entry(player_id).or_default() += amount;
        }

        let mut winners = Vec::new();
        for player in &mut self.players {
            let Some(&amount) = won.get(&player.id).filter(|&&amount| amount > 0) else {
                continue;
            };
            player.chips += amount;
            winners.push(Winner {
                player_id: player.id,
                name: player.name.clone(),
                amount,
                strength: player.strength,
            });
        }
        let results: Vec<HandResult> = self
            .players
            .iter()
            .map(|p| HandResult {
                player_id: p.id,
                final_hand: p.final_hand.clone(),
                strength: p.strength,
                bet_amount: p.hand_contribution,
                amount_won: won.get(&p.id).copied().unwrap_or_default(),
                folded: p.is_folded(),
            })
            .collect();

        for winner in &winners {
            log::info!(
                "Table {}: {} wins ${} in hand #{}",
                self.table_id,
                winner.name,
                winner.amount,
                self.hand_number
            );
            self.push_event(GameEvent::PotAwarded {
                player_id: winner.player_id,
                amount: winner.amount,
            });
        }
        self.pot = 0;
        self.winners = winners.clone();
        self.push_event(GameEvent::ShowdownResolved { winners, results });
    }

    /// Evaluate every contender and split each pot between the best hands
    /// eligible for it.
    fn award_contested_pots(&mut self, contenders: &[usize]) -> Vec<(PlayerId, Chips)> {
        let community = self.community_cards.clone();
        for &idx in contenders {
            let player = &mut self.players[idx];
            if let Some(hand) = functional::best_hand(&player.showdown_cards(&community)) {
                player.final_hand = hand.cards.to_vec();
                player.strength = Some(hand.strength);
            }
        }

        // Seat order is kept so ties pay the earliest seat first.
        let ranked: Vec<(PlayerId, Option<HandStrength>)> = contenders
            .iter()
            .map(|&idx| (self.players[idx].id, self.players[idx].strength))
            .collect();

        if contenders.iter().any(|&idx| self.players[idx].is_all_in()) {
            let contributions: Vec<(PlayerId, Chips)> = contenders
                .iter()
                .map(|&idx| (self.players[idx].id, self.players[idx].hand_contribution))
                .collect();
            self.side_pots = compute_side_pots(&contributions);
        }

        let mut payouts = Vec::new();
        for pot in &self.side_pots {
            let eligible: Vec<_> = ranked
                .iter()
                .filter(|(id, _)| pot.eligible.contains(id))
                .copied()
                .collect();
            payouts.extend(split_pot(pot.amount, &best_of(&eligible)));
        }
        let layered: Chips = self.side_pots.iter().map(|pot| pot.amount).sum();
        let main_pot = self.pot.saturating_sub(layered);
        if main_pot > 0 {
            payouts.extend(split_pot(main_pot, &best_of(&ranked)));
        }
        payouts
    }

    /// Give every player back what they put into an unfinished hand. Chips
    /// left by players who already left are split between those seated.
    pub(crate) fn refund_hand(&mut self) {
        for player in &mut self.players {
            player.chips += player.hand_contribution;
            self.pot = self.pot.saturating_sub(player.hand_contribution);
            player.hand_contribution = 0;
            player.round_contribution = 0;
        }
        if self.pot > 0 {
            let seated: Vec<PlayerId> = self.players.iter().map(|p| p.id).collect();
            for (player_id, amount) in split_pot(self.pot, &seated) {
                if let Some(player) = self.players.iter_mut().find(|p| p.id == player_id) {
                    player.chips += amount;
                }
            }
        }
        self.pot = 0;
        self.side_pots.clear();
        self.current_bet = 0;
    }

    /// Close the hand: chat reopens and everyone's balance is published.
    pub(crate) fn finish_hand(&mut self) {
        self.chat_enabled = true;
        self.current_bet = 0;
        let balances = self.players.iter().map(|p| (p.id, p.chips)).collect();
        self.push_event(GameEvent::HandEnded { balances });
    }
}

fn best_of(ranked: &[(PlayerId, Option<HandStrength>)]) -> Vec<PlayerId> {
    let strengths: Vec<Option<HandStrength>> = ranked.iter().map(|(_, s)| *s).collect();
    functional::argmax(&strengths)
        .into_iter()
        .map(|idx| ranked[idx].0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Card, Phase, PlayerStatus, SidePot, Suit, Username};
    use crate::game::state_machine::GameSettings;

    fn table(stacks: &[Chips]) -> TableData {
        let mut data = TableData::new(1, 1, GameSettings::new(0, 5));
        for (i, &chips) in stacks.iter().enumerate() {
            let id = i as PlayerId + 1;
            data.seat_player(id, Username::new(&format!("p{id}")), chips, Phase::Waiting)
                .unwrap();
        }
        data
    }

    fn put_in(data: &mut TableData, idx: usize, amount: Chips) {
        data.players[idx].commit(amount);
        data.pot += amount;
    }

    fn give(data: &mut TableData, idx: usize, remaining: Card, turn: Card) {
        data.players[idx].cards = vec![remaining];
        data.players[idx].turn_card = Some(turn);
    }

    fn board(data: &mut TableData) {
        use Suit::*;
        data.community_cards = vec![
            Card(2, Club),
            Card(7, Diamond),
            Card(9, Heart),
            Card(11, Spade),
            Card(4, Heart),
        ];
    }

    // === Uncontested Tests ===

    #[test]
    fn test_last_player_standing_takes_pot() {
        let mut data = table(&[100, 100]);
        put_in(&mut data, 0, 20);
        put_in(&mut data, 1, 30);
        data.players[0].fold();
        data.resolve_showdown();
        assert_eq!(data.players[1].chips, 120);
        assert_eq!(data.pot, 0);
        assert_eq!(data.winners.len(), 1);
        assert_eq!(data.winners[0].strength, None);
    }

    // === Contested Tests ===

    #[test]
    fn test_best_hand_wins_main_pot() {
        use Suit::*;
        let mut data = table(&[100, 100]);
        put_in(&mut data, 0, 30);
        put_in(&mut data, 1, 30);
        board(&mut data);
        give(&mut data, 0, Card(14, Spade), Card(3, Club));
        give(&mut data, 1, Card(9, Club), Card(9, Diamond));
        data.resolve_showdown();
        assert_eq!(data.players[0].chips, 70);
        assert_eq!(data.players[1].chips, 130);
        assert_eq!(data.players[1].final_hand.len(), 5);
    }

    #[test]
    fn test_tie_splits_with_remainder_to_first_seat() {
        use Suit::*;
        let mut data = table(&[100, 100, 100]);
        put_in(&mut data, 0, 11);
        put_in(&mut data, 1, 10);
        put_in(&mut data, 2, 10);
        data.players[2].fold();
        board(&mut data);
        give(&mut data, 0, Card(3, Spade), Card(5, Club));
        give(&mut data, 1, Card(3, Diamond), Card(5, Heart));
        data.resolve_showdown();
        assert_eq!(data.players[0].chips, 89 + 16);
        assert_eq!(data.players[1].chips, 90 + 15);
    }

    #[test]
    fn test_all_in_player_only_wins_their_layer() {
        use Suit::*;
        let mut data = table(&[25, 100, 100]);
        put_in(&mut data, 0, 25);
        put_in(&mut data, 1, 60);
        put_in(&mut data, 2, 60);
        assert_eq!(data.players[0].status, PlayerStatus::AllIn);
        board(&mut data);
        give(&mut data, 0, Card(11, Club), Card(11, Heart));
        give(&mut data, 1, Card(9, Club), Card(9, Diamond));
        give(&mut data, 2, Card(13, Club), Card(3, Diamond));
        data.resolve_showdown();
        assert_eq!(
            data.side_pots,
            vec![
                SidePot { amount: 75, eligible: vec![1, 2, 3] },
                SidePot { amount: 70, eligible: vec![2, 3] },
            ]
        );
        assert_eq!(data.players[0].chips, 75);
        assert_eq!(data.players[1].chips, 40 + 70);
        assert_eq!(data.players[2].chips, 40);
    }

    #[test]
    fn test_folded_chips_go_to_main_pot() {
        use Suit::*;
        let mut data = table(&[50, 100, 100]);
        put_in(&mut data, 0, 50);
        put_in(&mut data, 1, 50);
        put_in(&mut data, 2, 20);
        data.players[2].fold();
        board(&mut data);
        give(&mut data, 0, Card(14, Club), Card(14, Heart));
        give(&mut data, 1, Card(3, Club), Card(5, Diamond));
        data.resolve_showdown();
        assert_eq!(data.side_pots, vec![SidePot { amount: 100, eligible: vec![1, 2] }]);
        assert_eq!(data.players[0].chips, 120);
        let total: Chips = data.players.iter().map(|p| p.chips).sum();
        assert_eq!(total, 250);
    }

    #[test]
    fn test_results_cover_every_player() {
        use Suit::*;
        let mut data = table(&[100, 100, 100]);
        put_in(&mut data, 0, 10);
        put_in(&mut data, 1, 10);
        data.players[2].fold();
        board(&mut data);
        give(&mut data, 0, Card(14, Club), Card(14, Heart));
        give(&mut data, 1, Card(3, Club), Card(5, Diamond));
        data.resolve_showdown();
        let Some(GameEvent::ShowdownResolved { results, .. }) = data.events.back() else {
            panic!("expected showdown event");
        };
        assert_eq!(results.len(), 3);
        assert!(results[0].is_winner());
        assert!(results[2].folded);
        assert_eq!(results[1].bet_amount, 10);
    }

    // === Refund Tests ===

    #[test]
    fn test_refund_restores_balances() {
        let mut data = table(&[100, 100]);
        put_in(&mut data, 0, 10);
        put_in(&mut data, 1, 30);
        data.pot += 7;
        data.refund_hand();
        assert_eq!(data.players[0].chips, 104);
        assert_eq!(data.players[1].chips, 103);
        assert_eq!(data.pot, 0);
    }
}
