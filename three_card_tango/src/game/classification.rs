//! Dealing private cards and the kill/kick decisions made about them.

use super::constants::{COMMUNITY_CARDS, HOLE_CARDS};
use super::entities::{DecisionKind, Phase, PlayerId};
use super::state_machine::{GameError, GameEvent, TableData};

impl TableData {
    fn contender_indices(&self) -> Vec<usize> {
        self.players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_contender())
            .map(|(idx, _)| idx)
            .collect()
    }

    fn ensure_cards(&self, requested: usize) -> Result<(), GameError> {
        if requested > self.deck.len() {
            return Err(GameError::InsufficientCards {
                requested,
                remaining: self.deck.len(),
            });
        }
        Ok(())
    }

    /// Deal three private cards to every contender in seat order. Nothing is
    /// dealt if the deck can't cover everyone.
    pub(crate) fn deal_hole_cards(&mut self) -> Result<(), GameError> {
        let contenders = self.contender_indices();
        self.ensure_cards(contenders.len() * HOLE_CARDS)?;
        for idx in contenders {
            let cards = self.deck.deal(HOLE_CARDS)?;
            let player = &mut self.players[idx];
            player.cards = cards.clone();
            player.decisions = Default::default();
            let player_id = player.id;
            self.push_event(GameEvent::CardsDealt { player_id, cards });
        }
        Ok(())
    }

    /// Record a kill or kick. `expected` is the only kind the current phase
    /// accepts. A later choice replaces an earlier one.
    pub(crate) fn record_decision(
        &mut self,
        player_id: PlayerId,
        kind: DecisionKind,
        card_idx: usize,
        expected: DecisionKind,
        phase: Phase,
    ) -> Result<(), GameError> {
        if kind != expected {
            return Err(GameError::WrongPhaseForAction { phase });
        }
        let idx = self.player_idx(player_id)?;
        let player = &mut self.players[idx];
        if !player.is_contender() {
            return Err(GameError::NotPlayersTurn);
        }
        let Some(&card) = player.cards.get(card_idx) else {
            return Err(GameError::InvalidCardIndex {
                index: card_idx,
                available: player.cards.len(),
            });
        };
        player.decisions.set(kind, card_idx);
        self.push_event(GameEvent::DecisionMade {
            player_id,
            kind,
            card,
        });
        Ok(())
    }

    #[must_use]
    pub fn all_decided(&self, kind: DecisionKind) -> bool {
        self.players
            .iter()
            .filter(|p| p.is_contender())
            .all(|p| p.decisions.get(kind).is_some())
    }

    /// Undecided contenders get their first card chosen for them.
    pub(crate) fn fill_missing_decisions(&mut self, kind: DecisionKind) {
        let mut chosen = Vec::new();
        for player in &mut self.players {
            if !player.is_contender() || player.decisions.get(kind).is_some() {
                continue;
            }
            if let Some(&card) = player.cards.first() {
                player.decisions.set(kind, 0);
                chosen.push((player.id, card));
            }
        }
        for (player_id, card) in chosen {
            log::debug!("Table {}: player {player_id} timed out, {kind} defaults to {card}", self.table_id);
            self.push_event(GameEvent::DecisionMade {
                player_id,
                kind,
                card,
            });
        }
    }

    /// Discard every contender's killed card.
    pub(crate) fn apply_kills(&mut self) {
        for player in self.players.iter_mut().filter(|p| p.is_contender()) {
            if let Some(idx) = player.decisions.kill.filter(|&idx| idx < player.cards.len()) {
                player.cards.remove(idx);
            }
        }
    }

    /// Move every contender's kicked card out of their hand. It becomes
    /// their tango card and goes to the board at the reveal.
    pub(crate) fn apply_kicks(&mut self) {
        for player in self.players.iter_mut().filter(|p| p.is_contender()) {
            if let Some(idx) = player.decisions.kick.filter(|&idx| idx < player.cards.len()) {
                player.tango_card = Some(player.cards.remove(idx));
            }
        }
    }

    /// One more private card for every contender, in seat order.
    pub(crate) fn deal_turn_cards(&mut self) -> Result<(), GameError> {
        let contenders = self.contender_indices();
        self.ensure_cards(contenders.len())?;
        for idx in contenders {
            let card = self.deck.deal_card()?;
            let player = &mut self.players[idx];
            player.turn_card = Some(card);
            let player_id = player.id;
            self.push_event(GameEvent::TurnCardDealt { player_id, card });
        }
        Ok(())
    }

    /// Build the board from the contenders' tango cards in seat order. The
    /// dealer tops it up to five from the deck.
    pub(crate) fn reveal_board(&mut self) -> Result<(), GameError> {
        let mut community: Vec<_> = self
            .players
            .iter()
            .filter(|p| p.is_contender())
            .filter_map(|p| p.tango_card)
            .take(COMMUNITY_CARDS)
            .collect();
        let shortfall = COMMUNITY_CARDS - community.len();
        let dealer = self.deck.deal(shortfall)?;
        community.extend_from_slice(&dealer);
        self.community_cards = community.clone();
        self.dealer_cards = dealer.clone();
        self.push_event(GameEvent::BoardRevealed { community, dealer });
        Ok(())
    }
}
