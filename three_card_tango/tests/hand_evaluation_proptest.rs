/// Property-based tests for hand evaluation using proptest
///
/// These tests check the evaluator against invariants that must hold for
/// every set of seven distinct cards, the hand size at a Tango showdown.
use proptest::prelude::*;
use std::collections::BTreeSet;
use three_card_tango::game::{
    entities::{Card, HandCategory, Suit},
    functional::{argmax, best_hand, eval, score_five},
};

// Strategy to generate a valid card (values 2-14, aces high)
fn card_strategy() -> impl Strategy<Value = Card> {
    (2u8..=14, 0u8..=3).prop_map(|(value, suit_idx)| {
        let suit = match suit_idx {
            0 => Suit::Club,
            1 => Suit::Diamond,
            2 => Suit::Heart,
            _ => Suit::Spade,
        };
        Card(value, suit)
    })
}

// Strategy to generate a vec of unique cards (no duplicates)
fn unique_cards_strategy(n: usize) -> impl Strategy<Value = Vec<Card>> {
    prop::collection::vec(card_strategy(), n).prop_filter("Cards must be unique", |cards| {
        let set: BTreeSet<_> = cards.iter().collect();
        set.len() == cards.len()
    })
}

proptest! {
    #[test]
    fn test_best_hand_uses_input_cards(cards in unique_cards_strategy(7)) {
        let best = best_hand(&cards).expect("seven cards always make a hand");
        for card in &best.cards {
            prop_assert!(cards.contains(card));
        }
        prop_assert_eq!(best.strength, score_five(&best.cards));
        prop_assert!(best.strength.category().is_some());
    }

    #[test]
    fn test_eval_ignores_card_order(cards in unique_cards_strategy(7)) {
        let mut reversed = cards.clone();
        reversed.reverse();
        prop_assert_eq!(eval(&cards), eval(&reversed));
    }

    #[test]
    fn test_more_cards_never_weaker(cards in unique_cards_strategy(7)) {
        let five = eval(&cards[..5]).unwrap();
        let six = eval(&cards[..6]).unwrap();
        let seven = eval(&cards).unwrap();
        prop_assert!(five <= six);
        prop_assert!(six <= seven);
    }

    #[test]
    fn test_best_hand_beats_every_subset(cards in unique_cards_strategy(6)) {
        let best = eval(&cards).unwrap();
        for skip in 0..cards.len() {
            let subset: Vec<Card> = cards
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != skip)
                .map(|(_, c)| *c)
                .collect();
            prop_assert!(eval(&subset).unwrap() <= best);
        }
    }

    #[test]
    fn test_same_suit_is_at_least_flush(values in prop::collection::btree_set(2u8..=14, 5)) {
        let cards: Vec<Card> = values.iter().map(|&v| Card(v, Suit::Heart)).collect();
        let category = eval(&cards).and_then(|s| s.category()).unwrap();
        prop_assert!(category >= HandCategory::Flush);
    }

    #[test]
    fn test_argmax_finds_all_winners(hands in prop::collection::vec(unique_cards_strategy(7), 2..=5)) {
        let strengths: Vec<_> = hands.iter().map(|h| eval(h).unwrap()).collect();
        let winners = argmax(&strengths);
        prop_assert!(!winners.is_empty());
        let top = strengths[winners[0]];
        for (i, strength) in strengths.iter().enumerate() {
            if winners.contains(&i) {
                prop_assert_eq!(*strength, top);
            } else {
                prop_assert!(*strength < top);
            }
        }
    }
}

#[test]
fn test_fewer_than_five_cards_has_no_hand() {
    let cards = [Card(14, Suit::Spade), Card(13, Suit::Spade), Card(12, Suit::Spade)];
    assert!(best_hand(&cards).is_none());
    assert!(eval(&cards).is_none());
}
