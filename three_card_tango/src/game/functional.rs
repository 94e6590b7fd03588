//! Pure helpers: hand evaluation and pot arithmetic.

use std::cmp::Reverse;

use super::entities::{Card, Chips, HandCategory, HandStrength, PlayerId, SidePot, Value};

/// Base for packing tiebreak values. Card values never exceed 14.
const TIEBREAK_BASE: u32 = 15;

/// The strongest five-card hand found in a larger set of cards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RankedHand {
    pub strength: HandStrength,
    pub cards: [Card; 5],
}

/// Score every 5-card subset of `cards` and return the best one.
/// Returns `None` when fewer than five cards are given.
#[must_use]
pub fn best_hand(cards: &[Card]) -> Option<RankedHand> {
    let n = cards.len();
    if n < 5 {
        return None;
    }
    let mut best: Option<RankedHand> = None;
    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                for l in (k + 1)..n {
                    for m in (l + 1)..n {
                        let five = [cards[i], cards[j], cards[k], cards[l], cards[m]];
                        let strength = score_five(&five);
                        if best.as_ref().is_none_or(|b| strength > b.strength) {
                            best = Some(RankedHand {
                                strength,
                                cards: five,
                            });
                        }
                    }
                }
            }
        }
    }
    best
}

/// Strength of the best hand within `cards`.
#[must_use]
pub fn eval(cards: &[Card]) -> Option<HandStrength> {
    best_hand(cards).map(|hand| hand.strength)
}

/// Score exactly five cards.
#[must_use]
pub fn score_five(cards: &[Card; 5]) -> HandStrength {
    let mut values: Vec<Value> = cards.iter().map(|c| c.0).collect();
    values.sort_unstable_by_key(|v| Reverse(*v));

    let is_flush = cards.iter().all(|c| c.1 == cards[0].1);
    let straight_high = straight_high(&values);

    // (count, value) groups, biggest group first, then highest value.
    let mut groups: Vec<(u8, Value)> = Vec::with_capacity(5);
    for &value in &values {
        match groups.iter_mut().find(|(_, v)| *v == value) {
            Some((count, _)) => *count += 1,
            None => groups.push((1, value)),
        }
    }
    groups.sort_unstable_by_key(|&(count, value)| Reverse((count, value)));
    let ranked: Vec<Value> = groups.iter().map(|&(_, value)| value).collect();

    let (category, tiebreak) = match (straight_high, is_flush, groups[0].0, groups.get(1)) {
        (Some(14), true, _, _) => (HandCategory::RoyalFlush, vec![14]),
        (Some(high), true, _, _) => (HandCategory::StraightFlush, vec![high]),
        (_, _, 4, _) => (HandCategory::FourOfAKind, ranked),
        (_, _, 3, Some((2, _))) => (HandCategory::FullHouse, ranked),
        (_, true, _, _) => (HandCategory::Flush, values),
        (Some(high), false, _, _) => (HandCategory::Straight, vec![high]),
        (_, _, 3, _) => (HandCategory::ThreeOfAKind, ranked),
        (_, _, 2, Some((2, _))) => (HandCategory::TwoPair, ranked),
        (_, _, 2, _) => (HandCategory::OnePair, ranked),
        _ => (HandCategory::HighCard, values),
    };

    HandStrength(category.weight() * HandStrength::CATEGORY_SCALE + pack_tiebreak(&tiebreak))
}

/// High card of a straight made by five values sorted high to low.
/// The wheel (A-2-3-4-5) plays as a five-high straight.
fn straight_high(sorted_desc: &[Value]) -> Option<Value> {
    let distinct = sorted_desc.windows(2).all(|w| w[0] != w[1]);
    if !distinct || sorted_desc.len() != 5 {
        return None;
    }
    if sorted_desc[0] - sorted_desc[4] == 4 {
        Some(sorted_desc[0])
    } else if sorted_desc == [14, 5, 4, 3, 2] {
        Some(5)
    } else {
        None
    }
}

fn pack_tiebreak(values: &[Value]) -> u32 {
    values
        .iter()
        .take(5)
        .enumerate()
        .map(|(i, &v)| u32::from(v) * TIEBREAK_BASE.pow(4 - i as u32))
        .sum()
}

/// Indices of every entry holding the maximum value.
#[must_use]
pub fn argmax<T: Ord>(values: &[T]) -> Vec<usize> {
    let Some(max) = values.iter().max() else {
        return Vec::new();
    };
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| *v == max)
        .map(|(i, _)| i)
        .collect()
}

/// Layer contributions into pots. Each pot is the smallest remaining
/// contribution times the number of players still contributing, and is
/// winnable by exactly those players. Contributions must be in seat order.
#[must_use]
pub fn compute_side_pots(contributions: &[(PlayerId, Chips)]) -> Vec<SidePot> {
    let mut remaining: Vec<(PlayerId, Chips)> = contributions
        .iter()
        .copied()
        .filter(|&(_, amount)| amount > 0)
        .collect();
    let mut pots = Vec::new();
    while let Some(layer) = remaining.iter().map(|&(_, amount)| amount).min() {
        pots.push(SidePot {
            amount: layer * remaining.len() as Chips,
            eligible: remaining.iter().map(|&(id, _)| id).collect(),
        });
        for (_, amount) in &mut remaining {
            *amount -= layer;
        }
        remaining.retain(|&(_, amount)| amount > 0);
    }
    pots
}

/// Divide `amount` evenly between `winners` (in seat order). The odd chips
/// go to the earliest seat.
#[must_use]
pub fn split_pot(amount: Chips, winners: &[PlayerId]) -> Vec<(PlayerId, Chips)> {
    if winners.is_empty() {
        return Vec::new();
    }
    let share = amount / winners.len() as Chips;
    let remainder = amount % winners.len() as Chips;
    winners
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, if i == 0 { share + remainder } else { share }))
        .collect()
}
