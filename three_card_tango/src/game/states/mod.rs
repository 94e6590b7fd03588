//! Game state definitions for the Three Card Tango FSM.
//!
//! Each state represents one phase of a hand.

use crate::game::entities::Phase;

/// Waiting for at least two players with chips
#[derive(Debug, Default)]
pub struct Waiting {}

/// Collecting the ante from every player
#[derive(Debug, Default)]
pub struct Ante {}

/// Private cards are on the table; pauses until its timer expires
#[derive(Debug, Default)]
pub struct CardDraw {
    pub(crate) expired: bool,
}

/// Every player picks a card to kill
#[derive(Debug, Default)]
pub struct ChooseTrash {}

/// Every player picks a card to kick to the board
#[derive(Debug, Default)]
pub struct ChooseTango {}

/// First betting round, before the kicked cards are revealed
#[derive(Debug, Default)]
pub struct PreKickBetting {}

/// Turn cards are dealt; pauses until its timer expires
#[derive(Debug, Default)]
pub struct TurnDraw {
    pub(crate) expired: bool,
}

/// Second betting round
#[derive(Debug, Default)]
pub struct PostTurnBetting {}

/// Board is revealed; pauses until its timer expires
#[derive(Debug, Default)]
pub struct BoardReveal {
    pub(crate) expired: bool,
}

/// Last betting round
#[derive(Debug, Default)]
pub struct FinalBetting {}

/// Evaluating hands and paying out pots
#[derive(Debug, Default)]
pub struct Showdown {}

/// Results are on display until the next hand
#[derive(Debug, Default)]
pub struct End {
    pub(crate) expired: bool,
}

/// Ties a state type to the phase it represents.
pub trait PhaseMarker {
    const PHASE: Phase;
}

/// States between the ante and the showdown. A hand in one of these
/// phases ends early when it is aborted or only one contender remains.
pub trait HandInProgress: PhaseMarker {}

/// States that only advance once their display timer runs out.
pub trait Pause {
    fn expire(&mut self);

    fn is_expired(&self) -> bool;
}

macro_rules! impl_phase_markers {
    ($($state:ident),+ $(,)?) => {
        $(
            impl PhaseMarker for $state {
                const PHASE: Phase = Phase::$state;
            }
        )+
    };
}

macro_rules! impl_pauses {
    ($($state:ident),+ $(,)?) => {
        $(
            impl Pause for $state {
                fn expire(&mut self) {
                    self.expired = true;
                }

                fn is_expired(&self) -> bool {
                    self.expired
                }
            }
        )+
    };
}

impl_phase_markers!(
    Waiting,
    Ante,
    CardDraw,
    ChooseTrash,
    ChooseTango,
    PreKickBetting,
    TurnDraw,
    PostTurnBetting,
    BoardReveal,
    FinalBetting,
    Showdown,
    End,
);

impl_pauses!(CardDraw, TurnDraw, BoardReveal, End);

impl HandInProgress for Ante {}
impl HandInProgress for CardDraw {}
impl HandInProgress for ChooseTrash {}
impl HandInProgress for ChooseTango {}
impl HandInProgress for PreKickBetting {}
impl HandInProgress for TurnDraw {}
impl HandInProgress for PostTurnBetting {}
impl HandInProgress for BoardReveal {}
impl HandInProgress for FinalBetting {}
