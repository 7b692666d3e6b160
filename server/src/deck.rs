//! Card set construction and shuffling

use rand::Rng;
use shared::{Card, Rank, Suit};

/// Builds the 52 distinct cards, grouped by suit.
pub fn standard_deck() -> Vec<Card> {
    Suit::ALL
        .iter()
        .flat_map(|&suit| Rank::ALL.iter().map(move |&rank| Card::new(rank, suit)))
        .collect()
}

/// Unbiased in-place Fisher-Yates shuffle, walking from the tail to the head.
pub fn shuffle<R: Rng + ?Sized>(cards: &mut [Card], rng: &mut R) {
    for i in (1..cards.len()).rev() {
        let j = rng.gen_range(0..=i);
        cards.swap(i, j);
    }
}

pub fn shuffled_deck<R: Rng + ?Sized>(rng: &mut R) -> Vec<Card> {
    let mut deck = standard_deck();
    shuffle(&mut deck, rng);
    deck
}
