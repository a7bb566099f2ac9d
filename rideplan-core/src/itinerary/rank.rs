//! Dominance grouping of solver itineraries for display.

use super::Itinerary;

/// Solver itineraries split into dominant and dominated groups.
///
/// Solver order is kept inside each group. Dominated itineraries are hidden
/// until [`reveal_dominated`](Self::reveal_dominated) is called.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedItineraries {
    dominant: Vec<Itinerary>,
    dominated: Vec<Itinerary>,
    revealed: bool,
}

impl RankedItineraries {
    /// Group `itineraries` by their dominance flag.
    #[must_use]
    pub fn rank(itineraries: Vec<Itinerary>) -> Self {
        let (dominated, dominant) = itineraries
            .into_iter()
            .partition(|itinerary| itinerary.is_dominated);
        Self {
            dominant,
            dominated,
            revealed: false,
        }
    }

    /// Itineraries no other one beats.
    #[must_use]
    pub fn dominant(&self) -> &[Itinerary] {
        &self.dominant
    }

    /// Itineraries beaten by at least one other.
    #[must_use]
    pub fn dominated(&self) -> &[Itinerary] {
        &self.dominated
    }

    /// Show dominated itineraries after the dominant ones.
    pub fn reveal_dominated(&mut self) {
        self.revealed = true;
    }

    /// Hide dominated itineraries again.
    pub fn hide_dominated(&mut self) {
        self.revealed = false;
    }

    /// Whether dominated itineraries are shown.
    #[must_use]
    pub const fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Dominant itineraries, then dominated ones when revealed.
    pub fn visible(&self) -> impl Iterator<Item = &Itinerary> {
        let dominated: &[Itinerary] = if self.revealed { &self.dominated } else { &[] };
        self.dominant.iter().chain(dominated)
    }

    /// Number of itineraries currently hidden.
    #[must_use]
    pub fn hidden_count(&self) -> usize {
        if self.revealed { 0 } else { self.dominated.len() }
    }

    /// Total number of itineraries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dominant.len() + self.dominated.len()
    }

    /// Whether the solver found nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dominant.is_empty() && self.dominated.is_empty()
    }
}
