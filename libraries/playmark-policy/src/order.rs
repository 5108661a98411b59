//! Session track order
//!
//! Base order is `[anchor, primary, filler]`. One uniform draw decides
//! whether it is kept (most of the time) or perturbed by swapping one
//! adjacent pair.

use crate::config::TrackOrderWeights;
use crate::error::Result;
use playmark_core::{CatalogError, TrackCatalog, TrackRef};
use rand::seq::SliceRandom;
use rand::Rng;

/// Outcome of the order draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderPerturbation {
    /// Keep the base order
    Keep,
    /// Swap positions 0 and 1
    SwapFirstPair,
    /// Swap positions 1 and 2
    SwapSecondPair,
}

impl OrderPerturbation {
    /// Map a uniform draw `u` in [0, 1) onto the weight partition
    ///
    /// `[0, keep)` keeps, `[keep, keep + swap_first_pair)` swaps 0/1, the
    /// remaining tail swaps 1/2.
    pub fn from_draw(u: f64, weights: &TrackOrderWeights) -> Self {
        if u < weights.keep {
            Self::Keep
        } else if u < weights.keep + weights.swap_first_pair {
            Self::SwapFirstPair
        } else {
            Self::SwapSecondPair
        }
    }

    /// Apply to a three-track order in place
    pub fn apply(self, tracks: &mut [TrackRef]) {
        match self {
            Self::Keep => {}
            Self::SwapFirstPair => tracks.swap(0, 1),
            Self::SwapSecondPair => tracks.swap(1, 2),
        }
    }
}

/// Pick a filler uniformly from the pool
pub fn choose_filler<'a, R: Rng + ?Sized>(
    catalog: &'a TrackCatalog,
    rng: &mut R,
) -> Result<&'a TrackRef> {
    catalog
        .fillers
        .choose(rng)
        .ok_or_else(|| CatalogError::EmptyFillerPool.into())
}

/// Build the session order: base order, random filler, optional swap
pub fn order_tracks<R: Rng + ?Sized>(
    catalog: &TrackCatalog,
    weights: &TrackOrderWeights,
    rng: &mut R,
) -> Result<Vec<TrackRef>> {
    let filler = choose_filler(catalog, rng)?;
    let mut order = vec![catalog.anchor.clone(), catalog.primary.clone(), filler.clone()];

    let perturbation = OrderPerturbation::from_draw(rng.gen::<f64>(), weights);
    perturbation.apply(&mut order);

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use playmark_core::TrackRole;
    use std::collections::HashSet;

    fn weights() -> TrackOrderWeights {
        TrackOrderWeights {
            keep: 0.9,
            swap_first_pair: 0.05,
            swap_second_pair: 0.05,
        }
    }

    fn catalog() -> TrackCatalog {
        TrackCatalog::new(
            TrackRef::new(TrackRole::Anchor, "anchor", "Anchor"),
            TrackRef::new(TrackRole::Primary, "primary", "Primary"),
            vec![
                TrackRef::new(TrackRole::Filler, "f1", "Filler 1"),
                TrackRef::new(TrackRole::Filler, "f2", "Filler 2"),
                TrackRef::new(TrackRole::Filler, "f3", "Filler 3"),
            ],
        )
    }

    fn roles(order: &[TrackRef]) -> Vec<TrackRole> {
        order.iter().map(|t| t.role).collect()
    }

    #[test]
    fn draw_partition_boundaries() {
        let w = weights();
        assert_eq!(OrderPerturbation::from_draw(0.0, &w), OrderPerturbation::Keep);
        assert_eq!(OrderPerturbation::from_draw(0.8999, &w), OrderPerturbation::Keep);
        assert_eq!(
            OrderPerturbation::from_draw(0.9, &w),
            OrderPerturbation::SwapFirstPair
        );
        assert_eq!(
            OrderPerturbation::from_draw(0.9499, &w),
            OrderPerturbation::SwapFirstPair
        );
        assert_eq!(
            OrderPerturbation::from_draw(0.95, &w),
            OrderPerturbation::SwapSecondPair
        );
        assert_eq!(
            OrderPerturbation::from_draw(0.9999, &w),
            OrderPerturbation::SwapSecondPair
        );
    }

    #[test]
    fn swaps_move_the_right_pair() {
        let base = vec![
            TrackRef::new(TrackRole::Anchor, "a", "A"),
            TrackRef::new(TrackRole::Primary, "p", "P"),
            TrackRef::new(TrackRole::Filler, "f", "F"),
        ];

        let mut order = base.clone();
        OrderPerturbation::Keep.apply(&mut order);
        assert_eq!(
            roles(&order),
            vec![TrackRole::Anchor, TrackRole::Primary, TrackRole::Filler]
        );

        let mut order = base.clone();
        OrderPerturbation::SwapFirstPair.apply(&mut order);
        assert_eq!(
            roles(&order),
            vec![TrackRole::Primary, TrackRole::Anchor, TrackRole::Filler]
        );

        let mut order = base;
        OrderPerturbation::SwapSecondPair.apply(&mut order);
        assert_eq!(
            roles(&order),
            vec![TrackRole::Anchor, TrackRole::Filler, TrackRole::Primary]
        );
    }

    #[test]
    fn order_contains_each_role_once() {
        let catalog = catalog();
        let mut rng = rand::thread_rng();

        for _ in 0..200 {
            let order = order_tracks(&catalog, &weights(), &mut rng).unwrap();
            assert_eq!(order.len(), 3);
            let unique: HashSet<TrackRole> = order.iter().map(|t| t.role).collect();
            assert_eq!(unique.len(), 3);
        }
    }

    #[test]
    fn keep_only_weights_never_perturb() {
        let catalog = catalog();
        let w = TrackOrderWeights {
            keep: 1.0,
            swap_first_pair: 0.0,
            swap_second_pair: 0.0,
        };
        let mut rng = rand::thread_rng();

        for _ in 0..100 {
            let order = order_tracks(&catalog, &w, &mut rng).unwrap();
            assert_eq!(
                roles(&order),
                vec![TrackRole::Anchor, TrackRole::Primary, TrackRole::Filler]
            );
        }
    }

    #[test]
    fn every_filler_gets_picked_eventually() {
        let catalog = catalog();
        let mut rng = rand::thread_rng();
        let mut seen = HashSet::new();

        for _ in 0..500 {
            seen.insert(choose_filler(&catalog, &mut rng).unwrap().uri.clone());
        }

        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn empty_pool_is_an_error() {
        let mut catalog = catalog();
        catalog.fillers.clear();
        let mut rng = rand::thread_rng();
        assert!(order_tracks(&catalog, &weights(), &mut rng).is_err());
    }
}
