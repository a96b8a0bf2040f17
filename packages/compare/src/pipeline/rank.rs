use crate::types::listing::{NormalizedResult, RawListing};

/// Drop unavailable listings, order by total cost, normalize.
///
/// The sort is stable, so listings with equal totals keep scrape order.
pub fn rank_listings(listings: Vec<RawListing>) -> Vec<NormalizedResult> {
    let mut kept: Vec<RawListing> = listings.into_iter().filter(|l| l.available).collect();
    kept.sort_by_key(RawListing::total_cost);
    kept.into_iter().map(RawListing::normalize).collect()
}
