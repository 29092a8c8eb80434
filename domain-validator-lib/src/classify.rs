//! Parked-page detection.

/// Phrases that mark a registrar parking or "for sale" placeholder page.
pub const PARKED_MARKERS: &[&str] = &["domain for sale", "buy this domain"];

/// Whether a fetched page looks like a parked domain offered for sale.
///
/// Case-insensitive substring match against [`PARKED_MARKERS`]. An empty body
/// is never parked.
pub fn is_domain_for_sale(body: &str) -> bool {
    let body = body.to_lowercase();
    PARKED_MARKERS.iter().any(|marker| body.contains(marker))
}
