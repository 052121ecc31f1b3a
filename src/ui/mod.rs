/// User interface pieces
///
/// - `gallery.rs`: the photo grid, grouped by workflow phase
/// - `signature.rs`: the canvas that feeds the signature pad

pub mod gallery;
pub mod signature;
