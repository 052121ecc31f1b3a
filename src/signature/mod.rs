/// Signature capture
///
/// - `pad.rs`: the raster surface and its PNG export
///
/// The iced canvas that feeds pointer events into the pad lives in
/// `ui::signature`.

pub mod pad;

pub use pad::{Position, Segment, SignaturePad};

/// Submit is allowed only with a non-blank name and at least one stroke.
pub fn can_submit(signer_name: &str, has_content: bool) -> bool {
    has_content && !signer_name.trim().is_empty()
}
