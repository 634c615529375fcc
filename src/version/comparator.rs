//! Digest comparison between the running image and a freshly pulled one

/// Returns true when the pulled image differs from the current one.
///
/// Images are compared by content digest only; tag aliases are irrelevant.
pub fn should_update(current_digest: &str, pulled_digest: &str) -> bool {
    current_digest != pulled_digest
}
