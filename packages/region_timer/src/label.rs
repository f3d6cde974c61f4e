use std::borrow::Cow;

/// Identifies a region. All regions with the same label share one set of statistics.
///
/// Typically labels are `&'static str` but for rare cases when the exact label is only
/// known at runtime, an owned `String` can be used.
pub type Label = Cow<'static, str>;

/// Recorded in place of an empty label so that start/stop pairing stays intact.
pub const UNLABELED: &str = "(unlabeled)";

/// Replaces an empty label with [`UNLABELED`].
///
/// Returns whether the replacement happened, so the caller can report the misuse.
pub(crate) fn normalize(label: Label) -> (Label, bool) {
    if label.is_empty() {
        (Cow::Borrowed(UNLABELED), true)
    } else {
        (label, false)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn keeps_non_empty_label() {
        let (label, replaced) = normalize("forward".into());

        assert_eq!(label, "forward");
        assert!(!replaced);
    }

    #[test]
    fn replaces_empty_label() {
        let (label, replaced) = normalize(String::new().into());

        assert_eq!(label, UNLABELED);
        assert!(replaced);
    }
}
