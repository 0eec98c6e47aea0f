use jclean_core::{apply_text_edits, normalize_text_edits, EditBatch, TextEdit, TextRange, TextRangeExt};
use proptest::prelude::*;

const PROPTEST_CASES: u32 = 256;

fn arb_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            8 => prop::sample::select(vec!['a', 'b', 'x', ' ', ';', '{', '}']),
            2 => Just('\n'),
            1 => Just('é'),
        ],
        0..48,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

fn char_boundaries(text: &str) -> Vec<usize> {
    let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    boundaries.push(text.len());
    boundaries
}

/// Arbitrary (possibly overlapping) edits on char boundaries.
fn arb_text_and_edits() -> impl Strategy<Value = (String, Vec<TextEdit>)> {
    arb_text().prop_flat_map(|text| {
        let boundaries = char_boundaries(&text);
        let edit = (
            prop::sample::select(boundaries.clone()),
            prop::sample::select(boundaries),
            prop::sample::select(vec!["", "z", "/**", "\n  "]),
        )
            .prop_map(|(a, b, replacement)| {
                TextEdit::replace(TextRange::from_offsets(a.min(b), a.max(b)), replacement)
            });
        (Just(text), prop::collection::vec(edit, 0..6))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(PROPTEST_CASES))]

    #[test]
    fn normalized_edits_never_overlap((text, edits) in arb_text_and_edits()) {
        let mut normalized = edits.clone();
        if normalize_text_edits(&text, &mut normalized).is_ok() {
            for pair in normalized.windows(2) {
                prop_assert!(!pair[0].range.overlaps(pair[1].range));
                prop_assert!(pair[0].range.end() <= pair[1].range.start());
            }
            prop_assert!(apply_text_edits(&text, &edits).is_ok());
        }
    }

    #[test]
    fn batch_groups_keep_the_batch_conflict_free((text, edits) in arb_text_and_edits()) {
        let mut batch = EditBatch::new();
        for edit in edits {
            let before = batch.len();
            if batch.try_extend(vec![edit]).is_err() {
                prop_assert_eq!(batch.len(), before);
            }
        }
        let queued = batch.edits().to_vec();
        for (i, a) in queued.iter().enumerate() {
            for b in &queued[i + 1..] {
                prop_assert!(!a.range.overlaps(b.range));
            }
        }
        prop_assert!(batch.into_edits(&text).is_ok());
    }
}
