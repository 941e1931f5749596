//! Line breaking and alignment fixtures.
//!
//! Each fixture lays the same text out at several widths and checks where
//! every output line ends, then checks full layouts under all three
//! alignments.

use proptest::prelude::*;
use strata_core::{ByteEncoding, EncodingConfig};
use strata_text::{
    Align, Layout, LayoutSegment, StandardTextLayout, TextLayout, WrapMode, line_width,
};

fn utf8() -> StandardTextLayout {
    StandardTextLayout::with_encoding(EncodingConfig::UTF8)
}

fn euc() -> StandardTextLayout {
    StandardTextLayout::with_encoding(EncodingConfig::from_label("euc-jp"))
}

fn shift(n: isize) -> LayoutSegment {
    LayoutSegment::shift(n)
}
fn mark(o: usize) -> LayoutSegment {
    LayoutSegment::marker(o)
}
fn range(w: usize, s: usize, e: usize) -> LayoutSegment {
    LayoutSegment::range(w, s, e)
}

/// The offset each line ends at.
fn line_ends(segs: &Layout) -> Vec<usize> {
    segs.iter()
        .map(|line| match line.last() {
            Some(LayoutSegment::Range { end, .. }) => *end,
            Some(other) => other.offset().unwrap_or_default(),
            None => 0,
        })
        .collect()
}

fn check_breaks(layout: StandardTextLayout, wrap: WrapMode, text: &[u8], cases: &[(usize, &[usize])]) {
    for &(width, expected) in cases {
        let segs = layout
            .calculate_text_segments(text, width, wrap)
            .expect("text is renderable");
        assert_eq!(line_ends(&segs), expected, "width {width}: {segs:?}");
    }
}

fn check_aligned(text: &[u8], wrap: WrapMode, width: usize, left: Layout, center: Layout, right: Layout) {
    let layout = utf8();
    assert_eq!(layout.layout(text, width, Align::Left, wrap), left, "left");
    assert_eq!(layout.layout(text, width, Align::Center, wrap), center, "center");
    assert_eq!(layout.layout(text, width, Align::Right, wrap), right, "right");
}

// =============================================================================
// Break Positions
// =============================================================================

#[test]
fn breaks_any_char() {
    check_breaks(
        utf8(),
        WrapMode::Any,
        b"abfghsdjf askhtrvs\naltjhgsdf ljahtshgf",
        &[
            (100, &[18, 38]),
            (6, &[6, 12, 18, 25, 31, 37, 38]),
            (10, &[10, 18, 29, 38]),
        ],
    );
}

#[test]
fn breaks_any_double_byte() {
    check_breaks(
        euc(),
        WrapMode::Any,
        b"abfgh\xA1\xA1j\xA1\xA1xskhtrvs\naltjhgsdf\xA1\xA1jahtshgf",
        &[
            (10, &[10, 18, 28, 38]),
            (6, &[5, 11, 17, 18, 25, 31, 37, 38]),
            (100, &[18, 38]),
        ],
    );
}

#[test]
fn breaks_space_words() {
    check_breaks(
        utf8(),
        WrapMode::Space,
        b"hello world\nout there. blah",
        &[
            (10, &[5, 11, 22, 27]),
            (5, &[5, 11, 17, 22, 27]),
            (100, &[11, 27]),
        ],
    );
    check_breaks(
        utf8(),
        WrapMode::Space,
        b"A simple set of words, really....",
        &[(10, &[8, 15, 22, 33]), (17, &[15, 33]), (13, &[12, 22, 33])],
    );
}

#[test]
fn breaks_space_double_byte() {
    check_breaks(
        euc(),
        WrapMode::Space,
        b"hel\xA1\xA1 world\nout-\xA1\xA1tre blah",
        &[
            (10, &[5, 11, 21, 26]),
            (5, &[5, 11, 16, 21, 26]),
            (100, &[11, 26]),
        ],
    );
}

#[test]
fn breaks_space_utf8_wide() {
    check_breaks(
        utf8(),
        WrapMode::Space,
        "替洼渎溏潺".as_bytes(),
        &[(4, &[6, 12, 15]), (10, &[15]), (5, &[6, 12, 15])],
    );
}

#[test]
fn narrow_encoding_counts_bytes() {
    let narrow = StandardTextLayout::with_encoding(EncodingConfig::new(ByteEncoding::Narrow));
    let segs = narrow
        .calculate_text_segments("替洼".as_bytes(), 3, WrapMode::Any)
        .expect("renderable");
    assert_eq!(line_ends(&segs), vec![3, 6]);
}

// =============================================================================
// Alignment
// =============================================================================

#[test]
fn translate_any() {
    check_aligned(
        b"It's out of control!\nYou've got to",
        WrapMode::Any,
        15,
        vec![
            vec![range(15, 0, 15)],
            vec![range(5, 15, 20), mark(20)],
            vec![range(13, 21, 34), mark(34)],
        ],
        vec![
            vec![range(15, 0, 15)],
            vec![shift(5), range(5, 15, 20), mark(20)],
            vec![shift(1), range(13, 21, 34), mark(34)],
        ],
        vec![
            vec![range(15, 0, 15)],
            vec![shift(10), range(5, 15, 20), mark(20)],
            vec![shift(2), range(13, 21, 34), mark(34)],
        ],
    );
}

#[test]
fn translate_space() {
    check_aligned(
        b"It's out of control!\nYou've got to ",
        WrapMode::Space,
        14,
        vec![
            vec![range(11, 0, 11), mark(11)],
            vec![range(8, 12, 20), mark(20)],
            vec![range(14, 21, 35), mark(35)],
        ],
        vec![
            vec![shift(2), range(11, 0, 11), mark(11)],
            vec![shift(3), range(8, 12, 20), mark(20)],
            vec![range(14, 21, 35), mark(35)],
        ],
        vec![
            vec![shift(3), range(11, 0, 11), mark(11)],
            vec![shift(6), range(8, 12, 20), mark(20)],
            vec![range(14, 21, 35), mark(35)],
        ],
    );
}

#[test]
fn translate_wide_lines() {
    check_aligned(
        "替洼\n渎溏潺".as_bytes(),
        WrapMode::Space,
        10,
        vec![vec![range(4, 0, 6), mark(6)], vec![range(6, 7, 16), mark(16)]],
        vec![
            vec![shift(3), range(4, 0, 6), mark(6)],
            vec![shift(2), range(6, 7, 16), mark(16)],
        ],
        vec![
            vec![shift(6), range(4, 0, 6), mark(6)],
            vec![shift(4), range(6, 7, 16), mark(16)],
        ],
    );
}

#[test]
fn leading_space_becomes_marker_line() {
    let rest = vec![
        vec![range(3, 1, 4), mark(4)],
        vec![range(3, 5, 8)],
        vec![range(3, 8, 11), mark(11)],
    ];
    let with_first = |first: Vec<LayoutSegment>| {
        let mut lines = vec![first];
        lines.extend(rest.clone());
        lines
    };
    check_aligned(
        b" Die Gedank",
        WrapMode::Space,
        3,
        with_first(vec![mark(0)]),
        with_first(vec![shift(2), mark(0)]),
        with_first(vec![shift(3), mark(0)]),
    );
}

#[test]
fn split_word_reclaims_previous_space() {
    let expected = vec![vec![range(3, 0, 3)], vec![range(3, 3, 6), mark(6)]];
    check_aligned(
        b" Word.",
        WrapMode::Space,
        3,
        expected.clone(),
        expected.clone(),
        expected,
    );
}

#[test]
fn translate_clip() {
    check_aligned(
        b"It's out of control!\nYou've got to\n\nturn it off!!!",
        WrapMode::Clip,
        14,
        vec![
            vec![range(20, 0, 20), mark(20)],
            vec![range(13, 21, 34), mark(34)],
            vec![mark(35)],
            vec![range(14, 36, 50), mark(50)],
        ],
        vec![
            vec![shift(-3), range(20, 0, 20), mark(20)],
            vec![shift(1), range(13, 21, 34), mark(34)],
            vec![shift(7), mark(35)],
            vec![range(14, 36, 50), mark(50)],
        ],
        vec![
            vec![shift(-6), range(20, 0, 20), mark(20)],
            vec![shift(1), range(13, 21, 34), mark(34)],
            vec![shift(14), mark(35)],
            vec![range(14, 36, 50), mark(50)],
        ],
    );
    check_aligned(
        b"Hello!\nto\nWorld!",
        WrapMode::Clip,
        5,
        vec![
            vec![range(6, 0, 6), mark(6)],
            vec![range(2, 7, 9), mark(9)],
            vec![range(6, 10, 16), mark(16)],
        ],
        vec![
            vec![range(6, 0, 6), mark(6)],
            vec![shift(2), range(2, 7, 9), mark(9)],
            vec![range(6, 10, 16), mark(16)],
        ],
        vec![
            vec![shift(-1), range(6, 0, 6), mark(6)],
            vec![shift(3), range(2, 7, 9), mark(9)],
            vec![shift(-1), range(6, 10, 16), mark(16)],
        ],
    );
}

#[test]
fn unrenderable_text_yields_one_empty_line() {
    for align in [Align::Left, Align::Center, Align::Right] {
        assert_eq!(
            utf8().layout("Hello颖".as_bytes(), 1, align, WrapMode::Space),
            vec![Vec::<LayoutSegment>::new()]
        );
    }
}

// =============================================================================
// Properties
// =============================================================================

fn wrap_mode() -> impl Strategy<Value = WrapMode> {
    prop_oneof![
        Just(WrapMode::Any),
        Just(WrapMode::Space),
        Just(WrapMode::Clip),
        Just(WrapMode::Ellipsis),
    ]
}

proptest! {
    #[test]
    fn layout_is_pure(text in "[a-z 替洼\n]{0,40}", width in 2usize..30, wrap in wrap_mode()) {
        let layout = utf8();
        let a = layout.layout(text.as_bytes(), width, Align::Center, wrap);
        let b = layout.layout(text.as_bytes(), width, Align::Center, wrap);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn wrapped_lines_fit_width(text in "[a-z 替洼\n]{0,60}", width in 2usize..30) {
        for wrap in [WrapMode::Any, WrapMode::Space, WrapMode::Ellipsis] {
            for align in [Align::Left, Align::Center, Align::Right] {
                for line in utf8().layout(text.as_bytes(), width, align, wrap) {
                    let total: isize = line.iter().map(LayoutSegment::width).sum();
                    prop_assert!(total <= width as isize, "{line:?}");
                }
            }
        }
    }

    #[test]
    fn right_aligned_lines_fill_width(text in "[a-z ]{1,60}", width in 1usize..30) {
        for line in utf8().layout(text.as_bytes(), width, Align::Right, WrapMode::Space) {
            let total: isize = line.iter().map(LayoutSegment::width).sum();
            prop_assert_eq!(total, width as isize);
        }
    }

    #[test]
    fn pack_never_exceeds_request(text in "[a-z 替\n]{0,40}", width in 2usize..30) {
        let layout = utf8();
        let lines = layout.layout(text.as_bytes(), width, Align::Left, WrapMode::Space);
        let packed = layout.pack(width, &lines);
        prop_assert!(packed <= width);
        prop_assert!(lines.iter().all(|l| line_width(l) <= packed));
    }
}
