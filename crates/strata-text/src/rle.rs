#![forbid(unsafe_code)]

//! Run-length encoded attribute lists.
//!
//! An RLE list is an ordered sequence of `(value, run)` pairs meaning "the
//! next `run` characters carry `value`". Lists built with the `*_modify`
//! helpers stay normalized: no two adjacent runs share a value.
//!
//! The helpers are generic so the same code serves display attributes,
//! charset tags and their products.
//!
//! # Example
//!
//! ```
//! use strata_text::rle::{rle_append_modify, rle_product};
//!
//! let mut attrs = vec![("a", 10)];
//! rle_append_modify(&mut attrs, ("a", 5));
//! assert_eq!(attrs, vec![("a", 15)]);
//!
//! let left = vec![("a", 10), ("b", 5)];
//! let right = vec![("Q", 5), ("P", 10)];
//! assert_eq!(
//!     rle_product(&left, &right),
//!     vec![(("a", "Q"), 5), (("a", "P"), 5), (("b", "P"), 5)]
//! );
//! ```

use crate::width::TextMeasure;

/// An RLE list of values of type `A`.
pub type Rle<A> = Vec<(A, usize)>;

/// The value covering absolute position `pos`, or `None` past the end.
#[must_use]
pub fn rle_get_at<A>(rle: &[(A, usize)], pos: usize) -> Option<&A> {
    let mut x = 0;
    for (a, run) in rle {
        if x + run > pos {
            return Some(a);
        }
        x += run;
    }
    None
}

/// The runs covering positions `start..end`, splitting boundary runs.
#[must_use]
pub fn rle_subseg<A: Clone>(rle: &[(A, usize)], start: usize, end: usize) -> Rle<A> {
    let mut out = Vec::new();
    let mut skip = start;
    let mut x = 0;
    for (a, run) in rle {
        let mut run = *run;
        if skip > 0 {
            if skip >= run {
                skip -= run;
                x += run;
                continue;
            }
            x += skip;
            run -= skip;
            skip = 0;
        }
        if x >= end {
            break;
        }
        if x + run > end {
            run = end - x;
        }
        x += run;
        out.push((a.clone(), run));
    }
    out
}

/// Number of characters covered.
#[inline]
#[must_use]
pub fn rle_len<A>(rle: &[(A, usize)]) -> usize {
    rle.iter().map(|(_, run)| run).sum()
}

/// Insert a run at the front, merging with the first run when equal.
pub fn rle_prepend_modify<A: PartialEq>(rle: &mut Rle<A>, (a, r): (A, usize)) {
    match rle.first_mut() {
        Some((first, run)) if *first == a => *run += r,
        _ => rle.insert(0, (a, r)),
    }
}

/// Append a run, merging with the last run when equal.
pub fn rle_append_modify<A: PartialEq>(rle: &mut Rle<A>, (a, r): (A, usize)) {
    match rle.last_mut() {
        Some((last, run)) if *last == a => *run += r,
        _ => rle.push((a, r)),
    }
}

/// Append every run of `other`, merging across the shared boundary.
pub fn rle_join_modify<A: PartialEq>(rle: &mut Rle<A>, other: Rle<A>) {
    let mut runs = other.into_iter();
    if let Some(first) = runs.next() {
        rle_append_modify(rle, first);
        rle.extend(runs);
    }
}

/// Zip two lists covering the same characters into one list of pairs.
///
/// Run boundaries fall on the union of both inputs' boundaries.
#[must_use]
pub fn rle_product<A, B>(left: &[(A, usize)], right: &[(B, usize)]) -> Rle<(A, B)>
where
    A: Clone + PartialEq,
    B: Clone + PartialEq,
{
    let mut out = Vec::new();
    let (Some(first_l), Some(first_r)) = (left.first(), right.first()) else {
        return out;
    };
    let (mut a1, mut r1) = (first_l.0.clone(), first_l.1);
    let (mut a2, mut r2) = (first_r.0.clone(), first_r.1);
    let mut rest_l = left[1..].iter();
    let mut rest_r = right[1..].iter();

    while r1 > 0 && r2 > 0 {
        let r = r1.min(r2);
        rle_append_modify(&mut out, ((a1.clone(), a2.clone()), r));
        r1 -= r;
        if r1 == 0
            && let Some((a, run)) = rest_l.next()
        {
            a1 = a.clone();
            r1 = *run;
        }
        r2 -= r;
        if r2 == 0
            && let Some((b, run)) = rest_r.next()
        {
            a2 = b.clone();
            r2 = *run;
        }
    }
    out
}

/// Split a product list back into its two components.
#[must_use]
pub fn rle_factor<A, B>(rle: &[((A, B), usize)]) -> (Rle<A>, Rle<B>)
where
    A: Clone + PartialEq,
    B: Clone + PartialEq,
{
    let mut left = Vec::new();
    let mut right = Vec::new();
    for ((a, b), run) in rle {
        rle_append_modify(&mut left, (a.clone(), *run));
        rle_append_modify(&mut right, (b.clone(), *run));
    }
    (left, right)
}

/// Trim one canvas row to the columns `start_col..end_col`.
///
/// Returns the trimmed bytes with matching attribute and charset lists. Half
/// a wide character at either edge becomes a blank column that takes the
/// attribute of the character it replaced and no charset.
#[must_use]
pub fn trim_text_attr_cs<A, C>(
    measure: TextMeasure,
    text: &[u8],
    attr: &[(A, usize)],
    cs: &[(Option<C>, usize)],
    start_col: usize,
    end_col: usize,
) -> (Vec<u8>, Rle<A>, Rle<Option<C>>)
where
    A: Clone + PartialEq + Default,
    C: Clone + PartialEq,
{
    let trim = measure.calc_trim_text(text, 0, text.len(), start_col, end_col);
    let mut attr_tr = rle_subseg(attr, trim.start, trim.end);
    let mut cs_tr = rle_subseg(cs, trim.start, trim.end);
    let mut out = Vec::with_capacity(trim.end - trim.start + trim.pad_left + trim.pad_right);

    if trim.pad_left > 0 {
        let al = trim
            .start
            .checked_sub(1)
            .and_then(|p| rle_get_at(attr, p))
            .cloned()
            .unwrap_or_default();
        rle_prepend_modify(&mut attr_tr, (al, 1));
        rle_prepend_modify(&mut cs_tr, (None, 1));
        out.push(b' ');
    }
    out.extend_from_slice(&text[trim.start..trim.end]);
    if trim.pad_right > 0 {
        let al = rle_get_at(attr, trim.end).cloned().unwrap_or_default();
        rle_append_modify(&mut attr_tr, (al, 1));
        rle_append_modify(&mut cs_tr, (None, 1));
        out.push(b' ');
    }
    (out, attr_tr, cs_tr)
}
