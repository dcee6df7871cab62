//! Selection bookkeeping across tab list edits.
//!
//! Paths are unique within a tab list, so the selected tab can be followed
//! from the old ordering into the new one by path. When the selected tab
//! itself disappears the selection falls back to the same position, clamped
//! to the new bounds.

use super::app_state::TabRecord;

/// Selection for `new` given that `selected` pointed into `old`
pub fn reselect(old: &[TabRecord], new: &[TabRecord], selected: Option<usize>) -> Option<usize> {
    if new.is_empty() {
        return None;
    }
    let index = selected?;
    let Some(tab) = old.get(index) else {
        return Some(index.min(new.len() - 1));
    };
    new.iter()
        .position(|t| t.path() == tab.path())
        .or(Some(index.min(new.len() - 1)))
}

/// Index reached by stepping `offset` from `selected` in a list of `count`
/// tabs, wrapping at both ends. With nothing selected, a forward step lands on
/// the first tab and a backward step on the last.
pub fn relative(selected: Option<usize>, count: usize, offset: isize) -> Option<usize> {
    if count == 0 {
        return None;
    }
    let Some(current) = selected.filter(|&i| i < count) else {
        return Some(if offset < 0 { count - 1 } else { 0 });
    };
    let count = count as isize;
    Some((current as isize + offset).rem_euclid(count) as usize)
}
