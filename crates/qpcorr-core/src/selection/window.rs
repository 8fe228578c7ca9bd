use crate::domain::{LatticeElement, Side};

#[derive(Debug, Clone, Copy)]
pub(super) struct WindowCandidate<'a> {
    pub(super) element: &'a LatticeElement,
    /// Signed distance from the IP in quadrupoles: -1 is the nearest on the
    /// left, +1 the nearest on the right.
    pub(super) offset: isize,
}

/// Index of the first quadrupole located strictly after `ip_row`, wrapping to 0
/// when the IP sits after the last quadrupole.
pub(super) fn first_after(quadrupoles: &[LatticeElement], ip_row: usize) -> usize {
    let index = quadrupoles.partition_point(|quadrupole| quadrupole.row <= ip_row);
    if index == quadrupoles.len() { 0 } else { index }
}

/// The `window` quadrupoles on one side of the IP, nearest first. The ring is
/// closed, so indices wrap modulo the quadrupole count. A window never spans
/// more than one lap.
pub(super) fn side_window<'a>(
    quadrupoles: &'a [LatticeElement],
    ip_row: usize,
    side: Side,
    window: usize,
) -> Vec<WindowCandidate<'a>> {
    let count = quadrupoles.len() as isize;
    if count == 0 {
        return Vec::new();
    }

    let span = window.min(quadrupoles.len()) as isize;
    let start = first_after(quadrupoles, ip_row) as isize;
    (0..span)
        .map(|step| {
            let (index, offset) = match side {
                Side::Right => (start + step, step + 1),
                Side::Left => (start - 1 - step, -(step + 1)),
            };
            WindowCandidate {
                element: &quadrupoles[index.rem_euclid(count) as usize],
                offset,
            }
        })
        .collect()
}
