use nalgebra::DMatrix;

pub type Real = f64;

/// Dynamically sized dense matrix used for all realizations and bases.
pub type Mat = DMatrix<Real>;

/// Block-diagonal composition `blkdiag(blocks[0], blocks[1], ...)`.
pub fn block_diag(blocks: &[&Mat]) -> Mat {
    let rows = blocks.iter().map(|b| b.nrows()).sum();
    let cols = blocks.iter().map(|b| b.ncols()).sum();
    let mut out = Mat::zeros(rows, cols);

    let (mut r0, mut c0) = (0, 0);
    for block in blocks {
        out.view_mut((r0, c0), (block.nrows(), block.ncols()))
            .copy_from(*block);
        r0 += block.nrows();
        c0 += block.ncols();
    }
    out
}

/// Horizontal concatenation `[left, right]`. Row counts must agree.
pub(crate) fn hstack(left: &Mat, right: &Mat) -> Mat {
    debug_assert_eq!(left.nrows(), right.nrows());
    let mut out = Mat::zeros(left.nrows(), left.ncols() + right.ncols());
    out.view_mut((0, 0), left.shape()).copy_from(left);
    out.view_mut((0, left.ncols()), right.shape())
        .copy_from(right);
    out
}

/// Vertical concatenation `[top; bottom]`. Column counts must agree.
pub(crate) fn vstack(top: &Mat, bottom: &Mat) -> Mat {
    debug_assert_eq!(top.ncols(), bottom.ncols());
    let mut out = Mat::zeros(top.nrows() + bottom.nrows(), top.ncols());
    out.view_mut((0, 0), top.shape()).copy_from(top);
    out.view_mut((top.nrows(), 0), bottom.shape())
        .copy_from(bottom);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_diag_places_blocks_on_diagonal() {
        let a = Mat::from_element(2, 3, 1.0);
        let b = Mat::identity(2, 2);
        let m = block_diag(&[&a, &b]);

        assert_eq!(m.shape(), (4, 5));
        assert_eq!(m[(1, 2)], 1.0);
        assert_eq!(m[(2, 3)], 1.0);
        assert_eq!(m[(3, 4)], 1.0);
        assert_eq!(m[(0, 3)], 0.0);
        assert_eq!(m[(2, 0)], 0.0);
    }

    #[test]
    fn stacking_preserves_blocks() {
        let a = Mat::from_element(2, 1, 3.0);
        let b = Mat::from_element(2, 2, 4.0);
        let h = hstack(&a, &b);
        assert_eq!(h.shape(), (2, 3));
        assert_eq!(h[(1, 0)], 3.0);
        assert_eq!(h[(1, 2)], 4.0);

        let v = vstack(&b, &Mat::zeros(1, 2));
        assert_eq!(v.shape(), (3, 2));
        assert_eq!(v[(1, 1)], 4.0);
        assert_eq!(v[(2, 1)], 0.0);
    }
}
