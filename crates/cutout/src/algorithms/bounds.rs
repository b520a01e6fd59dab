use crate::{
    error::{CutoutError, Result},
    types::{BoundingBox, Coord},
};

/// Smallest inclusive rectangle enclosing every coordinate
pub fn reduce_bounds<'a, I>(coords: I) -> Result<BoundingBox>
where
    I: IntoIterator<Item = &'a Coord>,
{
    let mut coords = coords.into_iter();
    let &(x, y) = coords.next().ok_or(CutoutError::EmptyRegion)?;
    let seed = BoundingBox {
        min_x: x,
        min_y: y,
        max_x: x,
        max_y: y,
    };

    Ok(coords.fold(seed, |bounds, &(x, y)| BoundingBox {
        min_x: bounds.min_x.min(x),
        min_y: bounds.min_y.min(y),
        max_x: bounds.max_x.max(x),
        max_y: bounds.max_y.max(y),
    }))
}
