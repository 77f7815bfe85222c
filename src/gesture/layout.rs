/// Geometry of one rendered row along the scroll axis, in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemBounds {
    pub index: usize,
    pub offset: f32,
    pub size: f32,
}

impl ItemBounds {
    pub fn end(&self) -> f32 {
        self.offset + self.size
    }

    pub fn center(&self) -> f32 {
        self.offset + self.size / 2.0
    }

    pub fn contains(&self, position: f32) -> bool {
        position >= self.offset && position <= self.end()
    }
}

/// What the scroll-position provider reports: the visible window and the
/// rows currently laid out inside it, ordered by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Viewport {
    pub start: f32,
    pub end: f32,
    pub items: Vec<ItemBounds>,
    /// Length of the underlying list, visible or not
    pub total_items: usize,
}

impl Viewport {
    /// Lay out `count` rows of equal height scrolled by `scroll`, keeping the
    /// ones that intersect `[0, height]`.
    pub fn uniform(count: usize, row_height: f32, height: f32, scroll: f32) -> Self {
        let items = (0..count)
            .map(|index| ItemBounds {
                index,
                offset: index as f32 * row_height - scroll,
                size: row_height,
            })
            .filter(|b| b.end() > 0.0 && b.offset < height)
            .collect();
        Viewport {
            start: 0.0,
            end: height,
            items,
            total_items: count,
        }
    }

    /// Row under a pointer position, if any
    pub fn item_at(&self, position: f32) -> Option<&ItemBounds> {
        self.items.iter().find(|b| b.contains(position))
    }

    pub fn bounds(&self, index: usize) -> Option<&ItemBounds> {
        self.items.iter().find(|b| b.index == index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_layout_clips_to_viewport() {
        let vp = Viewport::uniform(10, 100.0, 350.0, 0.0);
        assert_eq!(vp.items.len(), 4);
        assert_eq!(vp.total_items, 10);
        assert_eq!(vp.bounds(3).unwrap().offset, 300.0);
        assert!(vp.bounds(4).is_none());
    }

    #[test]
    fn scrolled_layout_shifts_offsets() {
        let vp = Viewport::uniform(10, 100.0, 300.0, 150.0);
        assert_eq!(vp.items.first().unwrap().index, 1);
        assert_eq!(vp.bounds(1).unwrap().offset, -50.0);
        assert_eq!(vp.item_at(10.0).unwrap().index, 1);
    }

    #[test]
    fn item_at_outside_rows_is_none() {
        let vp = Viewport::uniform(2, 100.0, 500.0, 0.0);
        assert!(vp.item_at(250.0).is_none());
        assert!(vp.item_at(-1.0).is_none());
    }
}
