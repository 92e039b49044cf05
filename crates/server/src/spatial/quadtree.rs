//! QuadTree for spatial indexing.
//!
//! A subdividing region quadtree over a bounded square. Rooms rebuild
//! it from the live entity set before every simulation batch, so the
//! tree supports insert and range query only — no removal.

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Create bounds from center and half-extent.
    #[inline]
    pub fn from_center(cx: f32, cy: f32, half: f32) -> Self {
        Self {
            min_x: cx - half,
            min_y: cy - half,
            max_x: cx + half,
            max_y: cy + half,
        }
    }

    /// Check if two bounds intersect.
    #[inline]
    pub fn intersects(&self, other: &Bounds) -> bool {
        !(other.min_x >= self.max_x
            || other.max_x <= self.min_x
            || other.min_y >= self.max_y
            || other.max_y <= self.min_y)
    }

    /// Check if `other` lies fully inside these bounds.
    #[inline]
    pub fn contains(&self, other: &Bounds) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    #[inline]
    pub fn center_x(&self) -> f32 {
        (self.min_x + self.max_x) / 2.0
    }

    #[inline]
    pub fn center_y(&self) -> f32 {
        (self.min_y + self.max_y) / 2.0
    }
}

/// Which room entity set a collidable item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollidableKind {
    Player,
    Gem,
    Trap,
}

/// A point-like object with a bounding radius, stored in the tree.
/// `kind` + `id` identify the entity in its owning room.
#[derive(Debug, Clone, Copy)]
pub struct Collidable {
    pub kind: CollidableKind,
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// Bounding box (cached).
    pub bound: Bounds,
}

impl Collidable {
    #[inline]
    pub fn new(kind: CollidableKind, id: u32, x: f32, y: f32, radius: f32) -> Self {
        Self {
            kind,
            id,
            x,
            y,
            radius,
            bound: Bounds::from_center(x, y, radius),
        }
    }
}

/// QuadTree over a bounded square region.
///
/// A node keeps its objects in place until the count exceeds
/// `max_objects`; it then splits into four equal quadrants (created
/// lazily, never merged) and pushes down every object that fits
/// wholly inside one child. Objects straddling a split line stay at
/// the node. Below `max_levels` no further subdivision happens and
/// objects simply accumulate.
#[derive(Debug)]
pub struct QuadTree {
    root: Node,
    max_objects: usize,
    max_levels: u32,
    len: usize,
}

#[derive(Debug)]
struct Node {
    bounds: Bounds,
    level: u32,
    objects: Vec<Collidable>,
    children: Option<Box<[Node; 4]>>,
}

impl QuadTree {
    /// Create a new tree covering `bounds`.
    pub fn new(bounds: Bounds, max_objects: usize, max_levels: u32) -> Self {
        Self {
            root: Node {
                bounds,
                level: 0,
                objects: Vec::new(),
                children: None,
            },
            max_objects,
            max_levels,
            len: 0,
        }
    }

    /// Insert an object into the smallest region that fully contains
    /// it. Objects outside the root region are kept at the root so a
    /// clamped boundary position is never lost.
    pub fn insert(&mut self, item: Collidable) {
        self.root.insert(item, self.max_objects, self.max_levels);
        self.len += 1;
    }

    /// Collect every object whose node could overlap `region`. The
    /// result is a superset: callers re-check exact circle overlap.
    pub fn query(&self, region: &Bounds) -> Vec<Collidable> {
        let mut out = Vec::new();
        self.root.query(region, &mut out);
        out
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.root.objects.clear();
        self.root.children = None;
        self.len = 0;
    }
}

impl Node {
    fn insert(&mut self, item: Collidable, max_objects: usize, max_levels: u32) {
        if let Some(children) = self.children.as_mut() {
            for child in children.iter_mut() {
                if child.bounds.contains(&item.bound) {
                    child.insert(item, max_objects, max_levels);
                    return;
                }
            }
            self.objects.push(item);
            return;
        }

        self.objects.push(item);

        if self.objects.len() > max_objects && self.level < max_levels {
            self.subdivide(max_objects, max_levels);
        }
    }

    fn subdivide(&mut self, max_objects: usize, max_levels: u32) {
        let cx = self.bounds.center_x();
        let cy = self.bounds.center_y();
        let b = self.bounds;
        let level = self.level + 1;
        let quadrant = |bounds: Bounds| Node {
            bounds,
            level,
            objects: Vec::new(),
            children: None,
        };

        let mut children = Box::new([
            quadrant(Bounds::new(b.min_x, b.min_y, cx, cy)),
            quadrant(Bounds::new(cx, b.min_y, b.max_x, cy)),
            quadrant(Bounds::new(b.min_x, cy, cx, b.max_y)),
            quadrant(Bounds::new(cx, cy, b.max_x, b.max_y)),
        ]);

        let mut kept = Vec::new();
        for item in self.objects.drain(..) {
            let target = children
                .iter_mut()
                .find(|child| child.bounds.contains(&item.bound));
            match target {
                Some(child) => child.insert(item, max_objects, max_levels),
                None => kept.push(item),
            }
        }
        self.objects = kept;
        self.children = Some(children);
    }

    fn query(&self, region: &Bounds, out: &mut Vec<Collidable>) {
        for item in &self.objects {
            if item.bound.intersects(region) {
                out.push(*item);
            }
        }
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                if child.bounds.intersects(region) {
                    child.query(region, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn world() -> Bounds {
        Bounds::new(-100.0, -100.0, 100.0, 100.0)
    }

    fn gem(id: u32, x: f32, y: f32) -> Collidable {
        Collidable::new(CollidableKind::Gem, id, x, y, 2.0)
    }

    #[test]
    fn test_bounds_intersects_and_contains() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let b = Bounds::new(5.0, 5.0, 15.0, 15.0);
        let c = Bounds::new(20.0, 20.0, 30.0, 30.0);
        let inner = Bounds::new(2.0, 2.0, 8.0, 8.0);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
        assert!(a.contains(&inner));
        assert!(!a.contains(&b));
    }

    #[test]
    fn test_insert_query_near_and_far() {
        let mut tree = QuadTree::new(world(), 4, 5);
        tree.insert(gem(1, 0.0, 0.0));
        tree.insert(gem(2, 50.0, 50.0));
        tree.insert(gem(3, -50.0, -50.0));
        assert_eq!(tree.len(), 3);

        let near_origin = tree.query(&Bounds::from_center(0.0, 0.0, 10.0));
        let ids: Vec<u32> = near_origin.iter().map(|c| c.id).collect();
        assert!(ids.contains(&1));
        assert!(!ids.contains(&2));
        assert!(!ids.contains(&3));
    }

    #[test]
    fn test_subdivision_keeps_straddling_objects_at_parent() {
        let mut tree = QuadTree::new(world(), 2, 5);
        // Sits on the root split lines; can never be pushed into a child.
        tree.insert(Collidable::new(CollidableKind::Trap, 99, 0.0, 0.0, 5.0));
        for i in 0..8 {
            tree.insert(gem(i, 60.0 + (i as f32), 60.0));
        }
        assert_eq!(tree.len(), 9);

        let all = tree.query(&world());
        assert_eq!(all.len(), 9);
        assert!(all.iter().any(|c| c.id == 99));
    }

    #[test]
    fn test_depth_bound_accumulates_without_splitting() {
        let mut tree = QuadTree::new(world(), 1, 2);
        // All in one corner: depth would explode without the level cap.
        for i in 0..64 {
            tree.insert(gem(i, -99.0 + (i as f32) * 0.01, -99.0));
        }
        let found = tree.query(&Bounds::from_center(-99.0, -99.0, 3.0));
        assert_eq!(found.len(), 64);
    }

    #[test]
    fn test_query_soundness_against_brute_force() {
        let mut rng = rand::rng();
        let mut tree = QuadTree::new(world(), 15, 5);
        let mut items = Vec::new();

        for id in 0..500 {
            let item = Collidable::new(
                CollidableKind::Gem,
                id,
                rng.random_range(-100.0..100.0),
                rng.random_range(-100.0..100.0),
                rng.random_range(0.5..4.0),
            );
            items.push(item);
            tree.insert(item);
        }

        for _ in 0..50 {
            let region = Bounds::from_center(
                rng.random_range(-100.0..100.0),
                rng.random_range(-100.0..100.0),
                rng.random_range(1.0..40.0),
            );
            let candidates: Vec<u32> = tree.query(&region).iter().map(|c| c.id).collect();
            for item in &items {
                if item.bound.intersects(&region) {
                    assert!(
                        candidates.contains(&item.id),
                        "item {} intersects the region but was not returned",
                        item.id
                    );
                }
            }
        }
    }
}
