use ndarray::Array2;

/// Neighbourhood used when joining mask pixels into regions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connectivity {
    /// Edge neighbours only (up, down, left, right).
    Four,
    /// Edge and corner neighbours.
    Eight,
}

/// Statistics for a single connected component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentStats {
    /// Label of this component in the label map, starting at 1.
    pub label: u32,
    /// Number of pixels in the component.
    pub area: usize,
    /// Bounding box: (min_row, max_row, min_col, max_col).
    pub bbox: (usize, usize, usize, usize),
}

/// Result of labelling a mask.
#[derive(Clone, Debug)]
pub struct Labelling {
    /// Per-pixel component label, 0 for background.
    pub labels: Array2<u32>,
    /// Components ordered by label (top-left first in scan order).
    pub components: Vec<ComponentStats>,
}

impl Labelling {
    pub fn count(&self) -> usize {
        self.components.len()
    }

    /// Mask of pixels belonging to components with at least `min_area` pixels.
    pub fn mask_min_area(&self, min_area: usize) -> Array2<bool> {
        let keep: Vec<bool> = std::iter::once(false)
            .chain(self.components.iter().map(|c| c.area >= min_area))
            .collect();
        self.labels.mapv(|l| keep[l as usize])
    }
}

/// Two-pass connected component labelling with union-find.
///
/// Labels are compacted to `1..=n` in scan order, so the output is
/// deterministic for a given mask.
pub fn label_components(mask: &Array2<bool>, connectivity: Connectivity) -> Labelling {
    let (h, w) = mask.dim();
    let mut labels = Array2::<u32>::zeros((h, w));
    if h == 0 || w == 0 {
        return Labelling {
            labels,
            components: Vec::new(),
        };
    }

    let mut next_label: u32 = 1;
    // Index 0 unused; provisional labels start at 1.
    let mut parent: Vec<u32> = vec![0];

    // Pass 1: provisional labels from already-visited neighbours.
    for row in 0..h {
        for col in 0..w {
            if !mask[[row, col]] {
                continue;
            }

            let mut neighbours = [0u32; 4];
            if row > 0 {
                neighbours[0] = labels[[row - 1, col]];
            }
            if col > 0 {
                neighbours[1] = labels[[row, col - 1]];
            }
            if connectivity == Connectivity::Eight && row > 0 {
                if col > 0 {
                    neighbours[2] = labels[[row - 1, col - 1]];
                }
                if col + 1 < w {
                    neighbours[3] = labels[[row - 1, col + 1]];
                }
            }

            let smallest = neighbours.iter().copied().filter(|&l| l > 0).min();
            match smallest {
                None => {
                    parent.push(next_label);
                    labels[[row, col]] = next_label;
                    next_label += 1;
                }
                Some(min_label) => {
                    labels[[row, col]] = min_label;
                    for &l in neighbours.iter().filter(|&&l| l > 0 && l != min_label) {
                        union(&mut parent, min_label, l);
                    }
                }
            }
        }
    }

    // Map each root to a compact label in order of first appearance.
    let mut compact = vec![0u32; next_label as usize];
    let mut components: Vec<ComponentStats> = Vec::new();
    for provisional in 1..next_label {
        let root = find(&parent, provisional);
        if compact[root as usize] == 0 {
            components.push(ComponentStats {
                label: components.len() as u32 + 1,
                area: 0,
                bbox: (usize::MAX, 0, usize::MAX, 0),
            });
            compact[root as usize] = components.len() as u32;
        }
        compact[provisional as usize] = compact[root as usize];
    }

    // Pass 2: resolve labels and collect stats.
    for row in 0..h {
        for col in 0..w {
            let lbl = labels[[row, col]];
            if lbl == 0 {
                continue;
            }
            let resolved = compact[lbl as usize];
            labels[[row, col]] = resolved;

            let entry = &mut components[resolved as usize - 1];
            entry.area += 1;
            entry.bbox.0 = entry.bbox.0.min(row);
            entry.bbox.1 = entry.bbox.1.max(row);
            entry.bbox.2 = entry.bbox.2.min(col);
            entry.bbox.3 = entry.bbox.3.max(col);
        }
    }

    Labelling { labels, components }
}

fn find(parent: &[u32], mut x: u32) -> u32 {
    while parent[x as usize] != x {
        x = parent[x as usize];
    }
    x
}

fn union(parent: &mut [u32], a: u32, b: u32) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        let (small, big) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[big as usize] = small;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from(rows: &[&str]) -> Array2<bool> {
        let h = rows.len();
        let w = rows[0].len();
        Array2::from_shape_fn((h, w), |(r, c)| rows[r].as_bytes()[c] == b'#')
    }

    #[test]
    fn test_diagonal_pixels_split_under_four_connectivity() {
        let mask = mask_from(&["#..", ".#.", "..#"]);
        assert_eq!(label_components(&mask, Connectivity::Four).count(), 3);
        assert_eq!(label_components(&mask, Connectivity::Eight).count(), 1);
    }

    #[test]
    fn test_u_shape_merges_into_one_region() {
        let mask = mask_from(&["#.#", "#.#", "###"]);
        let labelling = label_components(&mask, Connectivity::Four);
        assert_eq!(labelling.count(), 1);
        assert_eq!(labelling.components[0].area, 7);
        assert_eq!(labelling.components[0].bbox, (0, 2, 0, 2));
        assert!(labelling.labels.iter().all(|&l| l <= 1));
    }

    #[test]
    fn test_mask_min_area_drops_small_regions() {
        let mask = mask_from(&["##..#", "##...", "....."]);
        let labelling = label_components(&mask, Connectivity::Eight);
        assert_eq!(labelling.count(), 2);
        let kept = labelling.mask_min_area(2);
        assert_eq!(kept.iter().filter(|&&v| v).count(), 4);
        assert!(!kept[[0, 4]]);
    }

    #[test]
    fn test_empty_mask() {
        let mask = Array2::<bool>::from_elem((4, 4), false);
        let labelling = label_components(&mask, Connectivity::Four);
        assert_eq!(labelling.count(), 0);
        assert!(labelling.mask_min_area(1).iter().all(|&v| !v));
    }
}
