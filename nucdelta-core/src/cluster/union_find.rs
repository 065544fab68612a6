//! Weighted union-find over match indices

/// Disjoint sets over `0..n`.
///
/// `parent_or_negative_size[i] < 0` marks `i` as a root whose tree holds
/// `-parent_or_negative_size[i]` members; otherwise the entry is the index of
/// the parent.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent_or_negative_size: Vec<i64>,
}

impl UnionFind {
    pub fn new(size: usize) -> Self {
        Self {
            parent_or_negative_size: vec![-1; size],
        }
    }

    /// Root of the set containing `index`, compressing the path walked.
    pub fn find(&mut self, index: usize) -> usize {
        let mut root = index;
        while self.parent_or_negative_size[root] >= 0 {
            root = self.parent_or_negative_size[root] as usize;
        }

        let mut current = index;
        while current != root {
            let next = self.parent_or_negative_size[current] as usize;
            self.parent_or_negative_size[current] = root as i64;
            current = next;
        }

        root
    }

    /// Join two roots. The larger tree absorbs the smaller; on equal sizes
    /// `first` is attached under `second`. Non-roots are left untouched.
    pub fn union(&mut self, first: usize, second: usize) {
        if first == second {
            return;
        }
        let first_size = self.parent_or_negative_size[first];
        let second_size = self.parent_or_negative_size[second];
        if first_size >= 0 || second_size >= 0 {
            return;
        }

        if first_size < second_size {
            self.parent_or_negative_size[first] += second_size;
            self.parent_or_negative_size[second] = first as i64;
        } else {
            self.parent_or_negative_size[second] += first_size;
            self.parent_or_negative_size[first] = second as i64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_size(uf: &mut UnionFind, index: usize) -> usize {
        let root = uf.find(index);
        (-uf.parent_or_negative_size[root]) as usize
    }

    #[test]
    fn test_singletons() {
        let mut uf = UnionFind::new(3);
        assert_eq!(uf.find(0), 0);
        assert_eq!(uf.find(2), 2);
        assert_eq!(set_size(&mut uf, 1), 1);
    }

    #[test]
    fn test_equal_sizes_attach_first_under_second() {
        let mut uf = UnionFind::new(4);
        uf.union(0, 1);
        assert_eq!(uf.find(0), 1);
        assert_eq!(set_size(&mut uf, 0), 2);
    }

    #[test]
    fn test_larger_tree_absorbs_smaller() {
        let mut uf = UnionFind::new(4);
        uf.union(0, 1); // root 1, size 2
        let root = uf.find(0);
        uf.union(root, 3); // size 2 vs 1
        assert_eq!(uf.find(3), 1);
        assert_eq!(set_size(&mut uf, 3), 3);
    }

    #[test]
    fn test_index_zero_as_parent() {
        let mut uf = UnionFind::new(3);
        uf.union(1, 2); // root 2
        uf.union(0, 2); // size 1 vs 2, so 0 goes under 2
        assert_eq!(uf.find(0), 2);

        let mut uf = UnionFind::new(3);
        uf.union(1, 0); // root 0
        uf.union(2, 0);
        assert_eq!(uf.find(2), 0);
        assert_eq!(uf.find(1), 0);
        assert_eq!(set_size(&mut uf, 1), 3);
    }

    #[test]
    fn test_path_compression() {
        let mut uf = UnionFind::new(5);
        uf.union(0, 1);
        uf.union(2, 3);
        let (a, b) = (uf.find(0), uf.find(2));
        uf.union(a, b);
        let root = uf.find(0);
        for i in 0..4 {
            assert_eq!(uf.find(i), root);
        }
        assert_eq!(uf.parent_or_negative_size[0], root as i64);
        assert_eq!(uf.find(4), 4);
    }
}
