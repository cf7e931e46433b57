//! Union-Find over window positions

/// Disjoint-set structure with path compression and union by rank
///
/// Elements are the positions `0..len` of a window slice.
pub(crate) struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression
        let mut current = x;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    pub fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);

        if root_x == root_y {
            return;
        }

        match self.rank[root_x].cmp(&self.rank[root_y]) {
            std::cmp::Ordering::Greater => self.parent[root_y] = root_x,
            std::cmp::Ordering::Less => self.parent[root_x] = root_y,
            std::cmp::Ordering::Equal => {
                self.parent[root_y] = root_x;
                self.rank[root_x] += 1;
            }
        }
    }

    /// Disjoint sets, ordered by their lowest member; members ascending
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let len = self.parent.len();
        let mut slot_of_root: Vec<Option<usize>> = vec![None; len];
        let mut groups: Vec<Vec<usize>> = Vec::new();

        for elem in 0..len {
            let root = self.find(elem);
            match slot_of_root[root] {
                Some(slot) => groups[slot].push(elem),
                None => {
                    slot_of_root[root] = Some(groups.len());
                    groups.push(vec![elem]);
                }
            }
        }

        groups
    }
}
