//! Density-based clustering of scalar values.
//!
//! A one-dimensional DBSCAN: a value is a *core* value when at least
//! `min_samples` values (itself included) lie within `eps` of it. Core values
//! closer than `eps` to each other share a cluster; a non-core value within
//! `eps` of a core value joins the cluster of the nearest such core value
//! (the left one on a tie); everything else is noise.

/// DBSCAN parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dbscan {
    /// Neighbourhood radius (inclusive)
    pub eps: f64,
    /// Minimum neighbourhood size for a core value, the value itself included
    pub min_samples: usize,
}

impl Dbscan {
    /// Create clustering parameters.
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self {
            eps,
            min_samples: min_samples.max(1),
        }
    }

    /// Cluster `values`, returning one label per input value.
    ///
    /// `None` marks noise. Cluster ids are dense and numbered by ascending
    /// position, so cluster `0` holds the smallest values. The result depends
    /// only on the multiset of values and the parameters.
    pub fn fit(&self, values: &[f64]) -> Vec<Option<usize>> {
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]).then(a.cmp(&b)));
        let sorted: Vec<f64> = order.iter().map(|&i| values[i]).collect();

        let is_core: Vec<bool> = sorted
            .iter()
            .map(|&v| {
                let lo = sorted.partition_point(|&x| x < v - self.eps);
                let hi = sorted.partition_point(|&x| x <= v + self.eps);
                hi - lo >= self.min_samples
            })
            .collect();

        // Chain neighbouring core values into clusters.
        let mut core_label = vec![None; sorted.len()];
        let mut next_label = 0;
        let mut prev_core: Option<usize> = None;
        for pos in 0..sorted.len() {
            if !is_core[pos] {
                continue;
            }
            let label = match prev_core {
                Some(prev) if sorted[pos] - sorted[prev] <= self.eps => core_label[prev],
                _ => {
                    next_label += 1;
                    Some(next_label - 1)
                }
            };
            core_label[pos] = label;
            prev_core = Some(pos);
        }

        let mut labels = vec![None; values.len()];
        for pos in 0..sorted.len() {
            let label = if is_core[pos] {
                core_label[pos]
            } else {
                self.border_label(pos, &sorted, &is_core, &core_label)
            };
            labels[order[pos]] = label;
        }
        labels
    }

    fn border_label(
        &self,
        pos: usize,
        sorted: &[f64],
        is_core: &[bool],
        core_label: &[Option<usize>],
    ) -> Option<usize> {
        let v = sorted[pos];
        let left = (0..pos)
            .rev()
            .take_while(|&p| v - sorted[p] <= self.eps)
            .find(|&p| is_core[p]);
        let right = (pos + 1..sorted.len())
            .take_while(|&p| sorted[p] - v <= self.eps)
            .find(|&p| is_core[p]);

        match (left, right) {
            (Some(l), Some(r)) if sorted[r] - v < v - sorted[l] => core_label[r],
            (Some(l), _) => core_label[l],
            (None, Some(r)) => core_label[r],
            (None, None) => None,
        }
    }
}

/// Member indices of every cluster, indexed by cluster id.
pub fn group_by_label(labels: &[Option<usize>]) -> Vec<Vec<usize>> {
    let count = labels.iter().flatten().map(|&l| l + 1).max().unwrap_or(0);
    let mut groups = vec![Vec::new(); count];
    for (i, label) in labels.iter().enumerate() {
        if let Some(l) = label {
            groups[*l].push(i);
        }
    }
    groups
}
