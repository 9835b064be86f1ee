//! Reference cycles between the generated sum types.

use crate::{
    grammar::{Elem, Partition},
    types::{Map, Set},
};

/// For each sum type, the set of sum types reachable from it through direct
/// (non-list) fields.
#[derive(Debug)]
pub struct Reachability<'g> {
    reachable: Map<&'g str, Set<&'g str>>,
}

impl<'g> Reachability<'g> {
    pub fn new(partitions: &[Partition<'g>]) -> Self {
        let mut reachable: Map<&'g str, Set<&'g str>> = Map::default();
        for partition in partitions {
            if let Partition::Sum { ty, .. } = partition {
                reachable.insert(*ty, Set::default());
            }
        }

        // 直接参照している型を初期値とする
        let mut edges: Vec<(&'g str, &'g str)> = vec![];
        for partition in partitions {
            if let Partition::Sum { ty, rules } = partition {
                for rule in rules {
                    for elem in &rule.construction {
                        if let Elem::Named(name) = Elem::classify(elem) {
                            if let Some((name, _)) = reachable.get_key_value(name) {
                                edges.push((*ty, *name));
                            }
                        }
                    }
                }
            }
        }
        for &(from, to) in &edges {
            reachable[from].insert(to);
        }

        // 値が更新されなくなるまで繰り返す
        let mut changed = true;
        while changed {
            changed = false;
            for &(from, to) in &edges {
                let added: Vec<&'g str> = reachable[to]
                    .iter()
                    .copied()
                    .filter(|ty| !reachable[from].contains(ty))
                    .collect();
                if !added.is_empty() {
                    changed = true;
                    reachable[from].extend(added);
                }
            }
        }

        Self { reachable }
    }

    /// Whether a field of type `field` inside the sum type `owner` closes a
    /// reference cycle, and hence must be boxed.
    pub fn needs_box(&self, owner: &str, field: &str) -> bool {
        self.reachable
            .get(field)
            .map_or(false, |reachable| reachable.contains(owner))
    }
}
