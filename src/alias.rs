//! Variable-alias equivalence classes.
//!
//! A map from variable to representative; a variable absent from the map is
//! its own representative. Lookups apply path compression so the
//! substitutor's whole-IR walk stays linear.

use std::collections::HashMap;

use crate::model::{Model, VarId};

#[derive(Debug, Default)]
pub struct AliasTable {
    representative: HashMap<VarId, VarId>,
}

impl AliasTable {
    pub fn is_empty(&self) -> bool {
        self.representative.is_empty()
    }

    pub fn len(&self) -> usize {
        self.representative.len()
    }

    pub fn clear(&mut self) {
        self.representative.clear();
    }

    /// The root of `var`'s equivalence class, compressing the walked path.
    pub fn representative(&mut self, var: VarId) -> VarId {
        let mut root = var;
        while let Some(&next) = self.representative.get(&root) {
            root = next;
        }
        let mut walk = var;
        while walk != root {
            let next = self.representative[&walk];
            self.representative.insert(walk, root);
            walk = next;
        }
        root
    }

    /// Every recorded variable with its root, paths compressed.
    pub fn pairs(&mut self) -> Vec<(VarId, VarId)> {
        let members: Vec<VarId> = self.representative.keys().copied().collect();
        members
            .into_iter()
            .map(|member| (member, self.representative(member)))
            .collect()
    }

    /// Merges the classes of `a` and `b`, applying the variable merge rule:
    /// the non-temporary side becomes the representative, domains intersect,
    /// a defining-constraint pointer transfers to the winner, and the loser
    /// is marked inactive. Returns `false` without touching anything when
    /// the classes already coincide or when both roots own a defining
    /// constraint.
    pub fn try_unify(&mut self, model: &mut Model, a: VarId, b: VarId) -> bool {
        let root_a = self.representative(a);
        let root_b = self.representative(b);
        if root_a == root_b {
            return false;
        }

        let (winner, loser) = if !model.var(root_a).temporary {
            (root_a, root_b)
        } else if !model.var(root_b).temporary {
            (root_b, root_a)
        } else {
            (root_a, root_b)
        };

        let loser_defined = model.var(loser).defining_constraint;
        if model.var(winner).defining_constraint.is_some() && loser_defined.is_some() {
            return false;
        }

        if let Some(constraint) = loser_defined {
            model.var_mut(loser).defining_constraint = None;
            model.constraints[constraint.0].target_variable = Some(winner);
            model.var_mut(winner).defining_constraint = Some(constraint);
        }

        let loser_domain = model.var(loser).domain.clone();
        model
            .var_mut(winner)
            .domain
            .intersect_with_domain(&loser_domain);
        model.var_mut(loser).active = false;
        self.representative.insert(loser, winner);
        true
    }
}
