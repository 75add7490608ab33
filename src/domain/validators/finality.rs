//! Coherence between a 2-year master program, its finalities and its options.

use std::collections::HashSet;

use itertools::Itertools;

use crate::domain::error::DomainResult;
use crate::domain::message::{Violation, Violations};
use crate::domain::node::{Node, NodeIdentity};
use crate::domain::program_tree::ProgramTree;
use crate::domain::validators::{identities, BusinessValidator, ValidationContext};

/// The working tree and every stored tree using `node`, restricted to 2M roots.
fn master_2m_trees(
    tree: &ProgramTree,
    node: &Node,
    ctx: &ValidationContext<'_>,
) -> DomainResult<Vec<ProgramTree>> {
    let mut programs: Vec<ProgramTree> = ctx
        .trees_using(&node.identity(), tree)?
        .into_iter()
        .filter(|t| t.root_node().is_master_2m())
        .collect();
    if tree.root_node().is_master_2m() {
        programs.insert(0, tree.clone());
    }
    Ok(programs)
}

/// Whether some occurrence of `node` in `program` sits at or below a finality.
fn in_finality_context(program: &ProgramTree, node: &Node) -> bool {
    let Some(found) = program.find_node(&node.identity()) else {
        return false;
    };
    program.paths_of(found.node_id).iter().any(|path| {
        path.ids()
            .iter()
            .filter_map(|id| program.node(*id))
            .any(Node::is_finality)
    })
}

/// Attaching a branch under a 2M program: finalities it brings must not end
/// after the program, and options it brings into a finality must already be
/// declared by the program outside its finalities.
pub struct FinalitiesEndDateAndOptionsValidator<'a> {
    tree: &'a ProgramTree,
    parent: &'a Node,
    child: &'a Node,
    ctx: ValidationContext<'a>,
}

impl<'a> FinalitiesEndDateAndOptionsValidator<'a> {
    pub fn new(
        tree: &'a ProgramTree,
        parent: &'a Node,
        child: &'a Node,
        ctx: ValidationContext<'a>,
    ) -> Self {
        Self {
            tree,
            parent,
            child,
            ctx,
        }
    }

    fn check_end_dates(&self, program: &ProgramTree, branch: &[&Node], violations: &mut Violations) {
        let Some(program_end) = program.root_node().end_year else {
            return;
        };
        let late: Vec<&&Node> = branch
            .iter()
            .filter(|n| n.is_finality())
            .filter(|n| n.end_year.map_or(true, |end| end > program_end))
            .collect();
        if !late.is_empty() {
            violations.push(Violation::FinalityEndDateGreaterThan2M {
                finalities: late.iter().map(|n| &n.code).join(", "),
                program: program.root_node().to_string(),
                program_end,
            });
        }
    }

    fn check_options(&self, program: &ProgramTree, branch: &[&Node], violations: &mut Violations) {
        let options_in_finality: HashSet<NodeIdentity> = if in_finality_context(program, self.parent) {
            identities(branch.iter().copied().filter(|n| n.is_option()))
        } else {
            branch
                .iter()
                .filter(|n| n.is_finality())
                .flat_map(|finality| self.tree.subtree_nodes(finality.node_id))
                .filter(|n| n.is_option())
                .map(Node::identity)
                .collect()
        };
        if options_in_finality.is_empty() {
            return;
        }
        let declared = identities(program.get_2m_option_list());
        let missing: Vec<&NodeIdentity> = options_in_finality
            .iter()
            .filter(|o| !declared.contains(*o))
            .sorted()
            .collect();
        if !missing.is_empty() {
            violations.push(Violation::OptionNotInParent2M {
                options: missing.iter().map(|o| &o.code).join(", "),
                program: program.root_node().to_string(),
            });
        }
    }
}

impl BusinessValidator for FinalitiesEndDateAndOptionsValidator<'_> {
    fn validate(&self) -> DomainResult<()> {
        let branch = self.tree.subtree_nodes(self.child.node_id);
        let mut violations = Violations::new();
        for program in master_2m_trees(self.tree, self.parent, &self.ctx)? {
            self.check_end_dates(&program, &branch, &mut violations);
            self.check_options(&program, &branch, &mut violations);
        }
        Ok(violations.into_result()?)
    }
}

/// An option cannot leave a 2M program while one of its finalities still uses it.
pub struct DetachOptionValidator<'a> {
    tree: &'a ProgramTree,
    parent: &'a Node,
    child: &'a Node,
    ctx: ValidationContext<'a>,
}

impl<'a> DetachOptionValidator<'a> {
    pub fn new(
        tree: &'a ProgramTree,
        parent: &'a Node,
        child: &'a Node,
        ctx: ValidationContext<'a>,
    ) -> Self {
        Self {
            tree,
            parent,
            child,
            ctx,
        }
    }
}

impl BusinessValidator for DetachOptionValidator<'_> {
    fn validate(&self) -> DomainResult<()> {
        let mut violations = Violations::new();
        for program in master_2m_trees(self.tree, self.parent, &self.ctx)? {
            let Some(parent) = program.find_node(&self.parent.identity()) else {
                continue;
            };
            let Some(child) = program.find_node(&self.child.identity()) else {
                continue;
            };
            let after = program.without_link(parent.node_id, child.node_id);
            let still_declared = identities(after.get_2m_option_list());
            let removed: Vec<&Node> = program
                .get_2m_option_list()
                .into_iter()
                .filter(|o| !still_declared.contains(&o.identity()))
                .collect();
            if removed.is_empty() {
                continue;
            }
            let removed_ids = identities(removed.iter().copied());
            let mut used = Vec::new();
            let mut finalities = Vec::new();
            for finality in after.get_all_finalities() {
                let in_finality: Vec<&Node> = after
                    .subtree_nodes(finality.node_id)
                    .into_iter()
                    .filter(|n| removed_ids.contains(&n.identity()))
                    .collect();
                if !in_finality.is_empty() {
                    finalities.push(finality.code.clone());
                    used.extend(in_finality.into_iter().map(|n| n.code.clone()));
                }
            }
            if !used.is_empty() {
                violations.push(Violation::CannotDetachOptionUsedInFinality {
                    options: used.into_iter().sorted().dedup().join(", "),
                    finalities: finalities.into_iter().sorted().dedup().join(", "),
                });
            }
        }
        Ok(violations.into_result()?)
    }
}
