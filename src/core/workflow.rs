//! Expense approval state machine and role permissions.
//!
//! The transition graph is fixed: `pending → approved → paid` and
//! `pending → rejected`, with `paid` and `rejected` terminal. Which roles may
//! walk each edge is data, held in a [`PermissionTable`] that can be loaded
//! from configuration.

use crate::{
    entities::{ExpenseStatus, Role},
    errors::{Error, Result},
};
use serde::{Deserialize, Serialize};

/// Every legal status change.
pub const TRANSITIONS: [(ExpenseStatus, ExpenseStatus); 3] = [
    (ExpenseStatus::Pending, ExpenseStatus::Approved),
    (ExpenseStatus::Pending, ExpenseStatus::Rejected),
    (ExpenseStatus::Approved, ExpenseStatus::Paid),
];

/// Status every new expense starts in.
pub const INITIAL_STATUS: ExpenseStatus = ExpenseStatus::Pending;

/// Whether `from → to` is an edge of the transition graph.
#[must_use]
pub fn is_transition(from: ExpenseStatus, to: ExpenseStatus) -> bool {
    TRANSITIONS.contains(&(from, to))
}

/// Whether no transition leaves `status`.
#[must_use]
pub fn is_terminal(status: ExpenseStatus) -> bool {
    !TRANSITIONS.iter().any(|(from, _)| *from == status)
}

/// Roles allowed to walk one edge of the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRule {
    /// Source status
    pub from: ExpenseStatus,
    /// Target status
    pub to: ExpenseStatus,
    /// Roles allowed to perform the transition
    pub roles: Vec<Role>,
}

/// Role permissions for creating, transitioning and deleting expenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionTable {
    /// Roles that may create expenses
    pub create: Vec<Role>,
    /// Roles that may delete expenses
    pub delete: Vec<Role>,
    /// Roles per transition edge; an edge with no rule is allowed to nobody
    pub transitions: Vec<TransitionRule>,
}

impl Default for PermissionTable {
    fn default() -> Self {
        let admin_only = |from, to| TransitionRule {
            from,
            to,
            roles: vec![Role::Admin],
        };
        Self {
            create: vec![Role::Manager, Role::Admin],
            delete: vec![Role::Admin],
            transitions: TRANSITIONS
                .iter()
                .map(|(from, to)| admin_only(*from, *to))
                .collect(),
        }
    }
}

impl PermissionTable {
    /// Checks that every rule names an edge of the transition graph and that
    /// no edge has two rules.
    pub fn validate(&self) -> Result<()> {
        for (index, rule) in self.transitions.iter().enumerate() {
            if !is_transition(rule.from, rule.to) {
                return Err(Error::Config {
                    message: format!(
                        "permission rule for '{}' -> '{}' is not a valid transition",
                        rule.from, rule.to
                    ),
                });
            }
            if self.transitions[..index]
                .iter()
                .any(|r| r.from == rule.from && r.to == rule.to)
            {
                return Err(Error::Config {
                    message: format!(
                        "duplicate permission rule for '{}' -> '{}'",
                        rule.from, rule.to
                    ),
                });
            }
        }
        Ok(())
    }

    /// Whether `role` may create expenses.
    #[must_use]
    pub fn can_create(&self, role: Role) -> bool {
        self.create.contains(&role)
    }

    /// Whether `role` may delete expenses.
    #[must_use]
    pub fn can_delete(&self, role: Role) -> bool {
        self.delete.contains(&role)
    }

    /// Whether `role` may move an expense from `from` to `to`.
    #[must_use]
    pub fn can_transition(&self, role: Role, from: ExpenseStatus, to: ExpenseStatus) -> bool {
        self.transitions
            .iter()
            .any(|r| r.from == from && r.to == to && r.roles.contains(&role))
    }

    /// Whether `role` could have brought an expense into `status` at all.
    #[must_use]
    pub fn can_enter(&self, role: Role, status: ExpenseStatus) -> bool {
        if status == INITIAL_STATUS {
            return self.can_create(role);
        }
        self.transitions
            .iter()
            .any(|r| r.to == status && r.roles.contains(&role))
    }

    /// Fails with `Error::PermissionDenied` unless `role` may create expenses.
    pub fn ensure_create(&self, role: Role) -> Result<()> {
        if self.can_create(role) {
            Ok(())
        } else {
            Err(Error::PermissionDenied {
                role,
                action: "create expenses".to_string(),
            })
        }
    }

    /// Fails with `Error::PermissionDenied` unless `role` may delete expenses.
    pub fn ensure_delete(&self, role: Role) -> Result<()> {
        if self.can_delete(role) {
            Ok(())
        } else {
            Err(Error::PermissionDenied {
                role,
                action: "delete expenses".to_string(),
            })
        }
    }
}

/// What applying a requested status change amounts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan {
    /// The expense is already in the requested status
    Unchanged,
    /// Move to `to`; `debit` is set when the ledger must be charged
    Move {
        /// Target status
        to: ExpenseStatus,
        /// Whether entering `to` charges the ledger
        debit: bool,
    },
}

/// Decides whether `role` may move an expense from `current` to `target`.
///
/// Repeating the current status is an idempotent no-op as long as the role
/// could have entered it. Otherwise the edge must exist in the graph
/// (`Error::InvalidTransition`) and the role must be allowed to walk it
/// (`Error::PermissionDenied`).
pub fn plan_transition(
    permissions: &PermissionTable,
    role: Role,
    current: ExpenseStatus,
    target: ExpenseStatus,
) -> Result<TransitionPlan> {
    if current == target {
        if permissions.can_enter(role, target) {
            return Ok(TransitionPlan::Unchanged);
        }
        return Err(Error::PermissionDenied {
            role,
            action: format!("move expenses to '{target}'"),
        });
    }

    if !is_transition(current, target) {
        return Err(Error::InvalidTransition {
            from: current,
            to: target,
        });
    }

    if !permissions.can_transition(role, current, target) {
        return Err(Error::PermissionDenied {
            role,
            action: format!("move expenses from '{current}' to '{target}'"),
        });
    }

    Ok(TransitionPlan::Move {
        to: target,
        debit: target == ExpenseStatus::Approved,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use sea_orm::Iterable;

    #[test]
    fn test_terminal_states() {
        assert!(is_terminal(ExpenseStatus::Paid));
        assert!(is_terminal(ExpenseStatus::Rejected));
        assert!(!is_terminal(ExpenseStatus::Pending));
        assert!(!is_terminal(ExpenseStatus::Approved));
    }

    #[test]
    fn test_default_permission_table() {
        let table = PermissionTable::default();
        assert!(table.validate().is_ok());

        assert!(table.can_create(Role::Manager));
        assert!(table.can_create(Role::Admin));
        assert!(!table.can_create(Role::Officer));

        assert!(table.can_delete(Role::Admin));
        assert!(!table.can_delete(Role::Manager));

        for (from, to) in TRANSITIONS {
            assert!(table.can_transition(Role::Admin, from, to));
            assert!(!table.can_transition(Role::Manager, from, to));
            assert!(!table.can_transition(Role::Officer, from, to));
        }
    }

    #[test]
    fn test_permission_table_rejects_unknown_edge() {
        let mut table = PermissionTable::default();
        table.transitions.push(TransitionRule {
            from: ExpenseStatus::Approved,
            to: ExpenseStatus::Rejected,
            roles: vec![Role::Admin],
        });
        assert!(matches!(table.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_permission_table_rejects_duplicate_rule() {
        let mut table = PermissionTable::default();
        table.transitions.push(TransitionRule {
            from: ExpenseStatus::Pending,
            to: ExpenseStatus::Approved,
            roles: vec![Role::Manager],
        });
        assert!(matches!(table.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_plan_approve_debits() {
        let table = PermissionTable::default();
        let plan = plan_transition(
            &table,
            Role::Admin,
            ExpenseStatus::Pending,
            ExpenseStatus::Approved,
        )
        .unwrap();
        assert_eq!(
            plan,
            TransitionPlan::Move {
                to: ExpenseStatus::Approved,
                debit: true
            }
        );
    }

    #[test]
    fn test_plan_paid_and_rejected_do_not_debit() {
        let table = PermissionTable::default();
        let paid = plan_transition(
            &table,
            Role::Admin,
            ExpenseStatus::Approved,
            ExpenseStatus::Paid,
        )
        .unwrap();
        assert_eq!(
            paid,
            TransitionPlan::Move {
                to: ExpenseStatus::Paid,
                debit: false
            }
        );

        let rejected = plan_transition(
            &table,
            Role::Admin,
            ExpenseStatus::Pending,
            ExpenseStatus::Rejected,
        )
        .unwrap();
        assert_eq!(
            rejected,
            TransitionPlan::Move {
                to: ExpenseStatus::Rejected,
                debit: false
            }
        );
    }

    #[test]
    fn test_plan_reapprove_is_noop() {
        let table = PermissionTable::default();
        let plan = plan_transition(
            &table,
            Role::Admin,
            ExpenseStatus::Approved,
            ExpenseStatus::Approved,
        )
        .unwrap();
        assert_eq!(plan, TransitionPlan::Unchanged);

        let manager = plan_transition(
            &table,
            Role::Manager,
            ExpenseStatus::Approved,
            ExpenseStatus::Approved,
        );
        assert!(matches!(manager, Err(Error::PermissionDenied { .. })));
    }

    #[test]
    fn test_plan_manager_cannot_pay() {
        let table = PermissionTable::default();
        let result = plan_transition(
            &table,
            Role::Manager,
            ExpenseStatus::Approved,
            ExpenseStatus::Paid,
        );
        assert!(matches!(
            result,
            Err(Error::PermissionDenied {
                role: Role::Manager,
                ..
            })
        ));
    }

    #[test]
    fn test_no_transition_leaves_terminal_states() {
        let table = PermissionTable::default();
        for terminal in [ExpenseStatus::Paid, ExpenseStatus::Rejected] {
            for target in ExpenseStatus::iter().filter(|s| *s != terminal) {
                let result = plan_transition(&table, Role::Admin, terminal, target);
                assert!(
                    matches!(result, Err(Error::InvalidTransition { from, to }) if from == terminal && to == target),
                    "{terminal} -> {target} should be invalid"
                );
            }
        }
    }

    #[test]
    fn test_approved_cannot_be_rejected() {
        let table = PermissionTable::default();
        let result = plan_transition(
            &table,
            Role::Admin,
            ExpenseStatus::Approved,
            ExpenseStatus::Rejected,
        );
        assert!(matches!(result, Err(Error::InvalidTransition { .. })));
    }

    #[test]
    fn test_pending_cannot_skip_to_paid() {
        let table = PermissionTable::default();
        let result = plan_transition(
            &table,
            Role::Admin,
            ExpenseStatus::Pending,
            ExpenseStatus::Paid,
        );
        assert!(matches!(
            result,
            Err(Error::InvalidTransition {
                from: ExpenseStatus::Pending,
                to: ExpenseStatus::Paid
            })
        ));
    }

    #[test]
    fn test_custom_table_grants_manager_approval() {
        let mut table = PermissionTable::default();
        table.transitions[0].roles.push(Role::Manager);
        assert!(table.validate().is_ok());

        let plan = plan_transition(
            &table,
            Role::Manager,
            ExpenseStatus::Pending,
            ExpenseStatus::Approved,
        );
        assert!(plan.is_ok());
    }
}
