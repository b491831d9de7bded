//! References between record types and what happens to them on delete.
//!
//! A weak reference is cleared when its parent is deleted. An owning
//! reference deletes the child along with the parent. Stores walk
//! [`RELATIONS`] rather than hard-coding per-table behavior.

use std::fmt;

/// The six persisted record types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Inventory,
    Sale,
    Shipment,
    ReturnCase,
    Task,
    Setting,
}

impl EntityKind {
    /// Backing table name.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::Sale => "sales",
            Self::Shipment => "shipments",
            Self::ReturnCase => "returns",
            Self::Task => "tasks",
            Self::Setting => "settings",
        }
    }

    /// Name used in messages.
    #[must_use]
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Inventory => "inventory item",
            Self::Sale => "sale",
            Self::Shipment => "shipment",
            Self::ReturnCase => "return",
            Self::Task => "task",
            Self::Setting => "setting",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

/// Delete behavior of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Set the child's reference to empty.
    Weak,
    /// Delete the child.
    Owning,
}

/// A nullable reference column from `child` to `parent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub child: EntityKind,
    pub column: &'static str,
    pub parent: EntityKind,
    pub kind: RelationKind,
}

/// Every reference in the schema.
pub const RELATIONS: &[Relation] = &[
    Relation {
        child: EntityKind::Sale,
        column: "inventory_id",
        parent: EntityKind::Inventory,
        kind: RelationKind::Weak,
    },
    Relation {
        child: EntityKind::Task,
        column: "inventory_id",
        parent: EntityKind::Inventory,
        kind: RelationKind::Weak,
    },
    Relation {
        child: EntityKind::Shipment,
        column: "sale_id",
        parent: EntityKind::Sale,
        kind: RelationKind::Owning,
    },
    Relation {
        child: EntityKind::ReturnCase,
        column: "sale_id",
        parent: EntityKind::Sale,
        kind: RelationKind::Weak,
    },
];

/// Relations whose parent is `parent`.
pub fn dependents_of(parent: EntityKind) -> impl Iterator<Item = &'static Relation> {
    RELATIONS.iter().filter(move |r| r.parent == parent)
}

/// Dependent rows touched by a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteReport {
    /// Children whose weak reference was cleared.
    pub detached: u64,
    /// Children deleted through an owning reference.
    pub cascaded: u64,
}

impl DeleteReport {
    /// Add `rows` to the counter for `kind`.
    pub const fn record(&mut self, kind: RelationKind, rows: u64) {
        match kind {
            RelationKind::Weak => self.detached += rows,
            RelationKind::Owning => self.cascaded += rows,
        }
    }
}
