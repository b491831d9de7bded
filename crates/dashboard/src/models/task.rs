//! Task models.

use std::cmp::{Ordering, Reverse};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use flipledger_core::validation::{
    ValidationError, non_blank, parse_flag, parse_optional_date, parse_optional_enum,
    require_text,
};
use flipledger_core::{InventoryItemId, TaskCategory, TaskId, TaskPriority, TaskStatus};

use super::form::FormFields;

/// A to-do item, optionally about one inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub category: TaskCategory,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,
    /// Weak link; cleared when the item is deleted.
    pub inventory_id: Option<InventoryItemId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Overwrite the editable fields.
    pub fn apply(&mut self, input: TaskInput) {
        self.title = input.title;
        self.description = input.description;
        self.category = input.category;
        self.priority = input.priority;
        self.status = input.status;
        self.due_date = input.due_date;
        self.completed_date = input.completed_date;
    }

    /// Stamp `completed_date` on entering Done, if still empty.
    pub fn stamp_status_date(&mut self, today: NaiveDate) {
        if self.status == TaskStatus::Done {
            self.completed_date.get_or_insert(today);
        }
    }
}

/// Due date ascending with undated tasks last.
#[must_use]
pub fn by_due_date(a: &Task, b: &Task) -> Ordering {
    match (a.due_date, b.due_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Most urgent first, then by due date.
#[must_use]
pub fn by_priority_then_due(a: &Task, b: &Task) -> Ordering {
    Reverse(a.priority.rank())
        .cmp(&Reverse(b.priority.rank()))
        .then_with(|| by_due_date(a, b))
}

/// Validated create/edit input for a task.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub category: TaskCategory,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,
    /// SKU of the inventory item to link, if any.
    pub inventory_sku: Option<String>,
}

impl TaskInput {
    /// Parse and validate a submitted task form.
    ///
    /// # Errors
    ///
    /// Returns every invalid field at once.
    pub fn from_form(form: &FormFields) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::default();
        let input = Self {
            title: errors.check(require_text("title", form.get("title"))),
            description: form.text("description"),
            category: errors
                .check(parse_optional_enum("category", form.get("category")))
                .unwrap_or_default(),
            priority: errors
                .check(parse_optional_enum("priority", form.get("priority")))
                .unwrap_or_default(),
            status: errors
                .check(parse_optional_enum("status", form.get("status")))
                .unwrap_or_default(),
            due_date: errors.check(parse_optional_date("due_date", form.get("due_date"))),
            completed_date: errors
                .check(parse_optional_date("completed_date", form.get("completed_date"))),
            inventory_sku: form.text("inventory_sku"),
        };
        errors.into_result(input)
    }
}

/// Filter criteria for listing tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub category: Option<TaskCategory>,
    /// Only Todo / In Progress, most urgent first.
    pub pending_only: bool,
}

impl TaskFilter {
    /// Whether `task` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.status.is_none_or(|s| task.status == s)
            && self.priority.is_none_or(|p| task.priority == p)
            && self.category.is_none_or(|c| task.category == c)
            && (!self.pending_only || task.status.is_pending())
    }

    /// Ordering used for this filter's result set.
    #[must_use]
    pub fn ordering(&self) -> fn(&Task, &Task) -> Ordering {
        if self.pending_only {
            by_priority_then_due
        } else {
            by_due_date
        }
    }
}

/// Raw task list query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub pending: Option<String>,
}

impl TaskQuery {
    /// Parse into a typed filter.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming each malformed parameter.
    pub fn to_filter(&self) -> Result<TaskFilter, ValidationError> {
        let mut errors = ValidationError::default();
        let filter = TaskFilter {
            status: errors.check(parse_optional_enum("status", self.status.as_deref())),
            priority: errors.check(parse_optional_enum("priority", self.priority.as_deref())),
            category: errors.check(parse_optional_enum("category", self.category.as_deref())),
            pending_only: errors.check(
                non_blank(self.pending.as_deref())
                    .map_or(Ok(false), |raw| parse_flag("pending", raw)),
            ),
        };
        errors.into_result(filter)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn task(title: &str, priority: TaskPriority, due: Option<NaiveDate>) -> Task {
        Task {
            id: TaskId::generate(),
            title: title.to_string(),
            description: None,
            category: TaskCategory::Listing,
            priority,
            status: TaskStatus::Todo,
            due_date: due,
            completed_date: None,
            inventory_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn titles(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn test_due_date_order_puts_undated_last() {
        let d1 = NaiveDate::from_ymd_opt(2024, 5, 1);
        let d2 = NaiveDate::from_ymd_opt(2024, 5, 2);
        let mut tasks = vec![
            task("none", TaskPriority::Low, None),
            task("late", TaskPriority::Low, d2),
            task("early", TaskPriority::Low, d1),
        ];
        tasks.sort_by(by_due_date);
        assert_eq!(titles(&tasks), vec!["early", "late", "none"]);
    }

    #[test]
    fn test_pending_order_is_priority_first() {
        let d1 = NaiveDate::from_ymd_opt(2024, 5, 1);
        let d2 = NaiveDate::from_ymd_opt(2024, 5, 2);
        let mut tasks = vec![
            task("low-early", TaskPriority::Low, d1),
            task("urgent-late", TaskPriority::Urgent, d2),
            task("urgent-early", TaskPriority::Urgent, d1),
        ];
        let filter = TaskFilter {
            pending_only: true,
            ..TaskFilter::default()
        };
        tasks.sort_by(filter.ordering());
        assert_eq!(titles(&tasks), vec!["urgent-early", "urgent-late", "low-early"]);
    }

    #[test]
    fn test_done_stamps_completed_date_only_when_empty() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        let earlier = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let mut t = task("pack", TaskPriority::High, None);
        t.status = TaskStatus::Done;
        t.stamp_status_date(today);
        assert_eq!(t.completed_date, Some(today));

        let mut t = task("ship", TaskPriority::High, None);
        t.status = TaskStatus::Done;
        t.completed_date = Some(earlier);
        t.stamp_status_date(today);
        assert_eq!(t.completed_date, Some(earlier));
    }

    #[test]
    fn test_from_form_defaults() {
        let form = FormFields::from_pairs(&[("title", "Photograph jackets")]);
        let input = TaskInput::from_form(&form).unwrap();
        assert_eq!(input.priority, TaskPriority::Medium);
        assert_eq!(input.status, TaskStatus::Todo);
        assert_eq!(input.category, TaskCategory::Other);
    }

    #[test]
    fn test_filter_pending_only() {
        let filter = TaskFilter {
            pending_only: true,
            ..TaskFilter::default()
        };
        let mut t = task("x", TaskPriority::Low, None);
        assert!(filter.matches(&t));
        t.status = TaskStatus::Cancelled;
        assert!(!filter.matches(&t));
    }
}
