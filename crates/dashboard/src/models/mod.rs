//! Domain records, their inputs and list filters.

pub mod form;
pub mod inventory;
pub mod page;
pub mod return_case;
pub mod sale;
pub mod setting;
pub mod shipment;
pub mod stats;
pub mod task;

pub use form::FormFields;
pub use inventory::{InventoryFilter, InventoryInput, InventoryItem, InventoryQuery};
pub use page::{Page, PageQuery};
pub use return_case::{ReturnCase, ReturnFilter, ReturnInput, ReturnQuery};
pub use sale::{Sale, SaleFilter, SaleInput, SaleQuery, SalesTotals};
pub use setting::{AppSettings, Setting, SettingsUpdate};
pub use shipment::{Shipment, ShipmentFilter, ShipmentInput, ShipmentListing, ShipmentQuery};
pub use stats::{DashboardStats, InventoryCounts, PlatformCount};
pub use task::{Task, TaskFilter, TaskInput, TaskQuery};
