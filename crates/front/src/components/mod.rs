//! Page building blocks: table configuration, the entity table, editable
//! cells, the action bar and the context menu.

pub mod action_bar;
pub mod context_menu;
pub mod data_table;
pub mod editable_cell;
pub mod table;

pub use action_bar::{ActionBar, ActionBarEntry, ActionBarView, ActionError, ActionHandler, ActionKind};
pub use context_menu::{ContextMenu, ContextMenuView, MenuPosition};
pub use data_table::{DataTableConfig, TableColumn};
pub use editable_cell::{CellError, CellMode, CellView, EditableCell, ViewFieldDefinition, ViewFieldKind};
pub use table::{EntityTable, TableError, TablePage, TableRow};
