pub mod buttons;
pub mod document_view;
pub mod filter_bar;
pub mod hotkey;
pub mod hotkey_view;
pub mod modal;
pub mod result_grid;
pub mod status_line;
pub mod text_input;
pub mod top_bar_view;
pub mod tree_view;

pub use document_view::DocumentView;
pub use filter_bar::{FilterBar, FilterEdit};
pub use modal::{
    CellValueModal, ConfirmationModal, InputModal, Modal, ModalAction, PickerItem,
    PickerModal,
};
pub use result_grid::{ResultGridView, ResultPanel};
pub use status_line::{StatusKind, StatusLine};
pub use text_input::TextInput;
pub use top_bar_view::TopBarView;
pub use tree_view::{Collapsible, TreeRow, TreeView};
