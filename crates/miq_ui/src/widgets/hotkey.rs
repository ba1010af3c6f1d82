use std::fmt::Display;

use crossterm::event::KeyCode;

#[derive(Debug, Clone)]
pub struct Hotkey<'a> {
    pub keycode: KeyCode,
    pub description: &'a str,
}

impl Display for Hotkey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let KeyCode::Char(c) = self.keycode {
            write!(f, "{c}")
        } else {
            write!(f, "{}", self.keycode)
        }
    }
}

pub const TREE_HOTKEYS: [Hotkey; 10] = [
    Hotkey { keycode: KeyCode::Char('a'), description: "Add Connection" },
    Hotkey { keycode: KeyCode::Char('n'), description: "New Query" },
    Hotkey { keycode: KeyCode::Char('t'), description: "Top Rows" },
    Hotkey { keycode: KeyCode::Char('i'), description: "Structure" },
    Hotkey { keycode: KeyCode::Char('p'), description: "Pin / Unpin" },
    Hotkey { keycode: KeyCode::Char('/'), description: "Filter Tables" },
    Hotkey { keycode: KeyCode::Char(':'), description: "Filter Columns" },
    Hotkey { keycode: KeyCode::Char('o'), description: "Open Table" },
    Hotkey { keycode: KeyCode::Char('r'), description: "Refresh" },
    Hotkey { keycode: KeyCode::Char('?'), description: "All Keys" },
];

pub const EDITOR_HOTKEYS: [Hotkey; 4] = [
    Hotkey { keycode: KeyCode::F(5), description: "Run" },
    Hotkey { keycode: KeyCode::F(6), description: "Run All" },
    Hotkey { keycode: KeyCode::F(4), description: "Structure At Cursor" },
    Hotkey { keycode: KeyCode::Esc, description: "Back To Tree" },
];

pub const RESULT_HOTKEYS: [Hotkey; 9] = [
    Hotkey { keycode: KeyCode::Char('/'), description: "Filter Column" },
    Hotkey { keycode: KeyCode::Char('x'), description: "Clear Filters" },
    Hotkey { keycode: KeyCode::Enter, description: "Full Value" },
    Hotkey { keycode: KeyCode::Char('y'), description: "Copy Header" },
    Hotkey { keycode: KeyCode::Char('i'), description: "Insert Header" },
    Hotkey { keycode: KeyCode::Char('e'), description: "Edit SQL" },
    Hotkey { keycode: KeyCode::Char('r'), description: "Re-run" },
    Hotkey { keycode: KeyCode::Char(']'), description: "Next Page" },
    Hotkey { keycode: KeyCode::Tab, description: "Next Pane" },
];

/// Every sidebar key, for the `?` overlay.
pub const HELP_HOTKEYS: [Hotkey; 28] = [
    Hotkey { keycode: KeyCode::Char('j'), description: "Down" },
    Hotkey { keycode: KeyCode::Char('k'), description: "Up" },
    Hotkey { keycode: KeyCode::Char('l'), description: "Expand" },
    Hotkey { keycode: KeyCode::Char('h'), description: "Collapse" },
    Hotkey { keycode: KeyCode::Enter, description: "Toggle" },
    Hotkey { keycode: KeyCode::Char('a'), description: "Add Connection" },
    Hotkey { keycode: KeyCode::Char('e'), description: "Rename Connection" },
    Hotkey { keycode: KeyCode::Char('D'), description: "Delete / Drop" },
    Hotkey { keycode: KeyCode::Char('n'), description: "New Query" },
    Hotkey { keycode: KeyCode::Char('s'), description: "Select Database" },
    Hotkey { keycode: KeyCode::Char('t'), description: "Top Rows / Column" },
    Hotkey { keycode: KeyCode::Char('f'), description: "Filter By Value" },
    Hotkey { keycode: KeyCode::Char('y'), description: "Copy Name" },
    Hotkey { keycode: KeyCode::Char('I'), description: "Insert Column" },
    Hotkey { keycode: KeyCode::Char('i'), description: "Structure" },
    Hotkey { keycode: KeyCode::Char('o'), description: "Open Table" },
    Hotkey { keycode: KeyCode::Char('C'), description: "Count Rows" },
    Hotkey { keycode: KeyCode::Char('p'), description: "Pin / Unpin" },
    Hotkey { keycode: KeyCode::Char('b'), description: "Backup Table" },
    Hotkey { keycode: KeyCode::Char('A'), description: "Add Column" },
    Hotkey { keycode: KeyCode::Char('E'), description: "Expand All" },
    Hotkey { keycode: KeyCode::Char('W'), description: "Collapse All" },
    Hotkey { keycode: KeyCode::Char('/'), description: "Filter Tables" },
    Hotkey { keycode: KeyCode::Char(':'), description: "Filter Columns" },
    Hotkey { keycode: KeyCode::Char('x'), description: "Clear Filters" },
    Hotkey { keycode: KeyCode::Char('r'), description: "Refresh" },
    Hotkey { keycode: KeyCode::Tab, description: "Next Pane" },
    Hotkey { keycode: KeyCode::Char('q'), description: "Quit" },
];
