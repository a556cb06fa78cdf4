//! Client-side query dispatch for a search box: keystroke debouncing,
//! last-write-wins result handling and the open/close shortcut.

pub mod debounce;
pub mod dispatch;
pub mod shortcut;

pub use debounce::Debouncer;
pub use dispatch::{SearchClient, SearchDispatcher, SearchSession, SessionState};
pub use shortcut::{Key, KeyPress, Overlay, Platform};
