#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Mac,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::Mac
        } else {
            Platform::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Escape,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub meta: bool,
    pub ctrl: bool,
}

impl KeyPress {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            meta: false,
            ctrl: false,
        }
    }
}

/// Open/focus state of the search results overlay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Overlay {
    pub open: bool,
    pub input_focused: bool,
}

impl Overlay {
    /// Cmd+K (macOS) or Ctrl+K elsewhere opens the overlay and focuses the
    /// input; Escape closes and blurs it. Returns whether the key was used.
    pub fn handle_key(&mut self, platform: Platform, press: KeyPress) -> bool {
        match press.key {
            Key::Char(c) if c.eq_ignore_ascii_case(&'k') => {
                let modifier = match platform {
                    Platform::Mac => press.meta,
                    Platform::Other => press.ctrl,
                };
                if !modifier {
                    return false;
                }
                self.open = true;
                self.input_focused = true;
                true
            }
            Key::Escape if self.open || self.input_focused => {
                self.open = false;
                self.input_focused = false;
                true
            }
            _ => false,
        }
    }
}
