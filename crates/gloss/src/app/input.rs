use super::App;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use gloss_core::{Gesture, GridTarget, Input, Modifiers};

const WHEEL_LINES: usize = 3;

pub(crate) fn modifiers(mods: KeyModifiers) -> Modifiers {
    Modifiers {
        shift: mods.contains(KeyModifiers::SHIFT),
        ctrl: mods.contains(KeyModifiers::CONTROL),
        alt: mods.contains(KeyModifiers::ALT),
        meta: mods.contains(KeyModifiers::SUPER) || mods.contains(KeyModifiers::META),
    }
}

impl App {
    fn over_tooltip(&self, x: u16, y: u16) -> bool {
        self.tooltip_area.is_some_and(|area| {
            x >= area.x && x < area.x + area.width && y >= area.y && y < area.y + area.height
        })
    }

    fn target_at(&self, x: u16, y: u16) -> Option<GridTarget> {
        self.grid_layout.as_ref()?.target_at(&self.grid, x, y)
    }

    pub fn handle_mouse(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::Moved => self.pointer_moved(event.column, event.row),
            MouseEventKind::Down(MouseButton::Left) => {
                self.pointer_clicked(event.column, event.row, modifiers(event.modifiers))
            }
            MouseEventKind::ScrollDown => self.scroll_down(WHEEL_LINES),
            MouseEventKind::ScrollUp => self.scroll_up(WHEEL_LINES),
            _ => {}
        }
    }

    fn pointer_moved(&mut self, x: u16, y: u16) {
        if self.over_tooltip(x, y) {
            return;
        }
        match self.target_at(x, y) {
            Some(target) => {
                self.pointer_in_grid = true;
                self.send(Input::Gesture(Gesture::hover(target)));
            }
            None => {
                // Only the crossing out of the grid matters
                if self.pointer_in_grid {
                    self.pointer_in_grid = false;
                    self.send(Input::PointerLeft);
                }
            }
        }
    }

    fn pointer_clicked(&mut self, x: u16, y: u16, mods: Modifiers) {
        if self.over_tooltip(x, y) {
            return;
        }
        match self.target_at(x, y) {
            Some(target) => self.send(Input::Gesture(Gesture::click(target).with_modifiers(mods))),
            None => self.send(Input::Dismiss),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let mods = modifiers(key.modifiers);
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            KeyCode::Esc => self.send(Input::Escape),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_down(1),
            KeyCode::Up | KeyCode::Char('k') => self.scroll_up(1),
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.scroll_half_page_down()
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.scroll_half_page_up()
            }
            KeyCode::PageDown => self.scroll_down(self.viewport_height.max(1)),
            KeyCode::PageUp => self.scroll_up(self.viewport_height.max(1)),
            KeyCode::Home | KeyCode::Char('g') => self.goto_start(),
            KeyCode::End | KeyCode::Char('G') => self.goto_end(),
            KeyCode::Char(']') => self.next_file(),
            KeyCode::Char('[') | KeyCode::BackTab => self.prev_file(),
            // A held modifier leaves the key to its default (nothing)
            KeyCode::Char('d') | KeyCode::Char('D') => self.send(Input::GoToDefinition(mods)),
            KeyCode::Char('r') | KeyCode::Char('R') => self.send(Input::FindReferences(mods)),
            KeyCode::Char('x') => self.send(Input::Dismiss),
            _ => {}
        }
    }
}
