//! Input abstraction and per-tick latching
//!
//! The host samples devices once per rendered frame; the simulation may run
//! zero or more fixed ticks for that frame. Rising edges are latched so the
//! first tick after a sample sees them exactly once.

use warren_core::math::Vec2;

/// Logical buttons the simulation understands.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Button {
    Left = 0,
    Right,
    Up,
    Down,
    Interact,
    Lift,
    /// Pointer button driving the gravity gun.
    Grab,
}

impl Button {
    pub const ALL: [Button; 7] = [
        Button::Left,
        Button::Right,
        Button::Up,
        Button::Down,
        Button::Interact,
        Button::Lift,
        Button::Grab,
    ];

    #[inline]
    pub const fn bit(self) -> u32 {
        1 << self as u8
    }
}

/// Set of buttons, one bit each.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Buttons(u32);

impl Buttons {
    pub const NONE: Buttons = Buttons(0);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn with(self, button: Button) -> Self {
        Self(self.0 | button.bit())
    }

    pub fn contains(self, button: Button) -> bool {
        self.0 & button.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn rising_from(self, previous: Buttons) -> Buttons {
        Buttons(self.0 & !previous.0)
    }
}

impl FromIterator<Button> for Buttons {
    fn from_iter<I: IntoIterator<Item = Button>>(iter: I) -> Self {
        iter.into_iter().fold(Buttons::NONE, Buttons::with)
    }
}

/// Snapshot read by tick systems.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputState {
    /// Normalized move axis derived from the directional buttons. +y is down.
    pub move_x: f32,
    pub move_y: f32,
    /// Held this frame.
    pub down: Buttons,
    /// Rising edges; only non-empty on the first tick after a sample.
    pub pressed: Buttons,
    /// Pointer position in world pixels, when the host has one.
    pub aim: Option<Vec2>,
}

impl InputState {
    /// Build a snapshot from held buttons, deriving the move axis.
    pub fn from_buttons(down: Buttons, pressed: Buttons) -> Self {
        let axis = |neg: Button, pos: Button| -> f32 {
            let mut v = 0.0_f32;
            if down.contains(pos) {
                v += 1.0;
            }
            if down.contains(neg) {
                v -= 1.0;
            }
            v
        };
        let mut move_x = axis(Button::Left, Button::Right);
        let mut move_y = axis(Button::Up, Button::Down);
        let mag = (move_x * move_x + move_y * move_y).sqrt();
        if mag > 0.0 {
            move_x /= mag;
            move_y /= mag;
        }
        Self {
            move_x,
            move_y,
            down,
            pressed,
            aim: None,
        }
    }

    pub fn is_down(&self, button: Button) -> bool {
        self.down.contains(button)
    }

    pub fn was_pressed(&self, button: Button) -> bool {
        self.pressed.contains(button)
    }

    pub fn has_move(&self) -> bool {
        self.move_x != 0.0 || self.move_y != 0.0
    }
}

/// Frame-to-tick input latch.
#[derive(Debug, Default)]
pub struct InputLatch {
    previous_down: Buttons,
    latched: Buttons,
    aim: Option<Vec2>,
    frame: InputState,
}

impl InputLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one device sample. Edges accumulate until a tick consumes them.
    pub fn begin_frame(&mut self, down: Buttons) {
        let rising = down.rising_from(self.previous_down);
        self.previous_down = down;
        self.latched = Buttons(self.latched.0 | rising.0);
        self.frame = InputState::from_buttons(down, Buttons::NONE);
        self.frame.aim = self.aim;
    }

    /// Pointer position carried by every snapshot from the next sample on.
    pub fn set_aim(&mut self, aim: Option<Vec2>) {
        self.aim = aim;
    }

    /// Snapshot for the next fixed tick. Consumes latched edges.
    pub fn for_tick(&mut self) -> InputState {
        let mut state = self.frame;
        state.pressed = std::mem::take(&mut self.latched);
        state
    }

    /// Snapshot without consuming edges.
    pub fn peek(&self) -> InputState {
        InputState {
            pressed: self.latched,
            ..self.frame
        }
    }
}
