/// Gamepad input using gilrs.
///
/// The pad drives the same editor as the keyboard: every frame `actions()`
/// yields `KeyAction`s for buttons pressed since the last `update()`.
/// Button mapping comes from the `[gamepad]` section of config.toml.
/// Default mapping:
///   D-pad / Left Stick ←→  →  Cursor
///   A                      →  Add block under palette cursor / close popup
///   B                      →  Remove block / close popup
///   Start                  →  Run
///   Select                 →  Reset level
///   Y                      →  Hint
///   X                      →  Next level
///   L1 / R1                →  Switch palette/program focus

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use super::input::KeyAction;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,      // LeftTrigger
    R1,      // RightTrigger
    L2,      // LeftTrigger2
    R2,      // RightTrigger2
    Start,
    Select,
}

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "L2" | "LT" | "LEFTTRIGGER2"  => Some(Btn::L2),
            "R2" | "RT" | "RIGHTTRIGGER2" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South     => Some(Btn::A),
            Button::East      => Some(Btn::B),
            Button::West      => Some(Btn::X),
            Button::North     => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::LeftTrigger2  => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start     => Some(Btn::Start),
            Button::Select    => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Action-to-button mapping.
struct ActionMap {
    add: Vec<Btn>,
    remove: Vec<Btn>,
    run: Vec<Btn>,
    reset: Vec<Btn>,
    hint: Vec<Btn>,
    next: Vec<Btn>,
    switch: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            add:    vec![Btn::A],
            remove: vec![Btn::B],
            run:    vec![Btn::Start],
            reset:  vec![Btn::Select],
            hint:   vec![Btn::Y],
            next:   vec![Btn::X],
            switch: vec![Btn::L1, Btn::R1],
        }
    }
}

impl ActionMap {
    /// Configured names replace a default only when at least one parses.
    fn from_config(cfg: &GamepadConfig) -> Self {
        fn parse_or(names: &[String], fallback: Vec<Btn>) -> Vec<Btn> {
            let parsed: Vec<Btn> = names.iter().filter_map(|s| Btn::from_name(s)).collect();
            if parsed.is_empty() { fallback } else { parsed }
        }
        let d = ActionMap::default();
        ActionMap {
            add: parse_or(&cfg.add, d.add),
            remove: parse_or(&cfg.remove, d.remove),
            run: parse_or(&cfg.run, d.run),
            reset: parse_or(&cfg.reset, d.reset),
            hint: parse_or(&cfg.hint, d.hint),
            next: parse_or(&cfg.next, d.next),
            switch: parse_or(&cfg.switch, d.switch),
        }
    }

    /// Actions triggered by the given fresh presses, in a fixed order.
    fn actions_for(&self, pressed: &[Btn]) -> Vec<KeyAction> {
        let hit = |btns: &[Btn]| btns.iter().any(|b| pressed.contains(b));
        let table: [(&[Btn], KeyAction); 7] = [
            (&self.switch, KeyAction::SwitchFocus),
            (&self.add, KeyAction::AddSelected),
            (&self.remove, KeyAction::RemoveSelected),
            (&self.run, KeyAction::Run),
            (&self.reset, KeyAction::Reset),
            (&self.hint, KeyAction::Hint),
            (&self.next, KeyAction::Next),
        ];
        table.iter()
            .filter(|(btns, _)| hit(*btns))
            .map(|(_, action)| *action)
            .collect()
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    /// Buttons pressed since the last `update()`.
    fresh: Vec<Btn>,
    dpad_left: bool,
    dpad_right: bool,
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick_left: bool,
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick_right: bool,
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick_x: f32,

    action_map: ActionMap,

    pub connected: bool,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = {
            match Gilrs::new() {
                Ok(g) => {
                    let has_pad = g.gamepads().next().is_some();
                    (Some(g), has_pad)
                }
                Err(_) => (None, false),
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            fresh: Vec::with_capacity(4),
            dpad_left: false,
            dpad_right: false,
            stick_left: false,
            stick_right: false,
            stick_x: 0.0,
            action_map: ActionMap::default(),
            connected,
        }
    }

    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        self.action_map = ActionMap::from_config(cfg);
    }

    /// Poll the pad. Call once per frame, then read `actions()`.
    pub fn update(&mut self) {
        self.fresh.clear();
        self.dpad_left = false;
        self.dpad_right = false;

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    match btn {
                        Button::DPadLeft => self.dpad_left = true,
                        Button::DPadRight => self.dpad_right = true,
                        other => self.fresh.extend(Btn::from_gilrs(other)),
                    }
                }
                EventType::AxisChanged(Axis::LeftStickX, value, _) => {
                    self.connected = true;
                    self.stick_x = value;
                }
                EventType::Connected => self.connected = true,
                EventType::Disconnected => {
                    self.connected = false;
                    self.stick_x = 0.0;
                }
                _ => {}
            }
        }

        // Stick acts like a D-pad: one cursor step per push past the deadzone.
        let was_left = self.stick_left;
        let was_right = self.stick_right;
        self.stick_left = self.stick_x < -STICK_DEADZONE;
        self.stick_right = self.stick_x > STICK_DEADZONE;
        if self.stick_left && !was_left { self.dpad_left = true; }
        if self.stick_right && !was_right { self.dpad_right = true; }
    }

    /// Editor actions for this frame.
    pub fn actions(&self) -> Vec<KeyAction> {
        let mut out = vec![];
        if self.dpad_left { out.push(KeyAction::CursorLeft); }
        if self.dpad_right { out.push(KeyAction::CursorRight); }
        out.extend(self.action_map.actions_for(&self.fresh));
        out
    }
}
