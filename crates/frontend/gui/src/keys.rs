use emu_host::settings::KeyMapping;
use emu_host::Button;
use minifb::Key;

pub fn string_to_key(s: &str) -> Option<Key> {
    match s {
        "A" => Some(Key::A),
        "B" => Some(Key::B),
        "C" => Some(Key::C),
        "D" => Some(Key::D),
        "E" => Some(Key::E),
        "F" => Some(Key::F),
        "G" => Some(Key::G),
        "H" => Some(Key::H),
        "I" => Some(Key::I),
        "J" => Some(Key::J),
        "K" => Some(Key::K),
        "L" => Some(Key::L),
        "M" => Some(Key::M),
        "N" => Some(Key::N),
        "O" => Some(Key::O),
        "P" => Some(Key::P),
        "Q" => Some(Key::Q),
        "R" => Some(Key::R),
        "S" => Some(Key::S),
        "T" => Some(Key::T),
        "U" => Some(Key::U),
        "V" => Some(Key::V),
        "W" => Some(Key::W),
        "X" => Some(Key::X),
        "Y" => Some(Key::Y),
        "Z" => Some(Key::Z),
        "LeftShift" => Some(Key::LeftShift),
        "RightShift" => Some(Key::RightShift),
        "LeftCtrl" => Some(Key::LeftCtrl),
        "RightCtrl" => Some(Key::RightCtrl),
        "Backspace" => Some(Key::Backspace),
        "Tab" => Some(Key::Tab),
        "Enter" => Some(Key::Enter),
        "Space" => Some(Key::Space),
        "Up" => Some(Key::Up),
        "Down" => Some(Key::Down),
        "Left" => Some(Key::Left),
        "Right" => Some(Key::Right),
        _ => None,
    }
}

/// Resolved keyboard bindings
#[derive(Debug, Clone)]
pub struct KeyBindings {
    pairs: Vec<(Key, Button)>,
}

impl KeyBindings {
    pub fn from_mapping(mapping: &KeyMapping) -> Self {
        let names = [
            (&mapping.a, Button::A),
            (&mapping.b, Button::B),
            (&mapping.select, Button::Select),
            (&mapping.start, Button::Start),
            (&mapping.up, Button::Up),
            (&mapping.down, Button::Down),
            (&mapping.left, Button::Left),
            (&mapping.right, Button::Right),
            (&mapping.l, Button::L),
            (&mapping.r, Button::R),
            (&mapping.y, Button::Y),
        ];

        let mut pairs = Vec::with_capacity(names.len());
        for (name, button) in names {
            match string_to_key(name) {
                Some(key) => pairs.push((key, button)),
                None => log::warn!("Unknown key name {:?} for {:?}, button unbound", name, button),
            }
        }
        Self { pairs }
    }

    pub fn pairs(&self) -> &[(Key, Button)] {
        &self.pairs
    }

    pub fn button(&self, key: Key) -> Option<Button> {
        self.pairs
            .iter()
            .find(|(bound, _)| *bound == key)
            .map(|&(_, button)| button)
    }
}
