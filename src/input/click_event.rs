use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other,
}

/// A pointer press in screen coordinates, as delivered by a click hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    pub x: i32,
    pub y: i32,
    pub button: MouseButton,
    pub timestamp: DateTime<Utc>,
}

impl ClickEvent {
    pub fn new(x: i32, y: i32, button: MouseButton) -> Self {
        Self {
            x,
            y,
            button,
            timestamp: Utc::now(),
        }
    }

    pub fn left(x: i32, y: i32) -> Self {
        Self::new(x, y, MouseButton::Left)
    }

    pub fn is_primary(&self) -> bool {
        self.button == MouseButton::Left
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_click_is_primary_and_timestamped() {
        let before = Utc::now();
        let event = ClickEvent::left(100, 200);
        assert_eq!((event.x, event.y), (100, 200));
        assert!(event.is_primary());
        assert!(event.timestamp >= before);
    }

    #[test]
    fn right_click_is_not_primary() {
        assert!(!ClickEvent::new(0, 0, MouseButton::Right).is_primary());
    }
}
