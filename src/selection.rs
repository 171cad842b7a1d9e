// Which footprint's info window is open. At most one at a time.
// Transitions are pure; the widget runs the effects they return.

use serde::Serialize;

use crate::types::MarkerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Selection {
    #[default]
    Idle,
    Open(MarkerId),
}

/// Input to the selection machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    /// Click on a single-footprint marker.
    MarkerClick(MarkerId),
    /// Click on the map outside any marker.
    BackgroundClick,
    /// Click inside the info window, outside the article action.
    WindowClick,
}

/// Side effect of a transition, run in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEffect {
    CloseWindow,
    /// Level the camera. `animated` resets use the configured reset duration;
    /// `rotation` also brings the bearing back to north.
    LevelCamera { animated: bool, rotation: bool },
    /// Fly to the marker and open its window.
    Open(MarkerId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: Selection,
    pub effects: Vec<SelectionEffect>,
}

impl Selection {
    pub fn on(self, event: SelectionEvent) -> Transition {
        use SelectionEffect::*;

        let (next, effects) = match (self, event) {
            (Selection::Idle, SelectionEvent::MarkerClick(m)) => (Selection::Open(m), vec![Open(m)]),
            (Selection::Open(open), SelectionEvent::MarkerClick(m)) if open == m => (
                Selection::Idle,
                vec![
                    CloseWindow,
                    LevelCamera {
                        animated: true,
                        rotation: true,
                    },
                ],
            ),
            (Selection::Open(_), SelectionEvent::MarkerClick(m)) => (
                Selection::Open(m),
                vec![
                    CloseWindow,
                    LevelCamera {
                        animated: true,
                        rotation: true,
                    },
                    Open(m),
                ],
            ),
            (Selection::Open(_), SelectionEvent::BackgroundClick | SelectionEvent::WindowClick) => (
                Selection::Idle,
                vec![
                    CloseWindow,
                    LevelCamera {
                        animated: false,
                        rotation: false,
                    },
                ],
            ),
            (Selection::Idle, SelectionEvent::BackgroundClick | SelectionEvent::WindowClick) => {
                (Selection::Idle, Vec::new())
            }
        };

        Transition { next, effects }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Selection::Open(_))
    }

    /// Markers may only be rebuilt while no window is open.
    pub fn allows_rerender(&self) -> bool {
        !self.is_open()
    }
}
