use iced::mouse::{self, Cursor};
use iced::touch;
use iced::widget::canvas::{self, Cache, LineCap, LineJoin, Path, Program, Stroke};
use iced::{Color, Point, Rectangle, Renderer, Theme};

use crate::signature::{Position, Segment};
use crate::Message;

/// Pointer input from the signature canvas, in the surface's layout space
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PadEvent {
    Down { position: Position, origin: Position },
    Move { position: Position, origin: Position },
    Up,
}

/// Geometry of the stroke in progress.
///
/// Finished strokes live only in the pad raster, which is shown under the
/// canvas; this holds the segments since the last pointer down.
pub struct LiveStroke {
    segments: Vec<Segment>,
    cache: Cache,
}

impl LiveStroke {
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
            cache: Cache::new(),
        }
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
        self.cache.clear();
    }

    /// Drop the geometry once the raster shows the stroke.
    pub fn finish(&mut self) {
        self.segments.clear();
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl Default for LiveStroke {
    fn default() -> Self {
        Self::new()
    }
}

/// Canvas program for the signature surface.
///
/// Mouse and touch input are turned into `PadEvent`s; drawing itself
/// happens in the pad. The canvas is transparent and only paints the live
/// stroke on top of the raster preview.
pub struct SignatureSurface<'a> {
    pub stroke: &'a LiveStroke,
    pub stroke_width: f32,
}

/// Which input is currently drawing
#[derive(Debug, Clone, Default)]
pub struct DrawState {
    pub mouse_down: bool,
    pub finger: Option<touch::Finger>,
}

fn position(point: Point) -> Position {
    Position::new(point.x, point.y)
}

fn point(position: Position) -> Point {
    Point::new(position.x, position.y)
}

impl<'a> Program<Message> for SignatureSurface<'a> {
    type State = DrawState;

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        let geometry = self.stroke.cache.draw(renderer, bounds.size(), |frame| {
            for segment in &self.stroke.segments {
                let pen = Stroke::default()
                    .with_width(self.stroke_width)
                    .with_color(Color::from_rgb8(17, 24, 39))
                    .with_line_cap(LineCap::Round)
                    .with_line_join(LineJoin::Round);
                frame.stroke(&Path::line(point(segment.from), point(segment.to)), pen);
            }
        });

        vec![geometry]
    }

    fn update(
        &self,
        state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (canvas::event::Status, Option<Message>) {
        let origin = position(bounds.position());

        match event {
            // Mouse button press inside the surface - start a stroke
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                if let Some(pos) = cursor.position_over(bounds) {
                    state.mouse_down = true;
                    return (
                        canvas::event::Status::Captured,
                        Some(Message::Pad(PadEvent::Down {
                            position: position(pos),
                            origin,
                        })),
                    );
                }
            }

            // The event carries window coordinates; the cursor is already in
            // the same space as `bounds`, even inside a scrolled container.
            canvas::Event::Mouse(mouse::Event::CursorMoved { .. }) => {
                if state.mouse_down {
                    // Leaving the surface ends the stroke
                    let Some(pos) = cursor.position_over(bounds) else {
                        state.mouse_down = false;
                        return (canvas::event::Status::Captured, Some(Message::Pad(PadEvent::Up)));
                    };
                    return (
                        canvas::event::Status::Captured,
                        Some(Message::Pad(PadEvent::Move {
                            position: position(pos),
                            origin,
                        })),
                    );
                }
            }

            canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left))
            | canvas::Event::Mouse(mouse::Event::CursorLeft) => {
                if state.mouse_down {
                    state.mouse_down = false;
                    return (canvas::event::Status::Captured, Some(Message::Pad(PadEvent::Up)));
                }
            }

            canvas::Event::Touch(touch::Event::FingerPressed { id, position: pos }) => {
                if state.finger.is_none() && bounds.contains(pos) {
                    state.finger = Some(id);
                    return (
                        canvas::event::Status::Captured,
                        Some(Message::Pad(PadEvent::Down {
                            position: position(pos),
                            origin,
                        })),
                    );
                }
            }

            canvas::Event::Touch(touch::Event::FingerMoved { id, position: pos }) => {
                if state.finger == Some(id) {
                    if !bounds.contains(pos) {
                        state.finger = None;
                        return (canvas::event::Status::Captured, Some(Message::Pad(PadEvent::Up)));
                    }
                    return (
                        canvas::event::Status::Captured,
                        Some(Message::Pad(PadEvent::Move {
                            position: position(pos),
                            origin,
                        })),
                    );
                }
            }

            canvas::Event::Touch(touch::Event::FingerLifted { id, .. })
            | canvas::Event::Touch(touch::Event::FingerLost { id, .. }) => {
                if state.finger == Some(id) {
                    state.finger = None;
                    return (canvas::event::Status::Captured, Some(Message::Pad(PadEvent::Up)));
                }
            }

            _ => {}
        }

        (canvas::event::Status::Ignored, None)
    }

    fn mouse_interaction(
        &self,
        _state: &Self::State,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> mouse::Interaction {
        if cursor.is_over(bounds) {
            mouse::Interaction::Crosshair
        } else {
            mouse::Interaction::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(stroke: &LiveStroke) -> SignatureSurface<'_> {
        SignatureSurface {
            stroke,
            stroke_width: 2.5,
        }
    }

    fn bounds() -> Rectangle {
        Rectangle::new(Point::new(100.0, 50.0), iced::Size::new(200.0, 80.0))
    }

    fn message(result: (canvas::event::Status, Option<Message>)) -> Option<PadEvent> {
        match result.1 {
            Some(Message::Pad(event)) => Some(event),
            _ => None,
        }
    }

    #[test]
    fn test_mouse_stroke_sequence() {
        let stroke = LiveStroke::new();
        let surface = surface(&stroke);
        let mut state = DrawState::default();
        let inside = Cursor::Available(Point::new(110.0, 60.0));

        let down = surface.update(
            &mut state,
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)),
            bounds(),
            inside,
        );
        assert_eq!(
            message(down),
            Some(PadEvent::Down {
                position: Position::new(110.0, 60.0),
                origin: Position::new(100.0, 50.0),
            })
        );

        let moved = surface.update(
            &mut state,
            canvas::Event::Mouse(mouse::Event::CursorMoved {
                position: Point::new(150.0, 70.0),
            }),
            bounds(),
            Cursor::Available(Point::new(150.0, 70.0)),
        );
        assert!(matches!(message(moved), Some(PadEvent::Move { .. })));

        let left = surface.update(
            &mut state,
            canvas::Event::Mouse(mouse::Event::CursorMoved {
                position: Point::new(400.0, 70.0),
            }),
            bounds(),
            Cursor::Available(Point::new(400.0, 70.0)),
        );
        assert_eq!(message(left), Some(PadEvent::Up));
        assert!(!state.mouse_down);
    }

    #[test]
    fn test_press_outside_is_ignored() {
        let stroke = LiveStroke::new();
        let surface = surface(&stroke);
        let mut state = DrawState::default();

        let (status, message) = surface.update(
            &mut state,
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)),
            bounds(),
            Cursor::Available(Point::new(10.0, 10.0)),
        );
        assert_eq!(status, canvas::event::Status::Ignored);
        assert!(message.is_none());
        assert!(!state.mouse_down);
    }

    #[test]
    fn test_touch_tracks_one_finger() {
        let stroke = LiveStroke::new();
        let surface = surface(&stroke);
        let mut state = DrawState::default();
        let first = touch::Finger(1);
        let second = touch::Finger(2);

        let down = surface.update(
            &mut state,
            canvas::Event::Touch(touch::Event::FingerPressed {
                id: first,
                position: Point::new(120.0, 60.0),
            }),
            bounds(),
            Cursor::Unavailable,
        );
        assert!(matches!(message(down), Some(PadEvent::Down { .. })));

        let other = surface.update(
            &mut state,
            canvas::Event::Touch(touch::Event::FingerMoved {
                id: second,
                position: Point::new(130.0, 60.0),
            }),
            bounds(),
            Cursor::Unavailable,
        );
        assert!(message(other).is_none());

        let lifted = surface.update(
            &mut state,
            canvas::Event::Touch(touch::Event::FingerLifted {
                id: first,
                position: Point::new(130.0, 60.0),
            }),
            bounds(),
            Cursor::Unavailable,
        );
        assert_eq!(message(lifted), Some(PadEvent::Up));
        assert!(state.finger.is_none());
    }

    #[test]
    fn test_moves_follow_cursor_when_scrolled() {
        let stroke = LiveStroke::new();
        let surface = surface(&stroke);
        let mut state = DrawState::default();
        // Laid out 300px down the page, page scrolled by 200px
        let bounds = Rectangle::new(Point::new(100.0, 300.0), iced::Size::new(200.0, 80.0));

        let down = surface.update(
            &mut state,
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)),
            bounds,
            Cursor::Available(Point::new(150.0, 340.0)),
        );
        assert_eq!(
            message(down),
            Some(PadEvent::Down {
                position: Position::new(150.0, 340.0),
                origin: Position::new(100.0, 300.0),
            })
        );

        let moved = surface.update(
            &mut state,
            canvas::Event::Mouse(mouse::Event::CursorMoved {
                position: Point::new(160.0, 142.0),
            }),
            bounds,
            Cursor::Available(Point::new(160.0, 342.0)),
        );
        assert_eq!(
            message(moved),
            Some(PadEvent::Move {
                position: Position::new(160.0, 342.0),
                origin: Position::new(100.0, 300.0),
            })
        );
        assert!(state.mouse_down);

        let left = surface.update(
            &mut state,
            canvas::Event::Mouse(mouse::Event::CursorMoved {
                position: Point::new(160.0, 500.0),
            }),
            bounds,
            Cursor::Available(Point::new(160.0, 700.0)),
        );
        assert_eq!(message(left), Some(PadEvent::Up));
    }

    #[test]
    fn test_finger_leaving_surface_ends_stroke() {
        let stroke = LiveStroke::new();
        let surface = surface(&stroke);
        let mut state = DrawState::default();
        let finger = touch::Finger(7);

        surface.update(
            &mut state,
            canvas::Event::Touch(touch::Event::FingerPressed {
                id: finger,
                position: Point::new(120.0, 60.0),
            }),
            bounds(),
            Cursor::Unavailable,
        );

        let outside = surface.update(
            &mut state,
            canvas::Event::Touch(touch::Event::FingerMoved {
                id: finger,
                position: Point::new(900.0, 600.0),
            }),
            bounds(),
            Cursor::Unavailable,
        );
        assert_eq!(message(outside), Some(PadEvent::Up));
        assert!(state.finger.is_none());

        // Coming back does not resume the stroke
        let back = surface.update(
            &mut state,
            canvas::Event::Touch(touch::Event::FingerMoved {
                id: finger,
                position: Point::new(130.0, 60.0),
            }),
            bounds(),
            Cursor::Unavailable,
        );
        assert!(message(back).is_none());
    }

    #[test]
    fn test_live_stroke_is_dropped_on_finish() {
        let mut stroke = LiveStroke::new();
        for i in 0..3 {
            let x = i as f32 * 10.0;
            stroke.push(Segment {
                from: Position::new(x, 5.0),
                to: Position::new(x + 10.0, 5.0),
            });
        }
        assert_eq!(stroke.len(), 3);

        stroke.finish();
        assert!(stroke.is_empty());
    }
}
