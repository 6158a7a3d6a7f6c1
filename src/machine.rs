//! The selection state machine.
//!
//! Pointer and keyboard input arrive as [`Event`]s; the machine owns the
//! committed rectangles for the current image plus the transient gesture
//! phase, and answers every accepted event with a [`Redraw`] snapshot.
//! It knows nothing about the window system, which is what makes it
//! testable without one.

use thiserror::Error;

use crate::geometry::{self, Point, Rect};

/// External stimulus. Begin/End pairs correspond to the press and release
/// of the draw (primary) and move (secondary) pointer buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    BeginDraw(Point),
    EndDraw(Point),
    BeginMove(Point),
    EndMove(Point),
    PointerMoved(Point),
    Delete,
}

/// Gesture phase. `Moving` always carries the lifted rectangle, so
/// "moving with nothing lifted" cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Drawing { anchor: Point },
    Moving { anchor: Point, lifted: Rect },
}

pub type MachineResult<T> = std::result::Result<T, ProtocolError>;

/// Press/release pairing violations. These indicate a broken event
/// source, not operator error, and abort the whole run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("press event {event:?} arrived while a gesture was already in progress")]
    UnmatchedPress { event: Event },
    #[error("release event {event:?} arrived with no matching press")]
    UnmatchedRelease { event: Event },
}

/// What the overlay should show after a transition: every committed
/// rectangle in one style, the transient preview (if any) in another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redraw {
    pub committed: Vec<Rect>,
    pub preview: Option<Rect>,
}

#[derive(Debug)]
pub struct Machine {
    width: i32,
    height: i32,
    rects: Vec<Rect>,
    phase: Phase,
    preview: Option<Rect>,
}

impl Machine {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            rects: Vec::new(),
            phase: Phase::Idle,
            preview: None,
        }
    }

    /// Freezes the annotation set for this image.
    pub fn finish(self) -> Vec<Rect> {
        self.rects
    }

    pub fn apply(&mut self, event: Event) -> MachineResult<Redraw> {
        tracing::debug!(phase = ?self.phase, ?event, "apply selection event");
        match event {
            Event::BeginDraw(point) => self.begin_draw(point)?,
            Event::EndDraw(point) => self.end_draw(point)?,
            Event::BeginMove(point) => self.begin_move(point)?,
            Event::EndMove(point) => self.end_move(point),
            Event::PointerMoved(point) => self.pointer_moved(point),
            Event::Delete => self.delete(),
        }
        Ok(self.redraw())
    }

    fn redraw(&self) -> Redraw {
        Redraw {
            committed: self.rects.clone(),
            preview: self.preview,
        }
    }

    fn begin_draw(&mut self, point: Point) -> MachineResult<()> {
        if !matches!(self.phase, Phase::Idle) {
            return Err(ProtocolError::UnmatchedPress {
                event: Event::BeginDraw(point),
            });
        }
        self.phase = Phase::Drawing { anchor: point };
        self.preview = Some(geometry::square_from(point, point));
        Ok(())
    }

    fn end_draw(&mut self, point: Point) -> MachineResult<()> {
        let Phase::Drawing { anchor } = self.phase else {
            return Err(ProtocolError::UnmatchedRelease {
                event: Event::EndDraw(point),
            });
        };
        self.rects.push(geometry::square_from(anchor, point));
        self.phase = Phase::Idle;
        self.preview = None;
        Ok(())
    }

    fn begin_move(&mut self, point: Point) -> MachineResult<()> {
        if !matches!(self.phase, Phase::Idle) {
            return Err(ProtocolError::UnmatchedPress {
                event: Event::BeginMove(point),
            });
        }
        // First match in insertion order.
        let Some(index) = self.rects.iter().position(|r| geometry::contains(point, *r)) else {
            tracing::warn!(?point, "move pressed with no rectangle under the pointer");
            return Ok(());
        };
        let lifted = self.rects.remove(index);
        self.phase = Phase::Moving {
            anchor: point,
            lifted,
        };
        self.preview = Some(lifted);
        Ok(())
    }

    fn end_move(&mut self, point: Point) {
        let Phase::Moving { anchor, lifted } = self.phase else {
            // Happens when a delete consumed the lifted rect before the
            // button came back up; the release is then a no-op.
            tracing::warn!(?point, "move released with nothing lifted");
            return;
        };
        self.rects.push(geometry::translate_clamped(
            lifted,
            point.x - anchor.x,
            point.y - anchor.y,
            self.width,
            self.height,
        ));
        self.phase = Phase::Idle;
        self.preview = None;
    }

    fn pointer_moved(&mut self, point: Point) {
        match self.phase {
            Phase::Idle => {}
            Phase::Drawing { anchor } => {
                self.preview = Some(geometry::square_from(anchor, point));
            }
            Phase::Moving { anchor, lifted } => {
                self.preview = Some(geometry::translate_clamped(
                    lifted,
                    point.x - anchor.x,
                    point.y - anchor.y,
                    self.width,
                    self.height,
                ));
            }
        }
    }

    fn delete(&mut self) {
        if let Phase::Moving { .. } = self.phase {
            self.phase = Phase::Idle;
            self.preview = None;
        } else {
            tracing::debug!("delete ignored outside of a move");
        }
    }
}

#[cfg(test)]
impl Machine {
    fn rects(&self) -> &[Rect] {
        &self.rects
    }

    fn preview(&self) -> Option<Rect> {
        self.preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::square_from;

    fn p(x: i32, y: i32) -> Point {
        Point::new(x, y)
    }

    fn machine_with_square(corner: Point, opposite: Point) -> Machine {
        let mut machine = Machine::new(640, 480);
        machine
            .apply(Event::BeginDraw(corner))
            .expect("press should be accepted while idle");
        machine
            .apply(Event::EndDraw(opposite))
            .expect("release should match the press");
        machine
    }

    #[test]
    fn draw_commits_the_normalized_square() {
        let machine = machine_with_square(p(10, 10), p(30, 10));
        assert_eq!(machine.rects(), &[square_from(p(10, 10), p(30, 10))]);
        assert!(machine.rects()[0].is_square());
    }

    #[test]
    fn preview_follows_the_pointer_while_drawing() {
        let mut machine = Machine::new(640, 480);
        machine.apply(Event::BeginDraw(p(10, 10))).unwrap();
        assert_eq!(machine.preview(), Some(square_from(p(10, 10), p(10, 10))));

        let redraw = machine.apply(Event::PointerMoved(p(25, 40))).unwrap();
        assert_eq!(redraw.preview, Some(square_from(p(10, 10), p(25, 40))));
        assert!(redraw.committed.is_empty());
    }

    #[test]
    fn pointer_motion_while_idle_changes_nothing() {
        let mut machine = machine_with_square(p(10, 10), p(30, 30));
        let before = machine.rects().to_vec();
        let redraw = machine.apply(Event::PointerMoved(p(200, 200))).unwrap();
        assert_eq!(redraw.committed, before);
        assert_eq!(redraw.preview, None);
    }

    #[test]
    fn move_with_identical_coordinates_preserves_the_set() {
        let mut machine = machine_with_square(p(10, 10), p(30, 30));
        let before = machine.rects().to_vec();

        machine.apply(Event::BeginMove(p(20, 20))).unwrap();
        machine.apply(Event::EndMove(p(20, 20))).unwrap();

        assert_eq!(machine.rects(), before.as_slice());
    }

    #[test]
    fn move_translates_and_clamps_the_lifted_rect() {
        let mut machine = machine_with_square(p(10, 10), p(30, 30));
        machine.apply(Event::BeginMove(p(20, 20))).unwrap();
        // Drag far past the left edge: the rect pins against x = 0.
        let redraw = machine.apply(Event::PointerMoved(p(-500, 20))).unwrap();
        assert_eq!(
            redraw.preview,
            Some(Rect::new(p(0, 10), p(20, 30)))
        );
        machine.apply(Event::EndMove(p(-500, 20))).unwrap();
        assert_eq!(machine.rects(), &[Rect::new(p(0, 10), p(20, 30))]);
    }

    #[test]
    fn begin_move_scans_in_insertion_order() {
        let mut machine = machine_with_square(p(10, 10), p(50, 50));
        // Overlapping square committed second.
        machine.apply(Event::BeginDraw(p(20, 20))).unwrap();
        machine.apply(Event::EndDraw(p(60, 60))).unwrap();

        machine.apply(Event::BeginMove(p(30, 30))).unwrap();
        // The first-committed square is the one lifted.
        assert_eq!(machine.rects(), &[square_from(p(20, 20), p(60, 60))]);
        assert_eq!(machine.preview(), Some(square_from(p(10, 10), p(50, 50))));
    }

    #[test]
    fn begin_move_miss_is_a_non_fatal_noop() {
        let mut machine = machine_with_square(p(10, 10), p(30, 30));
        let before = machine.rects().to_vec();
        let redraw = machine
            .apply(Event::BeginMove(p(300, 300)))
            .expect("a miss must not be fatal");
        assert_eq!(redraw.committed, before);
        assert_eq!(redraw.preview, None);
        // Still idle: a draw press is accepted.
        machine.apply(Event::BeginDraw(p(100, 100))).unwrap();
    }

    #[test]
    fn delete_during_move_drops_the_lifted_rect() {
        let mut machine = machine_with_square(p(10, 10), p(30, 30));
        let count_before = machine.rects().len();

        machine.apply(Event::BeginMove(p(20, 20))).unwrap();
        machine.apply(Event::Delete).unwrap();
        // The release that follows the delete is a tolerated no-op.
        machine.apply(Event::EndMove(p(20, 20))).unwrap();

        let rects = machine.finish();
        assert_eq!(rects.len(), count_before - 1);
        assert!(!rects.contains(&square_from(p(10, 10), p(30, 30))));
    }

    #[test]
    fn delete_outside_a_move_is_ignored() {
        let mut machine = machine_with_square(p(10, 10), p(30, 30));
        let before = machine.rects().to_vec();
        machine.apply(Event::Delete).unwrap();
        assert_eq!(machine.rects(), before.as_slice());
    }

    #[test]
    fn end_draw_while_idle_is_a_protocol_error() {
        let mut machine = machine_with_square(p(10, 10), p(30, 30));
        let before = machine.rects().to_vec();
        let err = machine
            .apply(Event::EndDraw(p(5, 5)))
            .expect_err("release without press must fail");
        assert_eq!(
            err,
            ProtocolError::UnmatchedRelease {
                event: Event::EndDraw(p(5, 5))
            }
        );
        assert_eq!(machine.rects(), before.as_slice());
    }

    #[test]
    fn double_draw_press_is_a_protocol_error() {
        let mut machine = Machine::new(640, 480);
        machine.apply(Event::BeginDraw(p(10, 10))).unwrap();
        let err = machine
            .apply(Event::BeginDraw(p(12, 12)))
            .expect_err("second press without release must fail");
        assert!(matches!(err, ProtocolError::UnmatchedPress { .. }));
    }

    #[test]
    fn move_press_during_draw_is_a_protocol_error() {
        let mut machine = machine_with_square(p(10, 10), p(30, 30));
        machine.apply(Event::BeginDraw(p(40, 40))).unwrap();
        let err = machine
            .apply(Event::BeginMove(p(20, 20)))
            .expect_err("move press during a draw must fail");
        assert!(matches!(err, ProtocolError::UnmatchedPress { .. }));
    }

    #[test]
    fn duplicates_and_overlaps_are_committed_as_is() {
        let mut machine = machine_with_square(p(10, 10), p(30, 30));
        machine.apply(Event::BeginDraw(p(10, 10))).unwrap();
        machine.apply(Event::EndDraw(p(30, 30))).unwrap();
        assert_eq!(machine.rects().len(), 2);
        assert_eq!(machine.rects()[0], machine.rects()[1]);
    }
}
