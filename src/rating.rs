//! The thumbs up/down control shown under each answer.

use crate::types::Rating;

/// One of the two buttons of a [`RatingControl`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Thumb {
    /// The thumbs-up button.
    Up,
    /// The thumbs-down button.
    Down,
}

impl Thumb {
    fn rating(self) -> Rating {
        match self {
            Thumb::Up => Rating::Up,
            Thumb::Down => Rating::Down,
        }
    }
}

/// Local tri-state rating toggle.
///
/// Clicking a thumb selects it, and clicking the selected thumb again clears the rating.  Every
/// click reports the new state to the callback.  The control does no networking; the owner
/// decides what a change means.
pub struct RatingControl<F: FnMut(Rating)> {
    rating: Rating,
    on_rating: F,
}

impl<F: FnMut(Rating)> RatingControl<F> {
    /// Create a control showing `rating` that reports changes to `on_rating`.
    pub fn new(rating: Rating, on_rating: F) -> Self {
        Self { rating, on_rating }
    }

    /// The rating currently shown.
    pub fn rating(&self) -> Rating {
        self.rating
    }

    /// Click one of the thumbs and return the new rating.
    pub fn click(&mut self, thumb: Thumb) -> Rating {
        let selected = thumb.rating();
        self.rating = if self.rating == selected {
            Rating::Unset
        } else {
            selected
        };
        (self.on_rating)(self.rating);
        self.rating
    }
}

/// The rating a click would produce, without a control or callback.
pub fn toggled(current: Rating, thumb: Thumb) -> Rating {
    let mut control = RatingControl::new(current, |_| {});
    control.click(thumb)
}
