//! Venue adapters implementing [`crate::application::ports::Venue`].

mod paper;

pub use paper::{PaperVenue, Scripted, VenueCall};
