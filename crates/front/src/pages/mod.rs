//! Page containers.

pub mod people;

pub use people::{ActionOutcome, PageError, PeoplePage, PeopleView};
