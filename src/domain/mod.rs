// Domain layer - Price model and pure analytics
pub mod analytics;
pub mod calendar;
pub mod next_period;
pub mod price;
pub mod rating;
