pub mod episode;
pub mod genre;
pub mod season;
pub mod series;
pub mod user;
pub mod user_series;
