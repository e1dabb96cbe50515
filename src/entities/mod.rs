pub mod prelude;

pub mod episodes;
pub mod genres;
pub mod seasons;
pub mod series;
pub mod series_genres;
pub mod user_series;
pub mod users;
