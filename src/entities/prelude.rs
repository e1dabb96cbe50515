pub use super::episodes::Entity as Episodes;
pub use super::genres::Entity as Genres;
pub use super::seasons::Entity as Seasons;
pub use super::series::Entity as Series;
pub use super::series_genres::Entity as SeriesGenres;
pub use super::user_series::Entity as UserSeries;
pub use super::users::Entity as Users;
