pub mod filmography;
pub mod genre;
pub mod keyword;
pub mod movie;
pub mod movie_genre;
pub mod movie_keyword;
pub mod movie_person;
pub mod person;
pub mod role;
