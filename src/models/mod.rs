pub mod comment;
pub mod errors;
pub mod foto;
pub mod messages;
pub mod rating;
pub mod tag;
pub mod transform;
pub mod user;
