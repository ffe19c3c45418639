//! Domain layer - Core entities of the calendar/to-do application
//!
//! These types know nothing about how they are stored. Each entity has a
//! `New*` type carrying creation input and a `*Changes` type carrying a
//! partial update.

pub mod category;
pub mod entity;
pub mod todo;
pub mod user;

pub use category::{Category, CategoryChanges, NewCategory};
pub use entity::Entity;
pub use todo::{NewTodo, Todo, TodoChanges};
pub use user::{normalize_email, NewUser, RegisterUser, User, UserChanges, UserResponse};
