//! Built-in resource kinds.

pub mod blog_post;
pub mod page;
pub mod user;

pub use blog_post::BlogPost;
pub use page::Page;
pub use user::User;
