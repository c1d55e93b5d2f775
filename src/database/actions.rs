mod cart;
mod ingredients;
mod lists;
mod recipes;
mod subscriptions;
mod tags;
mod users;

#[cfg(test)]
mod fixtures;

pub use cart::*;
pub use ingredients::*;
pub use lists::*;
pub use recipes::*;
pub use subscriptions::*;
pub use tags::*;
pub use users::*;
