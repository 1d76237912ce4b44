//! Client state for each role as closed action sets and pure transitions.
//!
//! ```rust
//! use bazaar::reducers::{CustomerAction, CustomerState, Profile, Reducer};
//!
//! let state = CustomerState::default().reduce_all([
//!     CustomerAction::LoadUserRequest,
//!     CustomerAction::LoadUserSuccess(Profile::new("u-1", "Asha", "asha@example.com")),
//! ]);
//! assert!(state.is_authenticated);
//! ```

mod admin;
mod customer;
mod shop;

pub use admin::{AdminAction, AdminState};
pub use customer::{CartItem, CustomerAction, CustomerState};
use serde::{Deserialize, Serialize};
pub use shop::{ShopAction, ShopState};

/// A state that evolves only through its own action type.
pub trait Reducer: Sized {
    type Action;

    fn reduce(self, action: Self::Action) -> Self;

    fn reduce_all<I>(self, actions: I) -> Self
    where
        I: IntoIterator<Item = Self::Action>,
    {
        actions.into_iter().fold(self, Self::reduce)
    }
}

/// The account shown for an authenticated customer, shop or admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl Profile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
        }
    }
}
