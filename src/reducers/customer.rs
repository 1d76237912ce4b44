use serde::{Deserialize, Serialize};

use super::{Profile, Reducer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    /// Price in paise.
    pub unit_price: u64,
    pub quantity: u32,
}

impl CartItem {
    pub fn subtotal(&self) -> u64 {
        self.unit_price.saturating_mul(u64::from(self.quantity))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerState {
    pub is_authenticated: bool,
    pub loading: bool,
    pub user: Option<Profile>,
    pub error: Option<String>,
    pub cart: Vec<CartItem>,
}

impl CustomerState {
    pub fn cart_total(&self) -> u64 {
        self.cart
            .iter()
            .fold(0u64, |total, item| total.saturating_add(item.subtotal()))
    }

    pub fn cart_quantity(&self) -> u32 {
        self.cart
            .iter()
            .fold(0u32, |count, item| count.saturating_add(item.quantity))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum CustomerAction {
    LoadUserRequest,
    LoadUserSuccess(Profile),
    LoadUserFail(String),
    Logout,
    /// Replaces the line with the same product, otherwise appends.
    AddToCart(CartItem),
    RemoveFromCart { product_id: String },
    ClearCart,
}

impl Reducer for CustomerState {
    type Action = CustomerAction;

    fn reduce(mut self, action: CustomerAction) -> Self {
        match action {
            CustomerAction::LoadUserRequest => {
                self.loading = true;
            }
            CustomerAction::LoadUserSuccess(user) => {
                self.loading = false;
                self.is_authenticated = true;
                self.user = Some(user);
                self.error = None;
            }
            CustomerAction::LoadUserFail(error) => {
                self.loading = false;
                self.is_authenticated = false;
                self.user = None;
                self.error = Some(error);
            }
            // the cart belongs to the browser, not the account
            CustomerAction::Logout => {
                self.loading = false;
                self.is_authenticated = false;
                self.user = None;
                self.error = None;
            }
            CustomerAction::AddToCart(item) => {
                match self
                    .cart
                    .iter_mut()
                    .find(|existing| existing.product_id == item.product_id)
                {
                    Some(existing) => *existing = item,
                    None => self.cart.push(item),
                }
            }
            CustomerAction::RemoveFromCart { product_id } => {
                self.cart.retain(|item| item.product_id != product_id);
            }
            CustomerAction::ClearCart => self.cart.clear(),
        }
        self
    }
}
