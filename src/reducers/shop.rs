use serde::{Deserialize, Serialize};

use super::{Profile, Reducer};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopState {
    pub is_seller: bool,
    pub loading: bool,
    pub seller: Option<Profile>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ShopAction {
    LoadSellerRequest,
    LoadSellerSuccess(Profile),
    LoadSellerFail(String),
    Logout,
}

impl Reducer for ShopState {
    type Action = ShopAction;

    fn reduce(self, action: ShopAction) -> Self {
        match action {
            ShopAction::LoadSellerRequest => Self {
                loading: true,
                ..self
            },
            ShopAction::LoadSellerSuccess(seller) => Self {
                is_seller: true,
                loading: false,
                seller: Some(seller),
                error: None,
            },
            ShopAction::LoadSellerFail(error) => Self {
                is_seller: false,
                loading: false,
                seller: None,
                error: Some(error),
            },
            ShopAction::Logout => Self::default(),
        }
    }
}
