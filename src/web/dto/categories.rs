use serde::Deserialize;
use validator::Validate;

use crate::model::entity::CategoryCreate;

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct CategoryBody {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

impl From<CategoryBody> for CategoryCreate {
    fn from(body: CategoryBody) -> Self {
        Self {
            name: body.name.trim().to_string(),
        }
    }
}
