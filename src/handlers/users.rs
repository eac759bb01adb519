use actix_web::{http::StatusCode, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::binder::Valid;
use crate::error::{ApiResult, HttpError};
use crate::validation::{Described, FieldDescriptor, TagFormat};

/// Address already held by an existing account.
const RESERVED_EMAIL: &str = "admin@example.com";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(range(min = 13, max = 150))]
    pub age: u32,
}

impl Described for NewUser {
    fn fields() -> &'static [FieldDescriptor] {
        const FIELDS: &[FieldDescriptor] = &[
            FieldDescriptor::new("name").tags(&[
                (TagFormat::Json, "name"),
                (TagFormat::Form, "name"),
                (TagFormat::Xml, "name"),
            ]),
            FieldDescriptor::new("email")
                .tags(&[(TagFormat::Json, "email"), (TagFormat::Xml, "email")])
                .message("must be a valid email address"),
            FieldDescriptor::new("age")
                .tags(&[(TagFormat::Json, "age"), (TagFormat::Xml, "age")])
                .message("must be between 13 and 150"),
        ];
        FIELDS
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserQuery {
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub per_page: Option<u32>,
    #[validate(length(min = 1))]
    pub name: Option<String>,
}

impl Described for UserQuery {
    fn fields() -> &'static [FieldDescriptor] {
        const FIELDS: &[FieldDescriptor] = &[
            FieldDescriptor::new("page").tags(&[(TagFormat::Query, "page")]),
            FieldDescriptor::new("per_page")
                .tags(&[(TagFormat::Query, "per_page")])
                .message("must be between 1 and 100"),
            FieldDescriptor::new("name").tags(&[(TagFormat::Query, "name")]),
        ];
        FIELDS
    }
}

/// `POST /api/v1/users`: echoes the accepted user back with 201.
pub async fn create_user(user: Valid<NewUser>) -> ApiResult<HttpResponse> {
    let user = user.into_inner();
    if user.email.eq_ignore_ascii_case(RESERVED_EMAIL) {
        return Err(HttpError::new(StatusCode::CONFLICT, "email already registered").into());
    }

    Ok(HttpResponse::Created().json(json!({
        "user": user,
        "created_at": chrono::Utc::now().to_rfc3339(),
    })))
}

/// `GET /api/v1/users`: nothing is stored, so the page is always empty.
pub async fn list_users(query: Valid<UserQuery>) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "users": [],
        "page": query.page.unwrap_or(1),
        "per_page": query.per_page.unwrap_or(20),
        "name": query.name,
    })))
}
