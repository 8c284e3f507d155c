use crate::error::ApiResult;
use crate::gateway::{Gateway, RequestOptions};
use crate::models::{LoginRequest, LoginResponse, RegisterRequest, UserProfile};

/// `/auth/*` session lifecycle endpoints.
#[derive(Clone)]
pub struct AuthApi {
    gateway: Gateway,
}

impl AuthApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub async fn login(&self, request: &LoginRequest) -> ApiResult<LoginResponse> {
        self.gateway
            .request_json("/auth/login", RequestOptions::post().json(request)?)
            .await
    }

    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<()> {
        self.gateway
            .request_unit("/auth/register", RequestOptions::post().json(request)?)
            .await
    }

    pub async fn logout(&self) -> ApiResult<()> {
        self.gateway
            .request_unit("/auth/logout", RequestOptions::post())
            .await
    }

    pub async fn me(&self) -> ApiResult<UserProfile> {
        self.gateway.get_json("/auth/me").await
    }
}
