use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use marketplace_payment_engine::{CheckoutError, MerchantAccountError, WebhookError};
use stripe_tools::WebhookSignatureError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("{0}")]
    GatewayError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Missing required query parameter: {0}")]
    MissingQueryParameter(&'static str),
    #[error("{0}")]
    PreconditionFailed(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Webhook signature verification failed. {0}")]
    InvalidWebhookSignature(#[from] WebhookSignatureError),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::GatewayError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::MissingField(_) => StatusCode::BAD_REQUEST,
            Self::MissingQueryParameter(_) => StatusCode::BAD_REQUEST,
            Self::PreconditionFailed(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::InvalidWebhookSignature(_) => StatusCode::BAD_REQUEST,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<CheckoutError> for ServerError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::CartNotFound(_) => Self::NoRecordFound(e.to_string()),
            CheckoutError::Unauthorized(_) => Self::InsufficientPermissions(e.to_string()),
            CheckoutError::CartAlreadyCompleted(_) |
            CheckoutError::SellerNotOnboarded(_) |
            CheckoutError::PaymentNotSucceeded { .. } |
            CheckoutError::CartMismatch { .. } => Self::PreconditionFailed(e.to_string()),
            CheckoutError::GatewayError(e) => Self::GatewayError(e.to_string()),
            CheckoutError::DatabaseError(e) => Self::BackendError(e),
        }
    }
}

impl From<MerchantAccountError> for ServerError {
    fn from(e: MerchantAccountError) -> Self {
        match e {
            MerchantAccountError::UserNotFound(_) | MerchantAccountError::NotASeller(_) => {
                Self::NoRecordFound(e.to_string())
            },
            MerchantAccountError::GatewayError(e) => Self::GatewayError(e.to_string()),
            MerchantAccountError::DatabaseError(e) => Self::BackendError(e),
        }
    }
}

impl From<WebhookError> for ServerError {
    fn from(e: WebhookError) -> Self {
        Self::BackendError(e.to_string())
    }
}
