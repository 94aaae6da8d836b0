use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use time::Date;

use crate::estimator::EstimatorError;
use crate::nutrition::parser::ParseError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("nothing to save: the input is empty")]
    EmptyInput,
    #[error("could not parse entry: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Estimator(#[from] EstimatorError),
    #[error("no entry for {0}")]
    NotFound(Date),
    #[error("something went wrong: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    message: String,
    status: u16,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::EmptyInput => StatusCode::BAD_REQUEST,
            AppError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Estimator(EstimatorError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Estimator(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let code = self.status_code();
        let body = Json(ErrorBody {
            ok: false,
            message: self.to_string(),
            status: code.as_u16(),
        });
        (code, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{err:#}"))
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn errors_map_to_status_codes() {
        assert_eq!(AppError::EmptyInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Parse(ParseError::NotAMapping).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::from(EstimatorError::NotConfigured).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::from(EstimatorError::EmptyReply).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::NotFound(date!(2024 - 01 - 01)).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn parse_error_message_names_the_field() {
        let err = AppError::from(ParseError::InvalidNumber {
            field: "Calories",
            value: "lots".into(),
        });
        assert_eq!(
            err.to_string(),
            "could not parse entry: Calories has a non-numeric value `lots`"
        );
    }

    #[test]
    fn response_carries_status() {
        let res = AppError::EmptyInput.into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
