use thiserror::Error;

/// Quick-add input rejected before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Meal name must not be empty")]
    EmptyName,
    #[error("Enter at least one of calories, protein, carbs or fat")]
    NoNutrition,
}

/// Failure talking to the remote meal store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Failed to reach meal store: {0}")]
    Transport(String),
    #[error("Meal store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Failed to decode meal store response: {0}")]
    Decode(String),
    #[error("Meal store is unavailable")]
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MealLogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("Meal log session has been closed")]
    SessionClosed,
}
