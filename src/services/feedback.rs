//! Customer feedback service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{feedback::CreateFeedback, Feedback, RentalStatus, UserClaims},
    repository::Repository,
};

#[derive(Clone)]
pub struct FeedbackService {
    repository: Repository,
}

impl FeedbackService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Rate a completed rental, once
    pub async fn create(&self, caller: &UserClaims, feedback: CreateFeedback) -> AppResult<Feedback> {
        feedback.validate()?;

        let rental = self.repository.rentals.get_by_id(feedback.rental_id).await?;
        if rental.user_id != caller.user_id {
            return Err(AppError::Authorization("Only the renter can rate this rental".to_string()));
        }
        if rental.status != RentalStatus::Completed {
            return Err(AppError::InvalidState("Only completed rentals can be rated".to_string()));
        }
        if self.repository.feedback.exists_for_rental(rental.id).await? {
            return Err(AppError::Conflict("Feedback already submitted for this rental".to_string()));
        }

        let created = self
            .repository
            .feedback
            .insert(caller.user_id, rental.vehicle_id, &feedback)
            .await?;
        tracing::info!(rental_id = rental.id, rating = created.rating, "Feedback received");
        Ok(created)
    }
}
