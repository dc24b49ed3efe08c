use serde::{Deserialize, Serialize};

use crate::account::Rating;
use crate::error::{DispatchError, DispatchResult};
use crate::ride::{Actor, RideId, RideStatus, UserId};

use super::LifecycleCoordinator;

pub const MIN_STARS: u8 = 1;
pub const MAX_STARS: u8 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRequest {
    pub ride_id: RideId,
    pub stars: u8,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingSummary {
    pub user_id: UserId,
    pub count: usize,
    /// Mean stars, `None` until the first rating arrives.
    pub average: Option<f64>,
    pub ratings: Vec<Rating>,
}

impl LifecycleCoordinator {
    /// Rate the other party of a completed ride. One rating per author per ride.
    pub fn submit_rating(&self, actor: &Actor, request: RatingRequest) -> DispatchResult<Rating> {
        if !(MIN_STARS..=MAX_STARS).contains(&request.stars) {
            return Err(DispatchError::invalid_input(format!(
                "stars must be between {MIN_STARS} and {MAX_STARS}"
            )));
        }
        let ride = self
            .accounts
            .history(&actor.user_id)?
            .into_iter()
            .find(|ride| ride.id == request.ride_id && ride.status == RideStatus::Completed)
            .ok_or_else(|| DispatchError::ride_not_found(request.ride_id))?;
        let to = ride.counterpart_of(&actor.user_id).cloned().ok_or_else(|| {
            DispatchError::not_authorized(format!(
                "{} is not a party to ride {}",
                actor.user_id, ride.id
            ))
        })?;

        let rating = Rating {
            ride_id: ride.id,
            from: actor.user_id.clone(),
            to,
            stars: request.stars,
            feedback: request
                .feedback
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
            created_at: self.clock.now(),
        };
        self.accounts.add_rating(rating.clone())?;
        tracing::info!(ride_id = %rating.ride_id, from = %rating.from, to = %rating.to, stars = rating.stars, "rating recorded");
        Ok(rating)
    }

    pub fn ratings_for(&self, user_id: &UserId) -> DispatchResult<RatingSummary> {
        let ratings = self.accounts.ratings_for(user_id)?;
        let average = (!ratings.is_empty()).then(|| {
            let total: u32 = ratings.iter().map(|rating| u32::from(rating.stars)).sum();
            f64::from(total) / ratings.len() as f64
        });
        Ok(RatingSummary {
            user_id: user_id.clone(),
            count: ratings.len(),
            average,
            ratings,
        })
    }

    pub fn ratings_by(&self, user_id: &UserId) -> DispatchResult<Vec<Rating>> {
        self.accounts.ratings_by(user_id)
    }
}
