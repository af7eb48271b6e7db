//! Rating service and the average-rating maintainer.

use common::{ProductId, RatingId, UserId};
use serde::Serialize;
use store::{CatalogStore, NewRating, Rating, RatingStore, RatingUpdate, StoreError};

use super::{RatingError, average_rating, validate_score};
use crate::error::DomainError;
use crate::locks::KeyedLocks;
use crate::validation::normalize_review;

/// A rating after a mutation, with the product average it produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingOutcome {
    pub rating: Rating,
    pub average_rating: f64,
}

/// Service for rating writes.
///
/// Every write recomputes the product's average from its moderated ratings.
/// Writes to the same product are serialized in-process so two recomputes
/// cannot interleave their read and write.
pub struct RatingService<S> {
    store: S,
    locks: KeyedLocks<ProductId>,
}

impl<S> RatingService<S>
where
    S: RatingStore + CatalogStore,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
        }
    }

    /// Submits a user's rating of a product. New ratings start unmoderated.
    #[tracing::instrument(skip(self, review))]
    pub async fn submit(
        &self,
        product_id: ProductId,
        user_id: UserId,
        score: i64,
        review: Option<String>,
    ) -> Result<RatingOutcome, DomainError> {
        let score = validate_score(score)?;
        let review = normalize_review(review)?;

        if self.store.get_product(product_id).await?.is_none() {
            return Err(RatingError::ProductNotFound(product_id).into());
        }

        let _guard = self.locks.lock(product_id).await;

        if self.store.find_rating(product_id, user_id).await?.is_some() {
            return Err(RatingError::AlreadyRated {
                product_id,
                user_id,
            }
            .into());
        }

        let rating = self
            .store
            .insert_rating(NewRating {
                product_id,
                user_id,
                rating: score,
                review,
            })
            .await
            .map_err(|e| -> DomainError {
                if e.is_unique_violation() {
                    RatingError::AlreadyRated {
                        product_id,
                        user_id,
                    }
                    .into()
                } else {
                    e.into()
                }
            })?;

        let average_rating = self.recompute_locked(product_id).await?;
        tracing::info!(rating_id = %rating.id, %product_id, "rating submitted");

        Ok(RatingOutcome {
            rating,
            average_rating,
        })
    }

    /// Replaces the score and review of the caller's own rating.
    ///
    /// The rating goes back to unmoderated and drops out of the average
    /// until it is approved again.
    #[tracing::instrument(skip(self, review))]
    pub async fn edit(
        &self,
        rating_id: RatingId,
        caller: UserId,
        score: i64,
        review: Option<String>,
    ) -> Result<RatingOutcome, DomainError> {
        let score = validate_score(score)?;
        let review = normalize_review(review)?;

        let existing = self.existing(rating_id).await?;
        if existing.user_id != caller {
            return Err(RatingError::Forbidden { rating_id }.into());
        }

        let _guard = self.locks.lock(existing.product_id).await;
        let rating = self
            .store
            .update_rating(
                rating_id,
                RatingUpdate {
                    rating: score,
                    review,
                    moderated: false,
                },
            )
            .await
            .map_err(|e| not_found_as(e, rating_id))?;

        let average_rating = self.recompute_locked(rating.product_id).await?;
        Ok(RatingOutcome {
            rating,
            average_rating,
        })
    }

    /// Sets the moderation flag of any rating.
    ///
    /// Only the flag is written, so an edit that lands while the moderation
    /// is in flight keeps its score and review.
    #[tracing::instrument(skip(self))]
    pub async fn moderate(
        &self,
        rating_id: RatingId,
        moderated: bool,
    ) -> Result<RatingOutcome, DomainError> {
        let product_id = self.existing(rating_id).await?.product_id;

        let _guard = self.locks.lock(product_id).await;
        let rating = self
            .store
            .set_moderated(rating_id, moderated)
            .await
            .map_err(|e| not_found_as(e, rating_id))?;

        let average_rating = self.recompute_locked(rating.product_id).await?;
        tracing::info!(%rating_id, moderated, average_rating, "rating moderated");

        Ok(RatingOutcome {
            rating,
            average_rating,
        })
    }

    /// Deletes any rating and returns the product's new average.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, rating_id: RatingId) -> Result<f64, DomainError> {
        let existing = self.existing(rating_id).await?;
        self.remove(existing).await
    }

    /// Deletes the caller's own rating and returns the product's new average.
    #[tracing::instrument(skip(self))]
    pub async fn delete_own(&self, rating_id: RatingId, caller: UserId) -> Result<f64, DomainError> {
        let existing = self.existing(rating_id).await?;
        if existing.user_id != caller {
            return Err(RatingError::Forbidden { rating_id }.into());
        }
        self.remove(existing).await
    }

    /// Lists a product's ratings, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
        include_unmoderated: bool,
    ) -> Result<Vec<Rating>, DomainError> {
        if self.store.get_product(product_id).await?.is_none() {
            return Err(RatingError::ProductNotFound(product_id).into());
        }
        Ok(self
            .store
            .list_ratings(product_id, !include_unmoderated)
            .await?)
    }

    /// Recomputes and stores a product's average rating.
    #[tracing::instrument(skip(self))]
    pub async fn recompute_average(&self, product_id: ProductId) -> Result<f64, DomainError> {
        let _guard = self.locks.lock(product_id).await;
        self.recompute_locked(product_id).await
    }

    async fn existing(&self, rating_id: RatingId) -> Result<Rating, DomainError> {
        self.store
            .get_rating(rating_id)
            .await?
            .ok_or_else(|| RatingError::NotFound(rating_id).into())
    }

    async fn remove(&self, rating: Rating) -> Result<f64, DomainError> {
        let _guard = self.locks.lock(rating.product_id).await;
        if !self.store.delete_rating(rating.id).await? {
            return Err(RatingError::NotFound(rating.id).into());
        }
        let average = self.recompute_locked(rating.product_id).await?;
        tracing::info!(rating_id = %rating.id, product_id = %rating.product_id, average, "rating deleted");
        Ok(average)
    }

    // Caller holds the product lock.
    async fn recompute_locked(&self, product_id: ProductId) -> Result<f64, DomainError> {
        let scores = self.store.moderated_scores(product_id).await?;
        let average = average_rating(&scores);
        self.store.set_average_rating(product_id, average).await?;

        metrics::counter!("rating_recomputes_total").increment(1);
        tracing::debug!(
            %product_id,
            moderated = scores.len(),
            average,
            "average rating recomputed"
        );
        Ok(average)
    }
}

// A rating deleted between lookup and write reads as a missing rating.
fn not_found_as(error: StoreError, rating_id: RatingId) -> DomainError {
    match error {
        StoreError::NotFound { .. } => RatingError::NotFound(rating_id).into(),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use store::{FailPoint, InMemoryStore};

    use crate::validation::ValidationError;

    async fn setup() -> (RatingService<InMemoryStore>, InMemoryStore, ProductId) {
        let store = InMemoryStore::new();
        let product = store
            .insert_product("Widget", Money::from_cents(2000))
            .await
            .unwrap();
        (RatingService::new(store.clone()), store, product.id)
    }

    async fn stored_average(store: &InMemoryStore, product_id: ProductId) -> f64 {
        store
            .get_product(product_id)
            .await
            .unwrap()
            .unwrap()
            .average_rating
    }

    #[tokio::test]
    async fn test_new_rating_is_unmoderated_and_excluded() {
        let (service, store, product_id) = setup().await;

        let outcome = service
            .submit(product_id, UserId::new(), 5, Some("great".to_string()))
            .await
            .unwrap();

        assert!(!outcome.rating.moderated);
        assert_eq!(outcome.average_rating, 0.0);
        assert_eq!(stored_average(&store, product_id).await, 0.0);
    }

    #[tokio::test]
    async fn test_score_out_of_range_is_rejected() {
        let (service, _, product_id) = setup().await;

        for score in [0, 6, -1] {
            let result = service.submit(product_id, UserId::new(), score, None).await;
            assert!(matches!(
                result,
                Err(DomainError::Rating(RatingError::InvalidRating(s))) if s == score
            ));
        }
    }

    #[tokio::test]
    async fn test_long_review_is_rejected() {
        let (service, _, product_id) = setup().await;

        let result = service
            .submit(product_id, UserId::new(), 4, Some("x".repeat(501)))
            .await;

        assert!(matches!(
            result,
            Err(DomainError::Validation(ValidationError::ReviewTooLong { .. }))
        ));
    }

    #[tokio::test]
    async fn test_second_rating_by_same_user_is_rejected() {
        let (service, _, product_id) = setup().await;
        let user = UserId::new();

        service.submit(product_id, user, 4, None).await.unwrap();
        let result = service.submit(product_id, user, 2, None).await;

        assert!(matches!(
            result,
            Err(DomainError::Rating(RatingError::AlreadyRated { .. }))
        ));
    }

    #[tokio::test]
    async fn test_rating_unknown_product_is_rejected() {
        let (service, _, _) = setup().await;

        let result = service.submit(ProductId::new(), UserId::new(), 3, None).await;

        assert!(matches!(
            result,
            Err(DomainError::Rating(RatingError::ProductNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_moderation_updates_average() {
        let (service, store, product_id) = setup().await;
        let a = service.submit(product_id, UserId::new(), 5, None).await.unwrap();
        let b = service.submit(product_id, UserId::new(), 2, None).await.unwrap();

        service.moderate(a.rating.id, true).await.unwrap();
        let outcome = service.moderate(b.rating.id, true).await.unwrap();

        assert_eq!(outcome.average_rating, 3.5);
        assert_eq!(stored_average(&store, product_id).await, 3.5);
    }

    #[tokio::test]
    async fn test_edit_resets_moderation() {
        let (service, store, product_id) = setup().await;
        let user = UserId::new();
        let submitted = service.submit(product_id, user, 5, None).await.unwrap();
        service.moderate(submitted.rating.id, true).await.unwrap();
        assert_eq!(stored_average(&store, product_id).await, 5.0);

        let edited = service
            .edit(submitted.rating.id, user, 1, Some("changed my mind".to_string()))
            .await
            .unwrap();

        assert!(!edited.rating.moderated);
        assert_eq!(edited.rating.rating, 1);
        assert_eq!(edited.average_rating, 0.0);
    }

    #[tokio::test]
    async fn test_only_owner_can_edit_or_delete_own() {
        let (service, _, product_id) = setup().await;
        let submitted = service.submit(product_id, UserId::new(), 3, None).await.unwrap();
        let stranger = UserId::new();

        assert!(matches!(
            service.edit(submitted.rating.id, stranger, 4, None).await,
            Err(DomainError::Rating(RatingError::Forbidden { .. }))
        ));
        assert!(matches!(
            service.delete_own(submitted.rating.id, stranger).await,
            Err(DomainError::Rating(RatingError::Forbidden { .. }))
        ));
    }

    #[tokio::test]
    async fn test_admin_delete_recomputes() {
        let (service, _, product_id) = setup().await;
        let a = service.submit(product_id, UserId::new(), 5, None).await.unwrap();
        let b = service.submit(product_id, UserId::new(), 3, None).await.unwrap();
        service.moderate(a.rating.id, true).await.unwrap();
        service.moderate(b.rating.id, true).await.unwrap();

        let average = service.delete(a.rating.id).await.unwrap();

        assert_eq!(average, 3.0);
        assert!(matches!(
            service.delete(a.rating.id).await,
            Err(DomainError::Rating(RatingError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_failed_recompute_leaves_average_untouched() {
        let (service, store, product_id) = setup().await;
        let a = service.submit(product_id, UserId::new(), 4, None).await.unwrap();
        service.moderate(a.rating.id, true).await.unwrap();
        let b = service.submit(product_id, UserId::new(), 2, None).await.unwrap();

        store.fail_on(FailPoint::ModeratedScores).await;
        let result = service.moderate(b.rating.id, true).await;

        assert!(matches!(result, Err(DomainError::Store(_))));
        assert_eq!(stored_average(&store, product_id).await, 4.0);

        store.clear_failure(FailPoint::ModeratedScores).await;
        assert_eq!(service.recompute_average(product_id).await.unwrap(), 3.0);
    }

    #[tokio::test]
    async fn test_listing_hides_unmoderated_by_default() {
        let (service, _, product_id) = setup().await;
        let a = service.submit(product_id, UserId::new(), 5, None).await.unwrap();
        service.submit(product_id, UserId::new(), 1, None).await.unwrap();
        service.moderate(a.rating.id, true).await.unwrap();

        assert_eq!(service.list_for_product(product_id, false).await.unwrap().len(), 1);
        assert_eq!(service.list_for_product(product_id, true).await.unwrap().len(), 2);
    }
}
