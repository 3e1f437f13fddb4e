use std::sync::Arc;

use crate::decision_engine::{map_decision, DecisionEngineClient};
use crate::errors::AppError;
use crate::models::{
    sanitize_profile, ApplicationRequest, AuthenticatedUser, DecisionResult, LoanTerms,
    ProfileDefaults,
};
use crate::profile_store::ProfileLookup;

/// Runs one credit analysis: profile lookup, defaulting, engine call, mapping.
///
/// Holds no per-request state; concurrent calls are independent.
#[derive(Clone)]
pub struct DecisionOrchestrator {
    profiles: ProfileLookup,
    engine: DecisionEngineClient,
    defaults: Arc<ProfileDefaults>,
}

impl DecisionOrchestrator {
    pub fn new(
        profiles: ProfileLookup,
        engine: DecisionEngineClient,
        defaults: Arc<ProfileDefaults>,
    ) -> Self {
        Self {
            profiles,
            engine,
            defaults,
        }
    }

    /// Analyzes a loan request for `user`.
    ///
    /// # Arguments
    ///
    /// * `amount` - Loan amount as text.
    /// * `term` - Loan term in months as text.
    /// * `user` - The caller; a non-empty uid is required.
    ///
    /// # Returns
    ///
    /// * `Result<DecisionResult, AppError>` - The mapped decision, or the first failure.
    pub async fn analyze(
        &self,
        amount: &str,
        term: &str,
        user: &AuthenticatedUser,
    ) -> Result<DecisionResult, AppError> {
        let uid = user
            .uid
            .as_deref()
            .filter(|uid| !uid.trim().is_empty())
            .ok_or(AppError::MissingIdentifier)?;

        let loan = LoanTerms::parse(amount, term)?;

        tracing::info!(
            "Credit analysis for uid {}: amount={}, term={}",
            uid,
            loan.amount,
            loan.term_months
        );

        let stored = self
            .profiles
            .fetch(uid)
            .await?
            .ok_or_else(|| AppError::ProfileNotFound(uid.to_string()))?;

        let sanitized = sanitize_profile(stored, &self.defaults);
        let application = ApplicationRequest::new(sanitized, loan);

        let raw = self.engine.submit(&application).await?;
        let result = map_decision(&raw, application.loan_amount());

        tracing::info!(
            "Credit decision for uid {}: {} (score {})",
            uid,
            result.decision,
            result.credit_score
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile_store::InMemoryProfileStore;

    fn orchestrator_without_engine(store: InMemoryProfileStore) -> DecisionOrchestrator {
        // Port 9 (discard) is never reached by these tests
        let engine = DecisionEngineClient::new("http://127.0.0.1:9/decide".to_string(), None)
            .unwrap();
        DecisionOrchestrator::new(
            ProfileLookup::new(Arc::new(store)),
            engine,
            Arc::new(ProfileDefaults::default()),
        )
    }

    #[tokio::test]
    async fn test_missing_uid_fails_before_io() {
        let orchestrator = orchestrator_without_engine(InMemoryProfileStore::new());

        let no_uid = AuthenticatedUser::default();
        let err = orchestrator.analyze("15000", "12", &no_uid).await.unwrap_err();
        assert!(matches!(err, AppError::MissingIdentifier));

        let blank_uid = AuthenticatedUser {
            uid: Some("  ".to_string()),
            email: None,
        };
        let err = orchestrator
            .analyze("15000", "12", &blank_uid)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingIdentifier));
    }

    #[tokio::test]
    async fn test_malformed_amount_rejected() {
        let orchestrator = orchestrator_without_engine(InMemoryProfileStore::new());
        let user = AuthenticatedUser {
            uid: Some("u1".to_string()),
            email: None,
        };

        let err = orchestrator.analyze("lots", "12", &user).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidLoanParameters(_)));
    }

    #[tokio::test]
    async fn test_profile_not_found() {
        let orchestrator = orchestrator_without_engine(InMemoryProfileStore::new());
        let user = AuthenticatedUser {
            uid: Some("u1".to_string()),
            email: Some("u1@example.com".to_string()),
        };

        let err = orchestrator.analyze("15000", "12", &user).await.unwrap_err();
        assert!(matches!(err, AppError::ProfileNotFound(ref uid) if uid == "u1"));
    }
}
