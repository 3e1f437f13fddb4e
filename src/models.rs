use serde::{de, Deserialize, Deserializer, Serialize};

use crate::errors::AppError;

// ============ Profile Models ============

/// Applicant attributes as stored in the profile store.
///
/// Every attribute except the two loan fields may be missing from a stored
/// record; those stay `None` until [`sanitize_profile`] fills them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Age in years.
    #[serde(
        default,
        deserialize_with = "optional_whole_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub age: Option<i64>,
    /// Primary income.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<f64>,
    /// Secondary income.
    #[serde(
        default,
        rename = "additionalIncome",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_income: Option<f64>,
    /// e.g. "Özel Sektör" / "Kamu".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<String>,
    /// e.g. "özel" / "kamu".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    /// e.g. "owner" / "ev sahibi".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_ownership: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_segment: Option<String>,
    /// Past defaults on any loan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaulted_loans: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_issues: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_insurance: Option<bool>,
    /// e.g. "stable" / "istikrarlı".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_stability: Option<String>,
    /// Years of work experience.
    #[serde(
        default,
        deserialize_with = "optional_whole_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub experience: Option<i64>,
    /// Requested loan amount. Stored records may omit it or hold null; the
    /// caller's value always replaces it before submission.
    #[serde(default, deserialize_with = "null_as_default")]
    pub loan_amount: f64,
    /// Requested term in months.
    #[serde(default, deserialize_with = "whole_number_or_zero")]
    pub loan_term_months: i64,
}

/// Treats an explicit JSON null like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts integers and integral floats such as `5.0`.
fn optional_whole_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f64>::deserialize(deserializer)? {
        None => Ok(None),
        Some(v) if v.is_finite() && v.fract() == 0.0 => Ok(Some(v as i64)),
        Some(v) => Err(de::Error::custom(format!(
            "expected a whole number, got {}",
            v
        ))),
    }
}

fn whole_number_or_zero<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_whole_number(deserializer)?.unwrap_or_default())
}

/// Fallback values for every optional [`UserProfile`] attribute.
///
/// Loaded once at startup and passed explicitly to [`sanitize_profile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDefaults {
    pub age: i64,
    pub salary: f64,
    #[serde(rename = "additionalIncome")]
    pub additional_income: f64,
    pub employment_type: String,
    pub sector: String,
    pub home_ownership: String,
    pub customer_segment: String,
    pub defaulted_loans: bool,
    pub legal_issues: bool,
    pub has_insurance: bool,
    pub job_stability: String,
    pub experience: i64,
}

impl Default for ProfileDefaults {
    fn default() -> Self {
        Self {
            age: 29,
            salary: 10000.0,
            additional_income: 2000.0,
            employment_type: "Özel Sektör".to_string(),
            sector: "özel".to_string(),
            home_ownership: "owner".to_string(),
            customer_segment: "mass".to_string(),
            defaulted_loans: false,
            legal_issues: false,
            has_insurance: true,
            job_stability: "stable".to_string(),
            experience: 5,
        }
    }
}

/// Fills every absent optional attribute from `defaults`.
///
/// Present values are kept as-is, including explicit `false` and zero.
pub fn sanitize_profile(profile: UserProfile, defaults: &ProfileDefaults) -> UserProfile {
    UserProfile {
        age: profile.age.or(Some(defaults.age)),
        salary: profile.salary.or(Some(defaults.salary)),
        additional_income: profile
            .additional_income
            .or(Some(defaults.additional_income)),
        employment_type: profile
            .employment_type
            .or_else(|| Some(defaults.employment_type.clone())),
        sector: profile.sector.or_else(|| Some(defaults.sector.clone())),
        home_ownership: profile
            .home_ownership
            .or_else(|| Some(defaults.home_ownership.clone())),
        customer_segment: profile
            .customer_segment
            .or_else(|| Some(defaults.customer_segment.clone())),
        defaulted_loans: profile.defaulted_loans.or(Some(defaults.defaulted_loans)),
        legal_issues: profile.legal_issues.or(Some(defaults.legal_issues)),
        has_insurance: profile.has_insurance.or(Some(defaults.has_insurance)),
        job_stability: profile
            .job_stability
            .or_else(|| Some(defaults.job_stability.clone())),
        experience: profile.experience.or(Some(defaults.experience)),
        loan_amount: profile.loan_amount,
        loan_term_months: profile.loan_term_months,
    }
}

impl UserProfile {
    /// True when no optional attribute is missing.
    pub fn is_complete(&self) -> bool {
        self.age.is_some()
            && self.salary.is_some()
            && self.additional_income.is_some()
            && self.employment_type.is_some()
            && self.sector.is_some()
            && self.home_ownership.is_some()
            && self.customer_segment.is_some()
            && self.defaulted_loans.is_some()
            && self.legal_issues.is_some()
            && self.has_insurance.is_some()
            && self.job_stability.is_some()
            && self.experience.is_some()
    }
}

// ============ Request Models ============

/// Caller identity. Only the uid is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Body of `POST /api/v1/credit/analyze`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeCreditRequest {
    /// Decimal amount as text, e.g. "15000".
    pub amount: String,
    /// Whole number of months as text, e.g. "12".
    pub term: String,
    /// Missing and `null` both mean an anonymous caller.
    #[serde(default, deserialize_with = "null_as_default")]
    pub user: AuthenticatedUser,
}

/// Parsed loan amount and term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanTerms {
    pub amount: f64,
    pub term_months: i64,
}

impl LoanTerms {
    /// Parses the textual amount and term supplied by the caller.
    ///
    /// The amount must be a finite decimal and the term a whole number.
    pub fn parse(amount: &str, term: &str) -> Result<Self, AppError> {
        let amount_value = amount
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                AppError::InvalidLoanParameters(format!("amount '{}' is not a number", amount))
            })?;
        let term_months = term.trim().parse::<i64>().map_err(|_| {
            AppError::InvalidLoanParameters(format!("term '{}' is not a whole number", term))
        })?;

        Ok(Self {
            amount: amount_value,
            term_months,
        })
    }
}

/// Flat JSON document posted to the decision engine: the sanitized profile
/// with the caller's loan amount and term.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ApplicationRequest(UserProfile);

impl ApplicationRequest {
    pub fn new(sanitized: UserProfile, loan: LoanTerms) -> Self {
        Self(UserProfile {
            loan_amount: loan.amount,
            loan_term_months: loan.term_months,
            ..sanitized
        })
    }

    pub fn loan_amount(&self) -> f64 {
        self.0.loan_amount
    }
}

// ============ Result Models ============

pub const APPROVED_LABEL: &str = "ONAYLANDI";
pub const REJECTED_LABEL: &str = "REDDEDİLDİ";

/// UI-facing outcome of a credit analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    /// [`APPROVED_LABEL`] or [`REJECTED_LABEL`].
    pub decision: String,
    pub approved: bool,
    /// Engine score, 0 when the engine omitted it.
    pub credit_score: f64,
    /// Positive then negative reason codes joined with "; ".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_reason: Option<String>,
    /// Echo of the requested amount.
    pub recommended_amount: f64,
    /// Negative reason codes, only when there are any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<String>>,
    /// Installment computed by the engine, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_installment: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_fills_empty_profile() {
        let defaults = ProfileDefaults::default();
        let sanitized = sanitize_profile(UserProfile::default(), &defaults);

        assert!(sanitized.is_complete());
        assert_eq!(sanitized.age, Some(29));
        assert_eq!(sanitized.salary, Some(10000.0));
        assert_eq!(sanitized.additional_income, Some(2000.0));
        assert_eq!(sanitized.employment_type.as_deref(), Some("Özel Sektör"));
        assert_eq!(sanitized.has_insurance, Some(true));
        assert_eq!(sanitized.experience, Some(5));
    }

    #[test]
    fn test_sanitize_keeps_explicit_false_and_zero() {
        let profile = UserProfile {
            has_insurance: Some(false),
            experience: Some(0),
            salary: Some(0.0),
            ..Default::default()
        };
        let sanitized = sanitize_profile(profile, &ProfileDefaults::default());

        assert_eq!(sanitized.has_insurance, Some(false));
        assert_eq!(sanitized.experience, Some(0));
        assert_eq!(sanitized.salary, Some(0.0));
    }

    #[test]
    fn test_stored_record_with_missing_fields_deserializes() {
        let raw = serde_json::json!({
            "age": 41,
            "salary": 25000,
            "additionalIncome": 500,
            "employment_type": "Kamu"
        });
        let profile: UserProfile = serde_json::from_value(raw).unwrap();

        assert_eq!(profile.age, Some(41));
        assert_eq!(profile.additional_income, Some(500.0));
        assert_eq!(profile.has_insurance, None);
        assert_eq!(profile.loan_amount, 0.0);
    }

    #[test]
    fn test_stored_record_with_null_loan_fields_deserializes() {
        let raw = serde_json::json!({
            "age": 30,
            "loan_amount": null,
            "loan_term_months": null
        });
        let profile: UserProfile = serde_json::from_value(raw).unwrap();

        assert_eq!(profile.age, Some(30));
        assert_eq!(profile.loan_amount, 0.0);
        assert_eq!(profile.loan_term_months, 0);
    }

    #[test]
    fn test_stored_record_with_integral_floats_deserializes() {
        let raw = serde_json::json!({
            "age": 41.0,
            "experience": 5.0,
            "loan_term_months": 24.0
        });
        let profile: UserProfile = serde_json::from_value(raw).unwrap();

        assert_eq!(profile.age, Some(41));
        assert_eq!(profile.experience, Some(5));
        assert_eq!(profile.loan_term_months, 24);

        let fractional = serde_json::json!({"experience": 2.5});
        assert!(serde_json::from_value::<UserProfile>(fractional).is_err());
    }

    #[test]
    fn test_analyze_request_with_null_user() {
        let raw = serde_json::json!({"amount": "15000", "term": "12", "user": null});
        let request: AnalyzeCreditRequest = serde_json::from_value(raw).unwrap();

        assert!(request.user.uid.is_none());
    }

    #[test]
    fn test_loan_terms_parse() {
        let terms = LoanTerms::parse("15000", "12").unwrap();
        assert_eq!(terms.amount, 15000.0);
        assert_eq!(terms.term_months, 12);

        let terms = LoanTerms::parse(" 2500.50 ", " 6 ").unwrap();
        assert_eq!(terms.amount, 2500.5);
        assert_eq!(terms.term_months, 6);
    }

    #[test]
    fn test_loan_terms_reject_malformed_input() {
        assert!(matches!(
            LoanTerms::parse("abc", "12"),
            Err(AppError::InvalidLoanParameters(_))
        ));
        assert!(matches!(
            LoanTerms::parse("NaN", "12"),
            Err(AppError::InvalidLoanParameters(_))
        ));
        assert!(matches!(
            LoanTerms::parse("15000", "12.5"),
            Err(AppError::InvalidLoanParameters(_))
        ));
        assert!(matches!(
            LoanTerms::parse("15000", ""),
            Err(AppError::InvalidLoanParameters(_))
        ));
    }

    #[test]
    fn test_application_request_overrides_loan_fields() {
        let stored = UserProfile {
            loan_amount: 50000.0,
            loan_term_months: 36,
            ..Default::default()
        };
        let sanitized = sanitize_profile(stored, &ProfileDefaults::default());
        let request = ApplicationRequest::new(
            sanitized,
            LoanTerms {
                amount: 15000.0,
                term_months: 12,
            },
        );

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["loan_amount"], 15000.0);
        assert_eq!(body["loan_term_months"], 12);
        assert_eq!(body["additionalIncome"], 2000.0);
        assert_eq!(body["home_ownership"], "owner");
        assert!(body.get("additional_income").is_none());
    }

    #[test]
    fn test_decision_result_omits_empty_optionals() {
        let result = DecisionResult {
            decision: APPROVED_LABEL.to_string(),
            approved: true,
            credit_score: 720.0,
            decision_reason: None,
            recommended_amount: 15000.0,
            conditions: None,
            monthly_installment: None,
        };

        let body = serde_json::to_value(&result).unwrap();
        assert!(body.get("decision_reason").is_none());
        assert!(body.get("conditions").is_none());
        assert!(body.get("monthly_installment").is_none());
        assert_eq!(body["decision"], "ONAYLANDI");
    }
}
