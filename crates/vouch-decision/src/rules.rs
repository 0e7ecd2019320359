//! Business rules applied on top of descriptor validation.

use chrono::{DateTime, Utc};

use vouch_core::{ReturnedProof, RuleConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Passed,
    Failed(String),
}

impl RuleOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// A rule bound to one descriptor name.
pub trait BusinessRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn descriptor(&self) -> &str;

    fn check(&self, proof: &ReturnedProof, now: DateTime<Utc>) -> RuleOutcome;
}

/// Result value in an accepted set, and sample collected inside a trailing window.
pub struct LabResultRule {
    pub descriptor: String,
    pub result_attribute: String,
    pub accepted_values: Vec<String>,
    pub date_attribute: String,
    pub window_hours: i64,
}

/// Series complete, and administration date older than the maturation period.
pub struct VaccinationRule {
    pub descriptor: String,
    pub completion_attribute: String,
    pub date_attribute: String,
    pub maturation_days: i64,
}

pub struct AcceptedValuesRule {
    pub descriptor: String,
    pub attribute: String,
    pub accepted_values: Vec<String>,
}

fn accepted(proof: &ReturnedProof, attribute: &str, values: &[String]) -> RuleOutcome {
    match proof.revealed.get(attribute) {
        Some(v) if values.iter().any(|a| a == v) => RuleOutcome::Passed,
        Some(v) => RuleOutcome::Failed(format!("{} value {:?} not accepted", attribute, v)),
        None => RuleOutcome::Failed(format!("{} not revealed", attribute)),
    }
}

/// Check a revealed epoch-seconds date with `test(sample_ms)`. A date only
/// proven by predicate was already range-checked by the agent.
fn date_check(
    proof: &ReturnedProof,
    attribute: &str,
    test: impl Fn(i64) -> bool,
    failure: &str,
) -> RuleOutcome {
    match proof.revealed.get(attribute) {
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(secs) if test(secs.saturating_mul(1000)) => RuleOutcome::Passed,
            Ok(_) => RuleOutcome::Failed(format!("{} {}", attribute, failure)),
            Err(_) => RuleOutcome::Failed(format!("{} is not an epoch date", attribute)),
        },
        None if proof.predicates.contains(attribute) => RuleOutcome::Passed,
        None => RuleOutcome::Failed(format!("{} not revealed", attribute)),
    }
}

impl BusinessRule for LabResultRule {
    fn name(&self) -> &'static str {
        "lab_result"
    }

    fn descriptor(&self) -> &str {
        &self.descriptor
    }

    fn check(&self, proof: &ReturnedProof, now: DateTime<Utc>) -> RuleOutcome {
        let result = accepted(proof, &self.result_attribute, &self.accepted_values);
        if !result.is_pass() {
            return result;
        }
        let earliest_ms = now.timestamp_millis() - self.window_hours * 3_600_000;
        date_check(
            proof,
            &self.date_attribute,
            |sample_ms| sample_ms > earliest_ms,
            "outside the sample window",
        )
    }
}

impl BusinessRule for VaccinationRule {
    fn name(&self) -> &'static str {
        "vaccination"
    }

    fn descriptor(&self) -> &str {
        &self.descriptor
    }

    fn check(&self, proof: &ReturnedProof, now: DateTime<Utc>) -> RuleOutcome {
        match proof.revealed.get(&self.completion_attribute).map(String::as_str) {
            Some("true") => {}
            Some(other) => {
                return RuleOutcome::Failed(format!(
                    "{} is {:?}",
                    self.completion_attribute, other
                ))
            }
            None => {
                return RuleOutcome::Failed(format!("{} not revealed", self.completion_attribute))
            }
        }
        let latest_ms = now.timestamp_millis() - self.maturation_days * 86_400_000;
        date_check(
            proof,
            &self.date_attribute,
            |dose_ms| dose_ms < latest_ms,
            "within the maturation period",
        )
    }
}

impl BusinessRule for AcceptedValuesRule {
    fn name(&self) -> &'static str {
        "accepted_values"
    }

    fn descriptor(&self) -> &str {
        &self.descriptor
    }

    fn check(&self, proof: &ReturnedProof, _now: DateTime<Utc>) -> RuleOutcome {
        accepted(proof, &self.attribute, &self.accepted_values)
    }
}

/// The configured rules.
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Box<dyn BusinessRule>>,
}

impl RuleSet {
    pub fn from_config(configs: &[RuleConfig]) -> Self {
        let rules = configs
            .iter()
            .map(|config| -> Box<dyn BusinessRule> {
                match config.clone() {
                    RuleConfig::LabResult {
                        descriptor,
                        result_attribute,
                        accepted_values,
                        date_attribute,
                        window_hours,
                    } => Box::new(LabResultRule {
                        descriptor,
                        result_attribute,
                        accepted_values,
                        date_attribute,
                        window_hours,
                    }),
                    RuleConfig::Vaccination {
                        descriptor,
                        completion_attribute,
                        date_attribute,
                        maturation_days,
                    } => Box::new(VaccinationRule {
                        descriptor,
                        completion_attribute,
                        date_attribute,
                        maturation_days,
                    }),
                    RuleConfig::AcceptedValues {
                        descriptor,
                        attribute,
                        accepted_values,
                    } => Box::new(AcceptedValuesRule {
                        descriptor,
                        attribute,
                        accepted_values,
                    }),
                }
            })
            .collect();
        Self { rules }
    }

    pub fn push(&mut self, rule: Box<dyn BusinessRule>) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run the rules bound to `descriptor`, stopping at the first failure.
    pub fn check(&self, descriptor: &str, proof: &ReturnedProof, now: DateTime<Utc>) -> RuleOutcome {
        for rule in self.rules.iter().filter(|r| r.descriptor() == descriptor) {
            let outcome = rule.check(proof, now);
            tracing::debug!(descriptor, rule = rule.name(), outcome = ?outcome, "business rule");
            if !outcome.is_pass() {
                return outcome;
            }
        }
        RuleOutcome::Passed
    }
}
