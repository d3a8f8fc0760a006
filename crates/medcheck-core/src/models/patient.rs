//! Patient models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected patient input. Raised before a pipeline invocation starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid sex '{0}': expected Male, Female or Other")]
    Sex(String),

    #[error("Height must be a positive number of centimetres, got {0}")]
    Height(f64),

    #[error("Weight must be a positive number of kilograms, got {0}")]
    Weight(f64),

    #[error("Age must be a non-negative integer, got {0}")]
    Age(i64),
}

/// Patient sex as collected by the intake form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Sex {
    Male,
    Female,
    Other,
}

impl FromStr for Sex {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Male" => Ok(Sex::Male),
            "Female" => Ok(Sex::Female),
            "Other" => Ok(Sex::Other),
            other => Err(ValidationError::Sex(other.to_string())),
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
            Sex::Other => "Other",
        };
        f.write_str(s)
    }
}

/// Raw intake form as submitted by the web layer.
///
/// Field names follow the form. Convert with `PatientContext::try_from`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientProfile {
    pub age: i64,
    pub sex: String,
    /// Height in cm
    pub height: f64,
    /// Weight in kg
    pub weight: f64,
    #[serde(default)]
    pub allergies: String,
    #[serde(default)]
    pub preexisting_conditions: String,
    #[serde(default)]
    pub medications: String,
    #[serde(default)]
    pub family_history: String,
    /// Text already extracted from uploaded documents
    #[serde(default)]
    pub user_document_data: String,
}

/// Validated patient context, owned by one pipeline invocation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PatientContext {
    age: u32,
    sex: Sex,
    height_cm: f64,
    weight_kg: f64,
    allergies: String,
    preexisting_conditions: String,
    medications: String,
    family_history: String,
    supplementary_document_text: String,
}

impl PatientContext {
    /// Build a context from the required vitals. Free-text fields start empty.
    pub fn new(age: u32, sex: Sex, height_cm: f64, weight_kg: f64) -> Result<Self, ValidationError> {
        if !height_cm.is_finite() || height_cm <= 0.0 {
            return Err(ValidationError::Height(height_cm));
        }
        if !weight_kg.is_finite() || weight_kg <= 0.0 {
            return Err(ValidationError::Weight(weight_kg));
        }

        Ok(Self {
            age,
            sex,
            height_cm,
            weight_kg,
            allergies: String::new(),
            preexisting_conditions: String::new(),
            medications: String::new(),
            family_history: String::new(),
            supplementary_document_text: String::new(),
        })
    }

    pub fn with_allergies(mut self, text: impl Into<String>) -> Self {
        self.allergies = text.into();
        self
    }

    pub fn with_preexisting_conditions(mut self, text: impl Into<String>) -> Self {
        self.preexisting_conditions = text.into();
        self
    }

    pub fn with_medications(mut self, text: impl Into<String>) -> Self {
        self.medications = text.into();
        self
    }

    pub fn with_family_history(mut self, text: impl Into<String>) -> Self {
        self.family_history = text.into();
        self
    }

    pub fn with_supplementary_document_text(mut self, text: impl Into<String>) -> Self {
        self.supplementary_document_text = text.into();
        self
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }

    pub fn height_cm(&self) -> f64 {
        self.height_cm
    }

    pub fn weight_kg(&self) -> f64 {
        self.weight_kg
    }

    pub fn allergies(&self) -> &str {
        &self.allergies
    }

    pub fn preexisting_conditions(&self) -> &str {
        &self.preexisting_conditions
    }

    pub fn medications(&self) -> &str {
        &self.medications
    }

    pub fn family_history(&self) -> &str {
        &self.family_history
    }

    pub fn supplementary_document_text(&self) -> &str {
        &self.supplementary_document_text
    }

    /// All free-text fields joined, for grounding checks.
    pub fn free_text(&self) -> String {
        [
            self.allergies.as_str(),
            self.preexisting_conditions.as_str(),
            self.medications.as_str(),
            self.family_history.as_str(),
            self.supplementary_document_text.as_str(),
        ]
        .iter()
        .filter(|s| !s.trim().is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
    }
}

impl TryFrom<PatientProfile> for PatientContext {
    type Error = ValidationError;

    fn try_from(profile: PatientProfile) -> Result<Self, Self::Error> {
        let age = u32::try_from(profile.age).map_err(|_| ValidationError::Age(profile.age))?;
        let sex: Sex = profile.sex.parse()?;

        Ok(PatientContext::new(age, sex, profile.height, profile.weight)?
            .with_allergies(profile.allergies)
            .with_preexisting_conditions(profile.preexisting_conditions)
            .with_medications(profile.medications)
            .with_family_history(profile.family_history)
            .with_supplementary_document_text(profile.user_document_data))
    }
}
