//! Specialist roster tags and per-specialty execution profiles.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// A review specialty — one bounded worker per tag in the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Specialty {
    /// Does the change do what its title/description claims
    Alignment,
    /// Test coverage and test quality of the change
    Testing,
    /// Security posture of the change
    Security,
    /// Dependency and supply-chain impact
    Dependencies,
}

impl Specialty {
    pub const ALL: [Specialty; 4] = [
        Specialty::Alignment,
        Specialty::Testing,
        Specialty::Security,
        Specialty::Dependencies,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Specialty::Alignment => "alignment",
            Specialty::Testing => "testing",
            Specialty::Security => "security",
            Specialty::Dependencies => "dependencies",
        }
    }

    /// Parse a specialty tag.
    ///
    /// An unknown tag is a configuration error and is raised, not
    /// degraded.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "alignment" => Ok(Specialty::Alignment),
            "testing" => Ok(Specialty::Testing),
            "security" => Ok(Specialty::Security),
            "dependencies" => Ok(Specialty::Dependencies),
            other => Err(DomainError::UnknownSpecialty(other.to_string())),
        }
    }
}

impl std::fmt::Display for Specialty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Specialty {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Specialty::parse(s)
    }
}

/// Execution bounds for one specialty.
///
/// Two knobs:
/// - `max_iterations`: hard cap on analyze iterations
/// - `context_budget`: max simultaneous context requests per iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialtyProfile {
    max_iterations: u32,
    context_budget: usize,
}

impl SpecialtyProfile {
    pub fn new(max_iterations: u32, context_budget: usize) -> Self {
        Self {
            // A zero-iteration specialist would emit nothing
            max_iterations: max_iterations.max(1),
            context_budget,
        }
    }

    /// Default profile for a specialty.
    ///
    /// Alignment digs deepest (3 iterations); security trades iteration
    /// depth for a tighter context budget.
    pub fn for_specialty(specialty: Specialty) -> Self {
        match specialty {
            Specialty::Alignment => Self::new(3, 2),
            Specialty::Testing => Self::new(2, 2),
            Specialty::Security => Self::new(2, 1),
            Specialty::Dependencies => Self::new(2, 2),
        }
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn context_budget(&self) -> usize {
        self.context_budget
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_context_budget(mut self, context_budget: usize) -> Self {
        self.context_budget = context_budget;
        self
    }
}

impl Default for SpecialtyProfile {
    fn default() -> Self {
        Self::new(2, 2)
    }
}
