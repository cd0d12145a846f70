use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

const SIMPLE_PROMPT: &str =
    "Write a Python function to check if a number is prime. Output only the code.";

const MEDIUM_PROMPT: &str = "Write a Python class called UserService that:
1. Has methods for create_user, get_user, delete_user
2. Uses a dictionary as in-memory storage
3. Includes proper type hints
4. Has docstrings for each method
Output only the code.";

const COMPLEX_PROMPT: &str = "Write a complete FastAPI REST API with:
1. User model with id, name, email fields
2. CRUD endpoints (GET, POST, PUT, DELETE)
3. Proper error handling with HTTPException
4. Input validation using Pydantic
5. Include all necessary imports
Output only the code.";

/// A benchmark workload. Each class is bound to one fixed prompt of
/// increasing length and difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PromptClass {
    Simple,
    Medium,
    Complex,
}

impl PromptClass {
    /// Every class, in catalog order.
    pub const ALL: [PromptClass; 3] = [PromptClass::Simple, PromptClass::Medium, PromptClass::Complex];

    /// Parse a class tag. Unknown tags map to `Medium`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "simple" => PromptClass::Simple,
            "complex" => PromptClass::Complex,
            _ => PromptClass::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptClass::Simple => "simple",
            PromptClass::Medium => "medium",
            PromptClass::Complex => "complex",
        }
    }

    pub fn prompt(&self) -> &'static str {
        prompt_for(*self)
    }
}

impl fmt::Display for PromptClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Literal prompt text for a workload class.
pub fn prompt_for(class: PromptClass) -> &'static str {
    match class {
        PromptClass::Simple => SIMPLE_PROMPT,
        PromptClass::Medium => MEDIUM_PROMPT,
        PromptClass::Complex => COMPLEX_PROMPT,
    }
}

/// Prompt text for a raw class tag, using the `medium` prompt for unknown tags.
pub fn prompt_for_tag(tag: &str) -> &'static str {
    prompt_for(PromptClass::from_tag(tag))
}
