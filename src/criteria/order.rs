use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPrecedence {
    First,
    Last,
}

/// One ORDER BY term. `property` may also name a projection alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub property: String,
    #[serde(default = "default_ascending")]
    pub ascending: bool,
    #[serde(default)]
    pub ignore_case: bool,
    #[serde(default)]
    pub nulls: Option<NullPrecedence>,
}

fn default_ascending() -> bool {
    true
}

impl Order {
    pub fn asc(property: &str) -> Self {
        Order {
            property: property.to_string(),
            ascending: true,
            ignore_case: false,
            nulls: None,
        }
    }

    pub fn desc(property: &str) -> Self {
        Order {
            ascending: false,
            ..Order::asc(property)
        }
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn nulls(mut self, precedence: NullPrecedence) -> Self {
        self.nulls = Some(precedence);
        self
    }

    pub fn direction(&self) -> &'static str {
        if self.ascending {
            "asc"
        } else {
            "desc"
        }
    }
}
