use crate::Result;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// The opaque identifier of a `Category`. Unlike transaction ids these are random, because a
/// category has no natural key to deduplicate on.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_stored(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An ARGB color packed into a `u32`, e.g. `0xFF4CAF50`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(u32);

impl Color {
    pub const fn argb(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:08X}", self.0)
    }
}

impl FromStr for Color {
    type Err = anyhow::Error;

    /// Accepts `#RRGGBB` (fully opaque) or `#AARRGGBB`, with or without the `#`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            bail!("Invalid color '{s}', expected #RRGGBB or #AARRGGBB");
        }
        let value = u32::from_str_radix(hex, 16)
            .with_context(|| format!("Invalid color '{s}', expected #RRGGBB or #AARRGGBB"))?;
        match hex.len() {
            6 => Ok(Self(0xFF00_0000 | value)),
            8 => Ok(Self(value)),
            _ => bail!("Invalid color '{s}', expected #RRGGBB or #AARRGGBB"),
        }
    }
}

/// A user-defined grouping of transactions.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Category {
    pub(crate) id: CategoryId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) user_id: Option<String>,
    pub(crate) name: String,
    pub(crate) color: Color,
}

impl Category {
    /// Creates a category with a freshly generated id.
    pub fn new(name: impl Into<String>, color: Color) -> Self {
        Self {
            id: CategoryId::generate(),
            user_id: None,
            name: name.into(),
            color,
        }
    }

    pub(crate) fn from_parts(
        id: CategoryId,
        user_id: Option<String>,
        name: String,
        color: Color,
    ) -> Self {
        Self {
            id,
            user_id,
            name,
            color,
        }
    }

    pub fn id(&self) -> &CategoryId {
        &self.id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn set_user_id(&mut self, user_id: Option<String>) {
        self.user_id = user_id;
    }
}

/// The categories a new ledger starts with.
pub(crate) const DEFAULT_CATEGORIES: &[(&str, u32)] = &[
    ("Food & Dining", 0xFF4CAF50),
    ("Transportation", 0xFF2196F3),
    ("Shopping", 0xFFF44336),
    ("Entertainment", 0xFF9C27B0),
    ("Housing", 0xFF795548),
    ("Utilities", 0xFF607D8B),
    ("Health", 0xFFE91E63),
    ("Personal", 0xFFFF9800),
    ("Education", 0xFF3F51B5),
    ("Investments", 0xFF009688),
    ("Payroll", 0xFF4CAF50),
    ("Pets", 0xFFFF9800),
    ("Other", 0xFF9E9E9E),
];

pub(crate) fn default_categories() -> Vec<Category> {
    DEFAULT_CATEGORIES
        .iter()
        .map(|(name, color)| Category::new(*name, Color::argb(*color)))
        .collect()
}
