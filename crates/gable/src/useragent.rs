// Copyright 2024-2026 Gable contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Opaque user-agent holder.

use std::fmt;

/// The raw `User-Agent` header captured at request construction.
///
/// Kept opaque: classification (browser, robot, platform) belongs to a
/// dedicated parser, not to the request layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAgent(String);

impl UserAgent {
    /// Wraps a raw user-agent string.
    pub fn new(agent: impl Into<String>) -> Self {
        Self(agent.into())
    }

    /// The raw user-agent string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
